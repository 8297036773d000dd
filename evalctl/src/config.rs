//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `EVALCTL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `EVALCTL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `EVALCTL_BACKEND__URL=http://inference:9000` sets the `backend.url` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Backend**: `backend.url`, `backend.timeout` - live model backend; when `backend.url`
//!   is unset, the engine runs entirely on simulated responses
//! - **Evaluation**: `evaluation.run_deadline`, `evaluation.max_models_per_run`
//! - **Budget**: `budget.default_monthly`, `budget.store_path`
//! - **Models**: `models` - model catalog entries; empty means the built-in default list
//! - **CORS**: `allowed_origins`
//! - **Tracing**: `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! EVALCTL_PORT=8080
//!
//! # Point at a live backend
//! EVALCTL_BACKEND__URL="http://inference.internal:9000"
//!
//! # Override nested values
//! EVALCTL_EVALUATION__MAX_MODELS_PER_RUN=4
//! EVALCTL_ENABLE_OTEL_EXPORT=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::catalog::Model;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "EVALCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Live model backend connection
    pub backend: BackendConfig,
    /// Evaluation run limits
    pub evaluation: EvaluationConfig,
    /// Budget governance settings
    pub budget: BudgetSettings,
    /// Model catalog entries; an empty list means the built-in default models
    pub models: Vec<Model>,
    /// Allowed origins for CORS requests; "*" allows any origin
    pub allowed_origins: Vec<String>,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Live model backend configuration.
///
/// When `url` is unset the engine never makes outbound calls and serves
/// simulated responses for every model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the backend chat API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Per-call HTTP timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Evaluation run limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Wall-clock deadline for collecting a whole run; units still running
    /// past it are detached and excluded from the result
    #[serde(with = "humantime_serde")]
    pub run_deadline: Duration,
    /// Maximum number of models one request may fan out to
    pub max_models_per_run: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            run_deadline: Duration::from_secs(30),
            max_models_per_run: 8,
        }
    }
}

/// Budget governance settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetSettings {
    /// Monthly budget used when none has been set through the API
    pub default_monthly: f64,
    /// Path for the persistent budget record; unset keeps the budget in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            default_monthly: crate::governor::DEFAULT_MONTHLY_BUDGET,
            store_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8640,
            backend: BackendConfig::default(),
            evaluation: EvaluationConfig::default(),
            budget: BudgetSettings::default(),
            models: vec![],
            allowed_origins: vec!["*".to_string()],
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), crate::errors::Error> {
        if self.evaluation.max_models_per_run == 0 {
            return Err(crate::errors::Error::Internal {
                operation: "Config validation: evaluation.max_models_per_run cannot be 0".to_string(),
            });
        }
        if self.evaluation.run_deadline.is_zero() {
            return Err(crate::errors::Error::Internal {
                operation: "Config validation: evaluation.run_deadline cannot be zero".to_string(),
            });
        }
        if !self.budget.default_monthly.is_finite() || self.budget.default_monthly < 0.0 {
            return Err(crate::errors::Error::Internal {
                operation: format!(
                    "Config validation: budget.default_monthly must be a non-negative number, got {}",
                    self.budget.default_monthly
                ),
            });
        }
        for model in &self.models {
            if model.price_per_1k_in < 0.0 || model.price_per_1k_out < 0.0 {
                return Err(crate::errors::Error::Internal {
                    operation: format!(
                        "Config validation: model {} has a negative per-1k price",
                        model.id
                    ),
                });
            }
        }
        if self.allowed_origins.is_empty() {
            return Err(crate::errors::Error::Internal {
                operation: "Config validation: allowed_origins cannot be empty. Add at least one origin or '*'."
                    .to_string(),
            });
        }
        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("EVALCTL_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
