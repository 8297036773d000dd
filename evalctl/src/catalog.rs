//! Static registry of the generative models the engine can evaluate.
//!
//! The catalog is immutable once constructed: it is loaded at startup from
//! configuration (or from the built-in default list) and only ever queried
//! afterwards. Pricing lives here as per-1k-token rates; the actual cost math
//! is in [`crate::pricing`].

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Upstream provider of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Meta,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Google => write!(f, "google"),
            Provider::Meta => write!(f, "meta"),
        }
    }
}

/// Pricing/access tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Standard,
    Premium,
}

/// Capability tags used by catalog filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Code,
    Vision,
    LongContext,
}

/// A priced, capability-tagged model entry.
///
/// Invariant: both per-1k prices are non-negative ([`ModelCatalog::new`]
/// rejects violations at construction).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Model {
    /// Stable identifier used in evaluation requests and ledger events
    pub id: String,
    pub provider: Provider,
    /// Human-readable name for UI display
    pub display_name: String,
    /// Price per 1000 input tokens, in currency units
    pub price_per_1k_in: f64,
    /// Price per 1000 output tokens, in currency units
    pub price_per_1k_out: f64,
    /// Maximum tokens the model will generate in one completion
    pub max_tokens: u32,
    /// Total context window in tokens
    pub context_window: u32,
    pub capabilities: Vec<Capability>,
    pub tier: Tier,
    /// Unavailable models stay listed but are never dispatched to
    pub available: bool,
}

/// Filter predicate for [`ModelCatalog::filter`]. All set fields must match.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ModelFilter {
    pub provider: Option<Provider>,
    pub tier: Option<Tier>,
    pub capability: Option<Capability>,
    pub available: Option<bool>,
}

/// Lookup-only registry of models, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    /// Build a catalog, validating the price invariant.
    pub fn new(models: Vec<Model>) -> anyhow::Result<Self> {
        for model in &models {
            if model.price_per_1k_in < 0.0 || model.price_per_1k_out < 0.0 {
                anyhow::bail!("model {} has a negative per-1k price", model.id);
            }
        }
        Ok(Self { models })
    }

    /// Catalog seeded with the built-in default model list.
    pub fn with_defaults() -> Self {
        // default_models() satisfies the price invariant
        Self {
            models: default_models(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn list(&self) -> &[Model] {
        &self.models
    }

    pub fn filter(&self, filter: &ModelFilter) -> Vec<&Model> {
        self.models
            .iter()
            .filter(|m| filter.provider.is_none_or(|p| m.provider == p))
            .filter(|m| filter.tier.is_none_or(|t| m.tier == t))
            .filter(|m| filter.capability.is_none_or(|c| m.capabilities.contains(&c)))
            .filter(|m| filter.available.is_none_or(|a| m.available == a))
            .collect()
    }
}

/// The built-in model list with published per-1k pricing.
pub fn default_models() -> Vec<Model> {
    vec![
        Model {
            id: "gpt-3.5-turbo".to_string(),
            provider: Provider::OpenAi,
            display_name: "GPT-3.5 Turbo".to_string(),
            price_per_1k_in: 0.0015,
            price_per_1k_out: 0.002,
            max_tokens: 4096,
            context_window: 16385,
            capabilities: vec![Capability::Chat],
            tier: Tier::Standard,
            available: true,
        },
        Model {
            id: "gpt-4".to_string(),
            provider: Provider::OpenAi,
            display_name: "GPT-4".to_string(),
            price_per_1k_in: 0.03,
            price_per_1k_out: 0.06,
            max_tokens: 8192,
            context_window: 8192,
            capabilities: vec![Capability::Chat, Capability::Code],
            tier: Tier::Premium,
            available: true,
        },
        Model {
            id: "gpt-4-turbo".to_string(),
            provider: Provider::OpenAi,
            display_name: "GPT-4 Turbo".to_string(),
            price_per_1k_in: 0.01,
            price_per_1k_out: 0.03,
            max_tokens: 4096,
            context_window: 128_000,
            capabilities: vec![
                Capability::Chat,
                Capability::Code,
                Capability::Vision,
                Capability::LongContext,
            ],
            tier: Tier::Premium,
            available: true,
        },
        Model {
            id: "claude-3-opus".to_string(),
            provider: Provider::Anthropic,
            display_name: "Claude 3 Opus".to_string(),
            price_per_1k_in: 0.015,
            price_per_1k_out: 0.075,
            max_tokens: 4096,
            context_window: 200_000,
            capabilities: vec![
                Capability::Chat,
                Capability::Code,
                Capability::Vision,
                Capability::LongContext,
            ],
            tier: Tier::Premium,
            available: true,
        },
        Model {
            id: "claude-3-sonnet".to_string(),
            provider: Provider::Anthropic,
            display_name: "Claude 3 Sonnet".to_string(),
            price_per_1k_in: 0.003,
            price_per_1k_out: 0.015,
            max_tokens: 4096,
            context_window: 200_000,
            capabilities: vec![Capability::Chat, Capability::Code, Capability::Vision],
            tier: Tier::Standard,
            available: true,
        },
        Model {
            id: "gemini-pro".to_string(),
            provider: Provider::Google,
            display_name: "Gemini Pro".to_string(),
            price_per_1k_in: 0.00025,
            price_per_1k_out: 0.0005,
            max_tokens: 32_000,
            context_window: 32_768,
            capabilities: vec![Capability::Chat],
            tier: Tier::Free,
            available: true,
        },
    ]
}
