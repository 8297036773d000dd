//! Collaborator interfaces for durable storage.
//!
//! The engine never talks to a database directly. Three narrow traits cover
//! its persistence needs: [`EvaluationStore`] for the run archive,
//! [`UsageStore`] for the append-only ledger backing, and [`BudgetStore`] for
//! the single budget scalar. Production deployments can back these with
//! whatever record store they have; this crate ships in-memory implementations
//! (and a file-backed budget store) that keep the whole engine exercisable
//! without external services.
//!
//! Note the deliberate asymmetry: [`UsageStore`] has no update or delete.

pub mod file;
pub mod memory;

use crate::{evaluator::EvaluationRun, ledger::UsageEvent, types::RunId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for store operations that application code can handle
#[derive(Error, Debug)]
pub enum StoreError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// The backing store cannot be reached; callers on the evaluation path
    /// treat this as fail-open and keep their in-memory result.
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// Record (de)serialization failure
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for store operation results
pub type Result<T> = std::result::Result<T, StoreError>;

/// Filter for listing evaluation runs. Results are newest-first.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Case-insensitive free-text match over prompt and tags
    pub text: Option<String>,
    pub favorites_only: bool,
    pub limit: Option<usize>,
}

/// Archive of evaluation runs.
#[async_trait::async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn create(&self, run: &EvaluationRun) -> Result<()>;

    async fn get(&self, id: RunId) -> Result<Option<EvaluationRun>>;

    /// Replace an existing run (tags/notes/favorite mutations). Returns
    /// [`StoreError::NotFound`] if the run does not exist.
    async fn update(&self, run: &EvaluationRun) -> Result<()>;

    /// Returns whether a run was actually removed.
    async fn delete(&self, id: RunId) -> Result<bool>;

    async fn list(&self, filter: &RunFilter) -> Result<Vec<EvaluationRun>>;
}

/// Append-only backing for the usage ledger.
#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, event: &UsageEvent) -> Result<()>;

    /// Events in `[start, end]` inclusive (unbounded when omitted), newest
    /// first, optionally restricted to one tenant.
    async fn query(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        tenant_id: Option<&str>,
    ) -> Result<Vec<UsageEvent>>;
}

/// Single-scalar key-value store for the monthly budget, scoped per governing
/// entity and surviving process restarts when file-backed.
#[async_trait::async_trait]
pub trait BudgetStore: Send + Sync {
    async fn get(&self) -> Result<Option<f64>>;

    async fn set(&self, amount: f64) -> Result<()>;
}
