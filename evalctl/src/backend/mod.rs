//! Model backend strategy.
//!
//! The engine talks to generative backends through one capability,
//! [`ModelBackend`], with two implementations: [`LiveBackend`] for a real
//! HTTP service and [`SimulatedBackend`] for deterministic placeholder
//! responses. Which one an evaluator is built with is decided by
//! configuration at construction time, never branched on inside the
//! evaluation logic; the evaluator additionally keeps a simulated instance
//! around as the per-model fallback when a live call fails.

pub mod live;
pub mod simulated;

pub use live::LiveBackend;
pub use simulated::SimulatedBackend;

use crate::{catalog::Model, evaluator::EvaluationParams};
use thiserror::Error;

/// What a backend produced for one prompt/model pair.
///
/// Token counts are optional: when the backend reports them they are
/// authoritative, otherwise the evaluator estimates from the text.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub text: String,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
}

/// Failures of a single backend call.
///
/// These never escape the per-model unit of work: the evaluator catches them
/// and falls back to the simulated generator for that model only.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}")]
    Status { status: u16 },

    #[error("backend reply carried no response text")]
    MalformedReply,
}

/// One generative backend reachable by the evaluator.
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        model: &Model,
        params: &EvaluationParams,
    ) -> Result<BackendReply, BackendError>;
}
