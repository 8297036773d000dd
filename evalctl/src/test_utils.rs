//! Shared test fixtures.

use crate::{
    backend::{BackendError, BackendReply, ModelBackend},
    catalog::{default_models, Capability, Model, ModelCatalog, Provider, Tier},
    evaluator::{EvaluationParams, EvaluationRun},
    store::{EvaluationStore, Result as StoreResult, RunFilter, StoreError},
    types::{Clock, RunId},
};
use chrono::{DateTime, Utc};

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Default catalog plus one unavailable "retired" entry.
pub fn catalog_with_retired() -> ModelCatalog {
    let mut models = default_models();
    models.push(Model {
        id: "retired".to_string(),
        provider: Provider::OpenAi,
        display_name: "Retired Model".to_string(),
        price_per_1k_in: 0.001,
        price_per_1k_out: 0.002,
        max_tokens: 1024,
        context_window: 4096,
        capabilities: vec![Capability::Chat],
        tier: Tier::Standard,
        available: false,
    });
    // The extra entry keeps the price invariant
    ModelCatalog::new(models).unwrap()
}

/// A backend that stalls on one model and answers the rest immediately,
/// to exercise run deadlines.
pub struct SlowBackend {
    pub slow_model: String,
    pub delay: std::time::Duration,
}

#[async_trait::async_trait]
impl ModelBackend for SlowBackend {
    async fn complete(
        &self,
        _prompt: &str,
        model: &Model,
        _params: &EvaluationParams,
    ) -> Result<BackendReply, BackendError> {
        if model.id == self.slow_model {
            tokio::time::sleep(self.delay).await;
        }
        Ok(BackendReply {
            text: format!("reply from {}", model.id),
            tokens_in: None,
            tokens_out: None,
        })
    }
}

/// A backend whose every call fails, to exercise the simulated fallback.
pub struct FailingBackend;

#[async_trait::async_trait]
impl ModelBackend for FailingBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _model: &Model,
        _params: &EvaluationParams,
    ) -> Result<BackendReply, BackendError> {
        Err(BackendError::Status { status: 500 })
    }
}

/// An archive whose every call fails, to exercise fail-open persistence.
pub struct FailingEvaluationStore;

#[async_trait::async_trait]
impl EvaluationStore for FailingEvaluationStore {
    async fn create(&self, _run: &EvaluationRun) -> StoreResult<()> {
        Err(StoreError::Unavailable {
            message: "down for tests".to_string(),
        })
    }

    async fn get(&self, _id: RunId) -> StoreResult<Option<EvaluationRun>> {
        Err(StoreError::Unavailable {
            message: "down for tests".to_string(),
        })
    }

    async fn update(&self, _run: &EvaluationRun) -> StoreResult<()> {
        Err(StoreError::Unavailable {
            message: "down for tests".to_string(),
        })
    }

    async fn delete(&self, _id: RunId) -> StoreResult<bool> {
        Err(StoreError::Unavailable {
            message: "down for tests".to_string(),
        })
    }

    async fn list(&self, _filter: &RunFilter) -> StoreResult<Vec<EvaluationRun>> {
        Err(StoreError::Unavailable {
            message: "down for tests".to_string(),
        })
    }
}
