//! Concurrent prompt evaluation across multiple models.
//!
//! One evaluation fans a single prompt out to N models as independent units
//! of work, then collects the results back into the original request order.
//! Unit isolation is the core invariant here: a failing, slow, or unknown
//! model never affects any other unit's outcome. Failed units yield a
//! [`ModelResponse`] with the `error` field set; units still running at the
//! run deadline are detached and excluded from the result.
//!
//! Every finished unit appends exactly one ledger event, and the completed
//! run is archived. Both writes are fail-open: a storage error is logged and
//! the in-memory result is still returned to the caller.

use crate::{
    backend::{ModelBackend, SimulatedBackend},
    catalog::{Model, ModelCatalog},
    errors::{Error, Result},
    ledger::{Feature, NewUsageEvent, UsageLedger},
    pricing,
    store::EvaluationStore,
    types::{abbrev_uuid, Clock, RunId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use utoipa::ToSchema;

/// Generation parameters applied to every model in a run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct EvaluationParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop_sequences: Vec<String>,
    pub system_prompt: Option<String>,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop_sequences: Vec::new(),
            system_prompt: None,
        }
    }
}

impl EvaluationParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::BadRequest {
                message: format!("temperature must be within [0, 2], got {}", self.temperature),
            });
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(Error::BadRequest {
                    message: format!("top_p must be within [0, 1], got {top_p}"),
                });
            }
        }
        for (name, value) in [
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ] {
            if let Some(value) = value {
                if !(-2.0..=2.0).contains(&value) {
                    return Err(Error::BadRequest {
                        message: format!("{name} must be within [-2, 2], got {value}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// How a model finished generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// Outcome of one evaluation unit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelResponse {
    pub model: String,
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost: f64,
    pub latency_ms: u64,
    pub finish_reason: FinishReason,
    /// Set when the unit failed; failed units carry zero tokens and cost
    pub error: Option<String>,
}

impl ModelResponse {
    /// A failed unit. Zero tokens, zero cost, `finish_reason` of `error`.
    pub fn failed(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: String::new(),
            tokens_in: 0,
            tokens_out: 0,
            cost: 0.0,
            latency_ms: 0,
            finish_reason: FinishReason::Error,
            error: Some(message.into()),
        }
    }
}

/// A model plus the parameters it was asked with, as archived with the run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestedModel {
    pub model: String,
    pub params: EvaluationParams,
}

/// A complete evaluation run as archived and served back to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvaluationRun {
    #[schema(value_type = String, format = "uuid")]
    pub id: RunId,
    pub prompt: String,
    pub requested_models: Vec<RequestedModel>,
    /// Responses in the same order as `requested_models`, minus any units
    /// that were still running at the deadline
    pub responses: Vec<ModelResponse>,
    pub created_by: Option<String>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Input to [`PromptEvaluator::evaluate`].
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub prompt: String,
    pub model_ids: Vec<String>,
    pub params: EvaluationParams,
    pub created_by: Option<String>,
}

/// Pre-flight estimate for one model.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelEstimate {
    pub model: String,
    pub estimated_tokens_in: u64,
    pub expected_tokens_out: u64,
    pub estimated_cost: f64,
}

/// Pre-flight estimate for a whole request, before any dispatch.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EstimateReport {
    pub per_model: Vec<ModelEstimate>,
    pub total_estimated_cost: f64,
}

enum UnitSlot {
    Ready(ModelResponse),
    Running {
        model_id: String,
        handle: tokio::task::JoinHandle<ModelResponse>,
    },
}

/// Orchestrates fan-out, collection, ledger recording, and archiving.
#[derive(Clone, bon::Builder)]
pub struct PromptEvaluator {
    catalog: Arc<ModelCatalog>,
    backend: Arc<dyn ModelBackend>,
    simulated: Arc<SimulatedBackend>,
    evaluations: Arc<dyn EvaluationStore>,
    ledger: UsageLedger,
    clock: Arc<dyn Clock>,
    run_deadline: Duration,
    max_models_per_run: usize,
}

impl PromptEvaluator {
    /// Run one prompt against the given models concurrently.
    ///
    /// Responses come back in request order. An empty model list yields an
    /// empty (but still archived) run. Prompt content is the caller's
    /// business: an empty prompt simply estimates to zero input tokens.
    pub async fn evaluate(&self, new: NewEvaluation) -> Result<EvaluationRun> {
        new.params.validate()?;
        if new.model_ids.len() > self.max_models_per_run {
            return Err(Error::BadRequest {
                message: format!(
                    "at most {} models per evaluation, got {}",
                    self.max_models_per_run,
                    new.model_ids.len()
                ),
            });
        }

        let mut slots = Vec::with_capacity(new.model_ids.len());
        for model_id in &new.model_ids {
            let slot = match self.catalog.get(model_id) {
                None => UnitSlot::Ready(ModelResponse::failed(model_id, "model not found")),
                Some(model) if !model.available => {
                    UnitSlot::Ready(ModelResponse::failed(model_id, "model unavailable"))
                }
                Some(model) => {
                    let handle = tokio::spawn(run_unit(
                        self.backend.clone(),
                        self.simulated.clone(),
                        new.prompt.clone(),
                        model.clone(),
                        new.params.clone(),
                    ));
                    UnitSlot::Running {
                        model_id: model_id.clone(),
                        handle,
                    }
                }
            };
            slots.push(slot);
        }

        // Collect against one shared deadline; a slot that misses it is
        // detached and simply absent from the responses.
        let deadline = Instant::now() + self.run_deadline;
        let mut responses = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                UnitSlot::Ready(response) => responses.push(response),
                UnitSlot::Running { model_id, handle } => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, handle).await {
                        Ok(Ok(response)) => responses.push(response),
                        Ok(Err(join_err)) => {
                            warn!(model = %model_id, error = %join_err, "evaluation unit panicked");
                            responses.push(ModelResponse::failed(&model_id, "evaluation task failed"));
                        }
                        Err(_) => {
                            warn!(model = %model_id, "evaluation unit missed the run deadline, detaching");
                        }
                    }
                }
            }
        }

        for response in &responses {
            let event = NewUsageEvent {
                tenant_id: None,
                model: response.model.clone(),
                feature: Feature::Playground,
                tokens_in: response.tokens_in,
                tokens_out: response.tokens_out,
                cost: response.cost,
                latency_ms: Some(response.latency_ms),
            };
            if let Err(e) = self.ledger.record(event).await {
                warn!(model = %response.model, error = %e, "failed to record usage event, continuing");
            }
        }

        let run = EvaluationRun {
            id: RunId::new_v4(),
            prompt: new.prompt,
            requested_models: new
                .model_ids
                .into_iter()
                .map(|model| RequestedModel {
                    model,
                    params: new.params.clone(),
                })
                .collect(),
            responses,
            created_by: new.created_by,
            tags: Vec::new(),
            is_favorite: false,
            notes: String::new(),
            created_at: self.clock.now(),
        };

        if let Err(e) = self.evaluations.create(&run).await {
            warn!(run_id = %abbrev_uuid(&run.id), error = %e, "failed to archive evaluation run, continuing");
        }

        Ok(run)
    }

    /// Estimate cost before dispatching anything. Unknown models are an error
    /// here (there is nothing useful to return for them).
    pub fn estimate(
        &self,
        prompt: &str,
        model_ids: &[String],
        expected_output_tokens: Option<u64>,
    ) -> Result<EstimateReport> {
        let expected_out =
            expected_output_tokens.unwrap_or(pricing::DEFAULT_EXPECTED_OUTPUT_TOKENS);
        let tokens_in = pricing::estimate_tokens(prompt);

        let mut per_model = Vec::with_capacity(model_ids.len());
        let mut total = 0.0;
        for model_id in model_ids {
            let model = self.catalog.get(model_id).ok_or_else(|| Error::NotFound {
                resource: "Model".to_string(),
                id: model_id.clone(),
            })?;
            let estimated_cost = pricing::cost(tokens_in, expected_out, model);
            total += estimated_cost;
            per_model.push(ModelEstimate {
                model: model_id.clone(),
                estimated_tokens_in: tokens_in,
                expected_tokens_out: expected_out,
                estimated_cost,
            });
        }

        Ok(EstimateReport {
            per_model,
            total_estimated_cost: pricing::round_currency(total),
        })
    }
}

/// One unit of work: call the backend, fall back to the simulated generator
/// on failure, and derive tokens, cost, and finish reason.
async fn run_unit(
    backend: Arc<dyn ModelBackend>,
    simulated: Arc<SimulatedBackend>,
    prompt: String,
    model: Model,
    params: EvaluationParams,
) -> ModelResponse {
    let started = Instant::now();

    let reply = match backend.complete(&prompt, &model, &params).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(model = %model.id, error = %e, "backend call failed, using simulated response");
            match simulated.complete(&prompt, &model, &params).await {
                Ok(reply) => reply,
                Err(fallback_err) => {
                    return ModelResponse::failed(
                        &model.id,
                        format!("backend failed and fallback failed: {fallback_err}"),
                    );
                }
            }
        }
    };

    let latency_ms = started.elapsed().as_millis() as u64;

    // Backend-reported counts win; otherwise estimate from the text
    let tokens_in = reply
        .tokens_in
        .unwrap_or_else(|| pricing::estimate_tokens(&prompt));
    let tokens_out = reply
        .tokens_out
        .unwrap_or_else(|| pricing::estimate_tokens(&reply.text));

    let finish_reason = if tokens_out >= params.max_tokens as u64 {
        FinishReason::Length
    } else {
        FinishReason::Stop
    };

    ModelResponse {
        model: model.id.clone(),
        text: reply.text,
        tokens_in,
        tokens_out,
        cost: pricing::cost(tokens_in, tokens_out, &model),
        latency_ms,
        finish_reason,
        error: None,
    }
}
