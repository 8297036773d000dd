//! Request/response models for evaluation endpoints.

use crate::evaluator::EvaluationParams;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Body for `POST /evaluations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEvaluationRequest {
    /// The prompt to evaluate
    pub prompt: String,
    /// Catalog IDs of the models to fan out to, in presentation order
    pub models: Vec<String>,
    /// Generation parameters applied to every model; defaults when omitted
    #[serde(default)]
    pub params: Option<EvaluationParams>,
    /// Free-form author attribution stored with the run
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Body for `POST /evaluations/estimate`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EstimateRequest {
    pub prompt: String,
    pub models: Vec<String>,
    /// Assumed completion length; a stock assumption is used when omitted
    #[serde(default)]
    pub expected_output_tokens: Option<u64>,
}

/// Query parameters for `GET /evaluations`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListEvaluationsQuery {
    /// Maximum number of runs to return (newest first)
    pub limit: Option<usize>,
    /// Case-insensitive text match over prompt and tags
    pub q: Option<String>,
    /// Only return favorited runs
    #[serde(default)]
    pub favorites: bool,
}

/// Body for `POST /evaluations/{id}/tags`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTagsRequest {
    pub tags: Vec<String>,
}

/// Body for `POST /evaluations/{id}/notes`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddNotesRequest {
    pub notes: String,
}

/// Body for `POST /evaluations/{id}/clone`. Every field overrides the
/// corresponding value from the source run; omitted fields are inherited.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CloneEvaluationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub params: Option<EvaluationParams>,
}
