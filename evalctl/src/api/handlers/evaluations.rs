//! HTTP handlers for evaluation endpoints.

use crate::{
    AppState,
    api::models::evaluations::{
        AddNotesRequest, AddTagsRequest, CloneEvaluationRequest, CreateEvaluationRequest,
        EstimateRequest, ListEvaluationsQuery,
    },
    comparator::{self, RunComparison},
    errors::{Error, Result},
    evaluator::{EstimateReport, EvaluationRun, NewEvaluation},
    store::RunFilter,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

/// Run a prompt against several models
#[utoipa::path(
    post,
    path = "/evaluations",
    tag = "evaluations",
    summary = "Create an evaluation run",
    description = "Fan the prompt out to the requested models concurrently and return the collected responses",
    request_body = CreateEvaluationRequest,
    responses(
        (status = 201, description = "Evaluation completed", body = EvaluationRun),
        (status = 400, description = "Bad request - empty prompt, invalid parameters, or too many models"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_evaluation(
    State(state): State<AppState>,
    Json(data): Json<CreateEvaluationRequest>,
) -> Result<(StatusCode, Json<EvaluationRun>)> {
    // The engine itself accepts any prompt; blank input is a client mistake
    // and gets caught at the API boundary
    if data.prompt.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "prompt must not be empty".to_string(),
        });
    }

    let run = state
        .evaluator
        .evaluate(NewEvaluation {
            prompt: data.prompt,
            model_ids: data.models,
            params: data.params.unwrap_or_default(),
            created_by: data.created_by,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// List archived evaluation runs
#[utoipa::path(
    get,
    path = "/evaluations",
    tag = "evaluations",
    summary = "List evaluation runs",
    params(ListEvaluationsQuery),
    responses(
        (status = 200, description = "Runs, newest first", body = Vec<EvaluationRun>),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_evaluations(
    State(state): State<AppState>,
    Query(query): Query<ListEvaluationsQuery>,
) -> Result<Json<Vec<EvaluationRun>>> {
    let runs = state
        .archive
        .history(&RunFilter {
            text: query.q,
            favorites_only: query.favorites,
            limit: query.limit,
        })
        .await?;
    Ok(Json(runs))
}

/// Get one evaluation run
#[utoipa::path(
    get,
    path = "/evaluations/{id}",
    tag = "evaluations",
    summary = "Get an evaluation run",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    responses(
        (status = 200, description = "The run", body = EvaluationRun),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationRun>> {
    Ok(Json(state.archive.get(id).await?))
}

/// Delete an evaluation run
#[utoipa::path(
    delete,
    path = "/evaluations/{id}",
    tag = "evaluations",
    summary = "Delete an evaluation run",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.archive.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the favorite flag on a run
#[utoipa::path(
    post,
    path = "/evaluations/{id}/favorite",
    tag = "evaluations",
    summary = "Toggle favorite",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    responses(
        (status = 200, description = "Updated run", body = EvaluationRun),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn favorite_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationRun>> {
    Ok(Json(state.archive.toggle_favorite(id).await?))
}

/// Add tags to a run
#[utoipa::path(
    post,
    path = "/evaluations/{id}/tags",
    tag = "evaluations",
    summary = "Add tags",
    description = "Add tags with set semantics; duplicates and blank entries are ignored",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    request_body = AddTagsRequest,
    responses(
        (status = 200, description = "Updated run", body = EvaluationRun),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn tag_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<AddTagsRequest>,
) -> Result<Json<EvaluationRun>> {
    Ok(Json(state.archive.add_tags(id, data.tags).await?))
}

/// Append notes to a run
#[utoipa::path(
    post,
    path = "/evaluations/{id}/notes",
    tag = "evaluations",
    summary = "Append notes",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    request_body = AddNotesRequest,
    responses(
        (status = 200, description = "Updated run", body = EvaluationRun),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn annotate_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<AddNotesRequest>,
) -> Result<Json<EvaluationRun>> {
    Ok(Json(state.archive.add_notes(id, &data.notes).await?))
}

/// Re-run an archived evaluation, optionally with overrides
#[utoipa::path(
    post,
    path = "/evaluations/{id}/clone",
    tag = "evaluations",
    summary = "Clone and re-run an evaluation",
    description = "Execute a fresh run using the source run's prompt, models, and parameters, with optional overrides. The source run is left untouched.",
    params(("id" = Uuid, Path, description = "Source evaluation run ID")),
    request_body = CloneEvaluationRequest,
    responses(
        (status = 201, description = "The new run", body = EvaluationRun),
        (status = 404, description = "Source evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn clone_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<CloneEvaluationRequest>,
) -> Result<(StatusCode, Json<EvaluationRun>)> {
    let source = state.archive.get(id).await?;

    let model_ids = data.models.unwrap_or_else(|| {
        source
            .requested_models
            .iter()
            .map(|r| r.model.clone())
            .collect()
    });
    let params = data.params.unwrap_or_else(|| {
        source
            .requested_models
            .first()
            .map(|r| r.params.clone())
            .unwrap_or_default()
    });

    let run = state
        .evaluator
        .evaluate(NewEvaluation {
            prompt: data.prompt.unwrap_or(source.prompt),
            model_ids,
            params,
            created_by: source.created_by,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// Compare the responses of a finished run
#[utoipa::path(
    get,
    path = "/evaluations/{id}/comparison",
    tag = "evaluations",
    summary = "Compare run responses",
    description = "Relative latency/cost/verbosity scoring of the run's successful responses",
    params(("id" = Uuid, Path, description = "Evaluation run ID")),
    responses(
        (status = 200, description = "Comparison report", body = RunComparison),
        (status = 400, description = "Fewer than two successful responses to compare"),
        (status = 404, description = "Evaluation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn compare_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunComparison>> {
    let run = state.archive.get(id).await?;
    let comparison = comparator::compare(&run).ok_or_else(|| Error::BadRequest {
        message: "comparison requires at least two successful responses".to_string(),
    })?;
    Ok(Json(comparison))
}

/// Estimate the cost of an evaluation without running it
#[utoipa::path(
    post,
    path = "/evaluations/estimate",
    tag = "evaluations",
    summary = "Estimate evaluation cost",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Per-model and total estimates", body = EstimateReport),
        (status = 404, description = "Unknown model"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn estimate_evaluation(
    State(state): State<AppState>,
    Json(data): Json<EstimateRequest>,
) -> Result<Json<EstimateReport>> {
    let report = state
        .evaluator
        .estimate(&data.prompt, &data.models, data.expected_output_tokens)?;
    Ok(Json(report))
}
