//! HTTP handlers for the model catalog.

use crate::{
    AppState,
    catalog::{Model, ModelFilter},
    errors::Result,
};
use axum::{
    extract::{Query, State},
    response::Json,
};

/// List catalog models
#[utoipa::path(
    get,
    path = "/models",
    tag = "models",
    summary = "List models",
    description = "The model catalog, optionally filtered by provider, tier, capability, or availability",
    params(ModelFilter),
    responses(
        (status = 200, description = "Matching models", body = Vec<Model>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_models(
    State(state): State<AppState>,
    Query(filter): Query<ModelFilter>,
) -> Result<Json<Vec<Model>>> {
    let models = state.catalog.filter(&filter).into_iter().cloned().collect();
    Ok(Json(models))
}
