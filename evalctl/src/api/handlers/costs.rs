//! HTTP handlers for cost reporting endpoints.

use crate::{
    AppState,
    aggregator::{CostSummary, TenantSpend},
    api::models::budget::{CostWindowQuery, TopTenantsQuery},
    errors::Result,
};
use axum::{
    extract::{Query, State},
    response::Json,
};

const DEFAULT_TOP_TENANTS: usize = 5;

/// Spend over an arbitrary window
#[utoipa::path(
    get,
    path = "/costs/summary",
    tag = "costs",
    summary = "Cost summary",
    description = "Aggregate ledger spend over the given window, broken down by model, feature, and tenant",
    params(CostWindowQuery),
    responses(
        (status = 200, description = "Cost summary", body = CostSummary),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn cost_summary(
    State(state): State<AppState>,
    Query(query): Query<CostWindowQuery>,
) -> Result<Json<CostSummary>> {
    Ok(Json(state.aggregator.summary(query.start, query.end).await?))
}

/// Spend so far this calendar month
#[utoipa::path(
    get,
    path = "/costs/current-month",
    tag = "costs",
    summary = "Current month costs",
    responses(
        (status = 200, description = "Cost summary for the current month", body = CostSummary),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn current_month_costs(State(state): State<AppState>) -> Result<Json<CostSummary>> {
    Ok(Json(state.aggregator.current_month_summary().await?))
}

/// Biggest-spending tenants this month
#[utoipa::path(
    get,
    path = "/costs/tenants/top",
    tag = "costs",
    summary = "Top spending tenants",
    params(TopTenantsQuery),
    responses(
        (status = 200, description = "Tenants ranked by spend, highest first", body = Vec<TenantSpend>),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn top_tenants(
    State(state): State<AppState>,
    Query(query): Query<TopTenantsQuery>,
) -> Result<Json<Vec<TenantSpend>>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_TENANTS);
    Ok(Json(state.aggregator.top_tenants(limit).await?))
}
