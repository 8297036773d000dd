//! HTTP handlers for budget governance endpoints.

use crate::{
    AppState,
    api::models::budget::UpdateBudgetRequest,
    errors::Result,
    governor::{BudgetAlert, BudgetStatus, SpendForecast},
};
use axum::{extract::State, response::Json};

/// Budget against this month's spend
#[utoipa::path(
    get,
    path = "/budget",
    tag = "budget",
    summary = "Get budget status",
    responses(
        (status = 200, description = "Budget and current spend", body = BudgetStatus),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_budget(State(state): State<AppState>) -> Result<Json<BudgetStatus>> {
    Ok(Json(state.governor.status().await?))
}

/// Replace the monthly budget
#[utoipa::path(
    put,
    path = "/budget",
    tag = "budget",
    summary = "Set monthly budget",
    request_body = UpdateBudgetRequest,
    responses(
        (status = 200, description = "Updated budget status", body = BudgetStatus),
        (status = 400, description = "Negative or non-finite amount"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_budget(
    State(state): State<AppState>,
    Json(data): Json<UpdateBudgetRequest>,
) -> Result<Json<BudgetStatus>> {
    state.governor.set_budget(data.monthly_budget).await?;
    Ok(Json(state.governor.status().await?))
}

/// Threshold alerts for the current month
#[utoipa::path(
    get,
    path = "/budget/alerts",
    tag = "budget",
    summary = "Budget alerts",
    description = "All configured thresholds with their standing against this month's spend, recomputed on every request",
    responses(
        (status = 200, description = "Alert standings", body = Vec<BudgetAlert>),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn budget_alerts(State(state): State<AppState>) -> Result<Json<Vec<BudgetAlert>>> {
    Ok(Json(state.governor.alerts().await?))
}

/// Straight-line month-end spend projection
#[utoipa::path(
    get,
    path = "/budget/forecast",
    tag = "budget",
    summary = "Spend forecast",
    responses(
        (status = 200, description = "Projected month-end spend", body = SpendForecast),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn budget_forecast(State(state): State<AppState>) -> Result<Json<SpendForecast>> {
    Ok(Json(state.governor.forecast().await?))
}
