//! Request/response models for cost and budget endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Body for `PUT /budget`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBudgetRequest {
    /// New monthly budget in currency units; zero freezes spending alerts at 100%
    pub monthly_budget: f64,
}

/// Query parameters for `GET /costs/summary`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CostWindowQuery {
    /// Window start (inclusive); unbounded when omitted
    pub start: Option<DateTime<Utc>>,
    /// Window end (inclusive); unbounded when omitted
    pub end: Option<DateTime<Utc>>,
}

/// Query parameters for `GET /costs/tenants/top`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TopTenantsQuery {
    /// Number of tenants to return (default 5)
    pub limit: Option<usize>,
}
