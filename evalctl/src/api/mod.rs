//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! The API is divided into several functional areas:
//!
//! - **Evaluations** (`/api/v1/evaluations/*`): Run, browse, curate, compare,
//!   and clone prompt evaluations
//! - **Models** (`/api/v1/models`): The model catalog
//! - **Costs** (`/api/v1/costs/*`): Ledger-derived spend summaries
//! - **Budget** (`/api/v1/budget/*`): Monthly budget, alerts, and forecast
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
