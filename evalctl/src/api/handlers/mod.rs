//! Axum route handlers for all API endpoints.

pub mod budget;
pub mod costs;
pub mod evaluations;
pub mod models;
