//! Request/response data structures for the REST API.

pub mod budget;
pub mod evaluations;
