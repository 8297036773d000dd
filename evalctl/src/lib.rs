//! Evaluation and cost-governance engine for generative model usage.
//!
//! One prompt goes in, several models answer concurrently, and every attempt
//! is metered: the engine collects comparable responses, appends usage events
//! to an append-only ledger, derives cost summaries on read, and governs a
//! monthly budget with threshold alerts and a straight-line forecast.
//!
//! # Architecture
//!
//! - [`evaluator`]: concurrent fan-out of one prompt to N models, with per-unit
//!   failure isolation and a shared run deadline
//! - [`backend`]: the model backend seam; a live HTTP client and a
//!   deterministic simulated generator
//! - [`catalog`] / [`pricing`]: the priced model registry and pure cost math
//! - [`ledger`] / [`aggregator`]: append-only usage events and read-side
//!   aggregation (the ledger is the single source of truth for spend)
//! - [`governor`]: monthly budget, stateless threshold alerts, forecasting
//! - [`archive`] / [`comparator`]: run history with curation, and relative
//!   response scoring
//! - [`api`]: the REST surface, documented with OpenAPI and served with axum
//!
//! # Example
//!
//! ```no_run
//! use evalctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.serve(std::future::pending::<()>()).await
//! }
//! ```

pub mod aggregator;
pub mod api;
pub mod archive;
pub mod backend;
pub mod catalog;
pub mod comparator;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod governor;
pub mod ledger;
pub mod openapi;
pub mod pricing;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    aggregator::CostAggregator,
    archive::EvaluationArchive,
    backend::{LiveBackend, ModelBackend, SimulatedBackend},
    catalog::ModelCatalog,
    evaluator::PromptEvaluator,
    governor::BudgetGovernor,
    ledger::UsageLedger,
    openapi::ApiDoc,
    store::{
        BudgetStore,
        file::FileBudgetStore,
        memory::{InMemoryBudgetStore, InMemoryEvaluationStore, InMemoryUsageStore},
    },
    types::{Clock, SystemClock},
};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use bon::Builder;
pub use config::Config;
pub use errors::{Error, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// Everything in here is cheap to clone: the heavyweight collaborators sit
/// behind `Arc`s inside the component facades.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<ModelCatalog>,
    pub evaluator: PromptEvaluator,
    pub archive: EvaluationArchive,
    pub aggregator: CostAggregator,
    pub governor: Arc<BudgetGovernor>,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new().allow_origin(origin))
}

/// Build the application router with all endpoints and middleware.
///
/// The API surface is nested under `/api/v1`, with a `/healthz` liveness
/// probe and interactive docs at `/docs` alongside it.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/evaluations", post(api::handlers::evaluations::create_evaluation))
        .route("/evaluations", get(api::handlers::evaluations::list_evaluations))
        .route("/evaluations/estimate", post(api::handlers::evaluations::estimate_evaluation))
        .route("/evaluations/{id}", get(api::handlers::evaluations::get_evaluation))
        .route("/evaluations/{id}", delete(api::handlers::evaluations::delete_evaluation))
        .route("/evaluations/{id}/favorite", post(api::handlers::evaluations::favorite_evaluation))
        .route("/evaluations/{id}/tags", post(api::handlers::evaluations::tag_evaluation))
        .route("/evaluations/{id}/notes", post(api::handlers::evaluations::annotate_evaluation))
        .route("/evaluations/{id}/clone", post(api::handlers::evaluations::clone_evaluation))
        .route("/evaluations/{id}/comparison", get(api::handlers::evaluations::compare_evaluation))
        .route("/models", get(api::handlers::models::list_models))
        .route("/costs/summary", get(api::handlers::costs::cost_summary))
        .route("/costs/current-month", get(api::handlers::costs::current_month_costs))
        .route("/costs/tenants/top", get(api::handlers::costs::top_tenants))
        .route("/budget", get(api::handlers::budget::get_budget))
        .route("/budget", put(api::handlers::budget::update_budget))
        .route("/budget/alerts", get(api::handlers::budget::budget_alerts))
        .route("/budget/forecast", get(api::handlers::budget::budget_forecast))
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The wired application: catalog, stores, evaluator, and router.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Wire all components from configuration.
    ///
    /// With no `backend.url` configured the engine serves simulated responses
    /// for every model and never makes outbound calls.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(if config.models.is_empty() {
            ModelCatalog::with_defaults()
        } else {
            ModelCatalog::new(config.models.clone())?
        });

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let evaluations = Arc::new(InMemoryEvaluationStore::default());
        let usage = Arc::new(InMemoryUsageStore::default());
        let budget: Arc<dyn BudgetStore> = match &config.budget.store_path {
            Some(path) => Arc::new(FileBudgetStore::new(path.clone())),
            None => Arc::new(InMemoryBudgetStore::default()),
        };

        let simulated = Arc::new(SimulatedBackend::default());
        let backend: Arc<dyn ModelBackend> = match &config.backend.url {
            Some(url) => {
                info!(backend = %url, "using live model backend");
                Arc::new(LiveBackend::new(url, config.backend.timeout)?)
            }
            None => {
                info!("no backend configured, serving simulated responses");
                simulated.clone()
            }
        };

        let ledger = UsageLedger::new(usage, clock.clone());
        let aggregator = CostAggregator::new(ledger.clone(), clock.clone());

        let evaluator = PromptEvaluator::builder()
            .catalog(catalog.clone())
            .backend(backend)
            .simulated(simulated)
            .evaluations(evaluations.clone())
            .ledger(ledger)
            .clock(clock.clone())
            .run_deadline(config.evaluation.run_deadline)
            .max_models_per_run(config.evaluation.max_models_per_run)
            .build();

        let governor = Arc::new(BudgetGovernor::new(
            budget,
            aggregator.clone(),
            clock,
            config.budget.default_monthly,
        ));

        let state = AppState::builder()
            .config(config.clone())
            .catalog(catalog)
            .evaluator(evaluator)
            .archive(EvaluationArchive::new(evaluations))
            .aggregator(aggregator)
            .governor(governor)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Evaluation engine listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationRun;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    fn test_server() -> TestServer {
        Application::new(Config::default())
            .expect("failed to wire application")
            .into_test_server()
    }

    async fn run_evaluation(server: &TestServer, prompt: &str, models: &[&str]) -> EvaluationRun {
        let response = server
            .post("/api/v1/evaluations")
            .json(&json!({ "prompt": prompt, "models": models }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<EvaluationRun>()
    }

    #[tokio::test]
    async fn test_healthz() {
        let server = test_server();
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_evaluation_flow_end_to_end() {
        let server = test_server();
        let run = run_evaluation(&server, "compare response styles", &["gpt-4", "gemini-pro"]).await;

        assert_eq!(run.responses.len(), 2);
        assert_eq!(run.responses[0].model, "gpt-4");
        assert_eq!(run.responses[1].model, "gemini-pro");
        assert!(run.responses.iter().all(|r| r.error.is_none()));

        // The archived run is retrievable
        let fetched = server.get(&format!("/api/v1/evaluations/{}", run.id)).await;
        fetched.assert_status_ok();
        assert_eq!(fetched.json::<EvaluationRun>().id, run.id);

        // And its spend shows up in the current month summary
        let summary = server.get("/api/v1/costs/current-month").await;
        summary.assert_status_ok();
        let summary: Value = summary.json();
        let run_total: f64 = run.responses.iter().map(|r| r.cost).sum();
        let reported = summary["total_cost"].as_f64().unwrap();
        assert!((reported - run_total).abs() < 1e-6);
        assert_eq!(summary["total_requests"].as_u64(), Some(2));
    }

    #[tokio::test]
    async fn test_comparison_endpoint() {
        let server = test_server();
        let run = run_evaluation(&server, "hello", &["gpt-4", "gemini-pro", "claude-3-sonnet"]).await;

        let response = server
            .get(&format!("/api/v1/evaluations/{}/comparison", run.id))
            .await;
        response.assert_status_ok();
        let comparison: Value = response.json();
        assert_eq!(comparison["scores"].as_array().unwrap().len(), 3);
        assert!(comparison["winner"].is_string());
        assert!(comparison["cheapest"].is_string());
    }

    #[tokio::test]
    async fn test_comparison_needs_two_successes() {
        let server = test_server();
        let run = run_evaluation(&server, "hello", &["gpt-4"]).await;

        let response = server
            .get(&format!("/api/v1/evaluations/{}/comparison", run.id))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_search_and_favorites() {
        let server = test_server();
        let tagged = run_evaluation(&server, "write a sorting function", &["gpt-4"]).await;
        run_evaluation(&server, "describe the weather", &["gpt-4"]).await;

        let favorited = server
            .post(&format!("/api/v1/evaluations/{}/favorite", tagged.id))
            .await;
        favorited.assert_status_ok();
        assert!(favorited.json::<EvaluationRun>().is_favorite);

        let favorites = server.get("/api/v1/evaluations?favorites=true").await;
        favorites.assert_status_ok();
        let favorites = favorites.json::<Vec<EvaluationRun>>();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, tagged.id);

        let hits = server.get("/api/v1/evaluations?q=sorting").await;
        let hits = hits.json::<Vec<EvaluationRun>>();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, tagged.id);
    }

    #[tokio::test]
    async fn test_tags_and_notes_endpoints() {
        let server = test_server();
        let run = run_evaluation(&server, "hello", &["gpt-4"]).await;

        let tagged = server
            .post(&format!("/api/v1/evaluations/{}/tags", run.id))
            .json(&json!({ "tags": ["baseline", "baseline", " styles "] }))
            .await;
        tagged.assert_status_ok();
        assert_eq!(tagged.json::<EvaluationRun>().tags, vec!["baseline", "styles"]);

        let annotated = server
            .post(&format!("/api/v1/evaluations/{}/notes", run.id))
            .json(&json!({ "notes": "good spread of styles" }))
            .await;
        annotated.assert_status_ok();
        assert_eq!(annotated.json::<EvaluationRun>().notes, "good spread of styles");
    }

    #[tokio::test]
    async fn test_clone_with_prompt_override() {
        let server = test_server();
        let source = run_evaluation(&server, "original prompt", &["gpt-4", "gemini-pro"]).await;

        let cloned = server
            .post(&format!("/api/v1/evaluations/{}/clone", source.id))
            .json(&json!({ "prompt": "revised prompt" }))
            .await;
        cloned.assert_status(axum::http::StatusCode::CREATED);
        let cloned = cloned.json::<EvaluationRun>();

        assert_ne!(cloned.id, source.id);
        assert_eq!(cloned.prompt, "revised prompt");
        // Models are inherited from the source run
        assert_eq!(cloned.responses.len(), 2);
        assert_eq!(cloned.responses[0].model, "gpt-4");
    }

    #[tokio::test]
    async fn test_delete_evaluation() {
        let server = test_server();
        let run = run_evaluation(&server, "hello", &["gpt-4"]).await;

        let deleted = server.delete(&format!("/api/v1/evaluations/{}", run.id)).await;
        deleted.assert_status(axum::http::StatusCode::NO_CONTENT);

        let gone = server.get(&format!("/api/v1/evaluations/{}", run.id)).await;
        gone.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_estimate_endpoint() {
        let server = test_server();
        let response = server
            .post("/api/v1/evaluations/estimate")
            .json(&json!({ "prompt": "summarize this report", "models": ["gpt-4", "gemini-pro"] }))
            .await;
        response.assert_status_ok();
        let report: Value = response.json();
        assert_eq!(report["per_model"].as_array().unwrap().len(), 2);
        assert!(report["total_estimated_cost"].as_f64().unwrap() > 0.0);

        let unknown = server
            .post("/api/v1/evaluations/estimate")
            .json(&json!({ "prompt": "x", "models": ["no-such-model"] }))
            .await;
        unknown.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_models_endpoint_with_filter() {
        let server = test_server();

        let all = server.get("/api/v1/models").await;
        all.assert_status_ok();
        assert_eq!(all.json::<Value>().as_array().unwrap().len(), 6);

        let anthropic = server.get("/api/v1/models?provider=anthropic").await;
        anthropic.assert_status_ok();
        assert_eq!(anthropic.json::<Value>().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_surface() {
        let server = test_server();

        // Defaults before anything is set
        let status = server.get("/api/v1/budget").await;
        status.assert_status_ok();
        assert_eq!(status.json::<Value>()["monthly_budget"].as_f64(), Some(2000.0));

        let updated = server
            .put("/api/v1/budget")
            .json(&json!({ "monthly_budget": 1000.0 }))
            .await;
        updated.assert_status_ok();
        assert_eq!(updated.json::<Value>()["monthly_budget"].as_f64(), Some(1000.0));

        let rejected = server
            .put("/api/v1/budget")
            .json(&json!({ "monthly_budget": -5.0 }))
            .await;
        rejected.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let alerts = server.get("/api/v1/budget/alerts").await;
        alerts.assert_status_ok();
        let alerts: Value = alerts.json();
        assert_eq!(alerts.as_array().unwrap().len(), 3);
        assert!(alerts.as_array().unwrap().iter().all(|a| a["triggered"] == json!(false)));

        let forecast = server.get("/api/v1/budget/forecast").await;
        forecast.assert_status_ok();
        assert_eq!(forecast.json::<Value>()["current_spend"].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn test_bad_request_payloads() {
        let server = test_server();

        let empty_prompt = server
            .post("/api/v1/evaluations")
            .json(&json!({ "prompt": "  ", "models": ["gpt-4"] }))
            .await;
        empty_prompt.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let bad_params = server
            .post("/api/v1/evaluations")
            .json(&json!({ "prompt": "hello", "models": ["gpt-4"], "params": { "temperature": 9.0 } }))
            .await;
        bad_params.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
