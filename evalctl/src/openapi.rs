//! OpenAPI documentation configuration.
//!
//! The generated document is served at `/docs` (see [`crate::build_router`]).

use crate::{aggregator, api, catalog, comparator, evaluator, governor, ledger};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Evaluation and cost governance API")
    ),
    paths(
        api::handlers::evaluations::create_evaluation,
        api::handlers::evaluations::list_evaluations,
        api::handlers::evaluations::get_evaluation,
        api::handlers::evaluations::delete_evaluation,
        api::handlers::evaluations::favorite_evaluation,
        api::handlers::evaluations::tag_evaluation,
        api::handlers::evaluations::annotate_evaluation,
        api::handlers::evaluations::clone_evaluation,
        api::handlers::evaluations::compare_evaluation,
        api::handlers::evaluations::estimate_evaluation,
        api::handlers::models::list_models,
        api::handlers::costs::cost_summary,
        api::handlers::costs::current_month_costs,
        api::handlers::costs::top_tenants,
        api::handlers::budget::get_budget,
        api::handlers::budget::update_budget,
        api::handlers::budget::budget_alerts,
        api::handlers::budget::budget_forecast,
    ),
    components(
        schemas(
            api::models::evaluations::CreateEvaluationRequest,
            api::models::evaluations::EstimateRequest,
            api::models::evaluations::AddTagsRequest,
            api::models::evaluations::AddNotesRequest,
            api::models::evaluations::CloneEvaluationRequest,
            api::models::budget::UpdateBudgetRequest,
            evaluator::EvaluationRun,
            evaluator::RequestedModel,
            evaluator::ModelResponse,
            evaluator::EvaluationParams,
            evaluator::FinishReason,
            evaluator::EstimateReport,
            evaluator::ModelEstimate,
            comparator::RunComparison,
            comparator::ResponseScore,
            catalog::Model,
            catalog::Provider,
            catalog::Tier,
            catalog::Capability,
            ledger::UsageEvent,
            ledger::Feature,
            aggregator::CostSummary,
            aggregator::BreakdownEntry,
            aggregator::ModelBreakdownEntry,
            aggregator::TenantSpend,
            governor::BudgetStatus,
            governor::BudgetAlert,
            governor::SpendForecast,
        )
    ),
    tags(
        (name = "evaluations", description = "Run prompts against several models, browse and curate the archive"),
        (name = "models", description = "The model catalog with pricing and capabilities"),
        (name = "costs", description = "Spend summaries derived from the usage ledger"),
        (name = "budget", description = "Monthly budget, threshold alerts, and forecasting"),
    )
)]
pub struct ApiDoc;
