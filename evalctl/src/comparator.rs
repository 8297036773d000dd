//! Pure scoring of a finished run's responses against each other.
//!
//! Scores are relative within one run: latency and cost are measured against
//! the best candidate in the run, verbosity against the most verbose, so the
//! numbers are only meaningful for comparing siblings, never across runs.
//! Failed responses are excluded; with fewer than two candidates left there
//! is nothing to compare and no report is produced.

use crate::evaluator::{EvaluationRun, ModelResponse};
use crate::types::RunId;
use serde::Serialize;
use utoipa::ToSchema;

/// Per-response scores, each on a 0-100 scale.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseScore {
    pub model: String,
    /// 100 for the fastest candidate, shrinking with percent excess latency
    pub latency_score: f64,
    /// 100 for the cheapest candidate, shrinking with percent excess cost
    pub cost_score: f64,
    /// Output length relative to the most verbose candidate
    pub verbosity_score: f64,
    /// Equal-weight mean of the three sub-scores
    pub composite: f64,
}

/// Comparison of all successful responses in one run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunComparison {
    #[schema(value_type = String, format = "uuid")]
    pub run_id: RunId,
    /// One entry per successful response, in run order
    pub scores: Vec<ResponseScore>,
    /// Highest composite; ties go to the earliest response in run order
    pub winner: String,
    pub fastest: String,
    pub cheapest: String,
}

fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 100 when `value` matches the best, dropping by the percent excess over it,
/// floored at zero. A zero best makes any larger value score zero outright.
fn relative_score(value: f64, best: f64) -> f64 {
    if value <= best {
        return 100.0;
    }
    if best == 0.0 {
        return 0.0;
    }
    (100.0 - (value - best) / best * 100.0).max(0.0)
}

/// Compare the successful responses of a run. `None` when fewer than two
/// responses are comparable.
pub fn compare(run: &EvaluationRun) -> Option<RunComparison> {
    let candidates: Vec<&ModelResponse> =
        run.responses.iter().filter(|r| r.error.is_none()).collect();
    if candidates.len() < 2 {
        return None;
    }

    let best_latency = candidates
        .iter()
        .map(|r| r.latency_ms as f64)
        .fold(f64::INFINITY, f64::min);
    let best_cost = candidates
        .iter()
        .map(|r| r.cost)
        .fold(f64::INFINITY, f64::min);
    let max_tokens_out = candidates.iter().map(|r| r.tokens_out).max().unwrap_or(0);

    // Composites are rounded for display only; the winner is decided on the
    // unrounded values so a sub-rounding lead still counts
    let scored: Vec<(f64, ResponseScore)> = candidates
        .iter()
        .map(|r| {
            let latency_score = relative_score(r.latency_ms as f64, best_latency);
            let cost_score = relative_score(r.cost, best_cost);
            let verbosity_score = if max_tokens_out == 0 {
                100.0
            } else {
                r.tokens_out as f64 / max_tokens_out as f64 * 100.0
            };
            let composite = (latency_score + cost_score + verbosity_score) / 3.0;
            let score = ResponseScore {
                model: r.model.clone(),
                latency_score: round_score(latency_score),
                cost_score: round_score(cost_score),
                verbosity_score: round_score(verbosity_score),
                composite: round_score(composite),
            };
            (composite, score)
        })
        .collect();

    // Strictly-greater comparisons so ties resolve to the earliest entry
    let mut winner = &scored[0];
    for entry in &scored[1..] {
        if entry.0 > winner.0 {
            winner = entry;
        }
    }
    let winner = winner.1.model.clone();
    let scores: Vec<ResponseScore> = scored.into_iter().map(|(_, score)| score).collect();
    let mut fastest = candidates[0];
    let mut cheapest = candidates[0];
    for candidate in &candidates[1..] {
        if (candidate.latency_ms as f64) < fastest.latency_ms as f64 {
            fastest = candidate;
        }
        if candidate.cost < cheapest.cost {
            cheapest = candidate;
        }
    }

    Some(RunComparison {
        run_id: run.id,
        winner,
        fastest: fastest.model.clone(),
        cheapest: cheapest.model.clone(),
        scores,
    })
}
