//! Pure cost and token-count arithmetic.
//!
//! Token counts are approximated as `ceil(word_count * 1.3)` rather than run
//! through a provider tokenizer. This is a documented approximation: backends
//! that report exact counts always win (see [`crate::evaluator`]), and a real
//! per-provider tokenizer can be swapped in behind [`estimate_tokens`] without
//! touching any other component.

use crate::catalog::Model;

/// Approximate tokens-per-word ratio for English prose.
pub const TOKEN_ESTIMATE_FACTOR: f64 = 1.3;

/// Output tokens assumed by pre-flight estimates when the caller gives none.
pub const DEFAULT_EXPECTED_OUTPUT_TOKENS: u64 = 100;

/// Round a currency amount to six decimal places.
///
/// All costs leave this module pre-rounded so that ledger events, responses,
/// and aggregates agree on the same representation.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 1_000_000.0).round() / 1_000_000.0
}

/// Cost of one model invocation, in currency units.
///
/// Deterministic and linear in both token counts (within rounding tolerance).
pub fn cost(tokens_in: u64, tokens_out: u64, model: &Model) -> f64 {
    let raw = tokens_in as f64 / 1000.0 * model.price_per_1k_in
        + tokens_out as f64 / 1000.0 * model.price_per_1k_out;
    round_currency(raw)
}

/// Approximate the token count of a piece of text.
///
/// Empty text (including all-whitespace) estimates to zero tokens.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKEN_ESTIMATE_FACTOR).ceil() as u64
}

/// Pre-flight cost estimate for a prompt against one model.
pub fn estimate_cost(prompt: &str, model: &Model, expected_output_tokens: u64) -> f64 {
    cost(estimate_tokens(prompt), expected_output_tokens, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;

    const TOLERANCE: f64 = 1e-9;

    fn gpt4() -> Model {
        ModelCatalog::with_defaults().get("gpt-4").unwrap().clone()
    }

    #[test]
    fn test_cost_formula() {
        let model = gpt4();
        // 1000 in at 0.03 + 2000 out at 0.06
        assert!((cost(1000, 2000, &model) - 0.15).abs() < TOLERANCE);
        assert_eq!(cost(0, 0, &model), 0.0);
    }

    #[test]
    fn test_cost_deterministic() {
        let model = gpt4();
        assert_eq!(cost(137, 542, &model), cost(137, 542, &model));
    }

    #[test]
    fn test_cost_linearity() {
        let model = gpt4();
        let combined = cost(100 + 250, 40 + 360, &model);
        let split = cost(100, 40, &model) + cost(250, 360, &model);
        // Equal within rounding tolerance (each term is rounded to 6 places)
        assert!((combined - split).abs() < 1e-5);
    }

    #[test]
    fn test_rounding_to_six_places() {
        let model = gpt4();
        let c = cost(1, 1, &model);
        assert_eq!(c, round_currency(c));
        assert_eq!(round_currency(0.123_456_789), 0.123_457);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t "), 0);
        // 10 words * 1.3 = 13
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
        // ceil(1 * 1.3) = 2
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn test_estimate_cost() {
        let model = gpt4();
        let expected = cost(estimate_tokens("summarize this report"), 100, &model);
        assert_eq!(estimate_cost("summarize this report", &model, 100), expected);
    }
}
