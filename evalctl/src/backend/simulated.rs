//! Deterministic simulated response generator.
//!
//! Exists so the whole pipeline (cost, comparison, archiving) stays
//! exercisable without a live backend. For a fixed `(prompt, model)` pair the
//! output text and the artificial delay are identical on every call; the
//! response category is picked by simple keyword matching on the prompt.

use super::{BackendError, BackendReply, ModelBackend};
use crate::{catalog::Model, evaluator::EvaluationParams};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

const CODE_KEYWORDS: &[&str] = &["code", "function", "implement", "script", "program", "bug"];
const EXPLAIN_KEYWORDS: &[&str] = &["explain", "why", "how", "what is", "describe", "compare"];

/// Placeholder response category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind {
    CodeLike,
    Explanatory,
    Generic,
}

fn classify(prompt: &str) -> ResponseKind {
    let lowered = prompt.to_lowercase();
    if CODE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ResponseKind::CodeLike
    } else if EXPLAIN_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ResponseKind::Explanatory
    } else {
        ResponseKind::Generic
    }
}

/// Stable per-(prompt, model) seed driving delay and verbosity.
fn seed(prompt: &str, model_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    prompt.hash(&mut hasher);
    model_id.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    base_delay: Duration,
    delay_spread_ms: u64,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(20),
            delay_spread_ms: 180,
        }
    }
}

impl SimulatedBackend {
    /// Backend with no artificial delay, for latency-insensitive tests.
    pub fn instant() -> Self {
        Self {
            base_delay: Duration::ZERO,
            delay_spread_ms: 0,
        }
    }

    fn render(&self, prompt: &str, model: &Model) -> String {
        let snippet: String = prompt.chars().take(50).collect();
        let seed = seed(prompt, &model.id);
        // 1-3 filler paragraphs so verbosity differs between models
        let filler_count = (seed >> 8) % 3 + 1;

        let mut text = match classify(prompt) {
            ResponseKind::CodeLike => format!(
                "Here is a simulated code response from {} for \"{snippet}\":\n\n```\nfn example() {{\n    // generated placeholder\n}}\n```",
                model.display_name
            ),
            ResponseKind::Explanatory => format!(
                "Simulated explanation from {}: the short answer to \"{snippet}\" depends on context, but the key factors break down as follows.",
                model.display_name
            ),
            ResponseKind::Generic => format!(
                "This is a simulated response from {}. In production, this would be the actual model response to: \"{snippet}\"",
                model.display_name
            ),
        };

        for i in 0..filler_count {
            text.push_str(&format!(
                "\n\nAdditional simulated detail paragraph {} expanding on the request with placeholder reasoning and context.",
                i + 1
            ));
        }
        text
    }
}

#[async_trait::async_trait]
impl ModelBackend for SimulatedBackend {
    async fn complete(
        &self,
        prompt: &str,
        model: &Model,
        _params: &EvaluationParams,
    ) -> Result<BackendReply, BackendError> {
        let delay = if self.delay_spread_ms > 0 {
            self.base_delay + Duration::from_millis(seed(prompt, &model.id) % self.delay_spread_ms)
        } else {
            self.base_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // No reported token counts: the evaluator estimates from the text
        Ok(BackendReply {
            text: self.render(prompt, model),
            tokens_in: None,
            tokens_out: None,
        })
    }
}
