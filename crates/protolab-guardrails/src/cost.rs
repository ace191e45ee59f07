//! Token usage and cost accounting for a session.
//!
//! A [`CostTracker`] is a pure ledger: counts only ever increase, and the
//! estimated cost is always a function of the cumulative token counts and
//! the per-model rate table. Limit checks never mutate the tracker.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-1K-token pricing for a model.
#[derive(Debug, Clone, Copy)]
struct ModelRate {
    input: f64,
    output: f64,
}

/// Approximate pricing per 1K tokens, keyed by model identifier.
static MODEL_RATES: Lazy<HashMap<&'static str, ModelRate>> = Lazy::new(|| {
    HashMap::from([
        (
            "gpt-4o-mini",
            ModelRate {
                input: 0.00015,
                output: 0.0006,
            },
        ),
        (
            "gpt-4o",
            ModelRate {
                input: 0.005,
                output: 0.015,
            },
        ),
        (
            "gpt-4-turbo",
            ModelRate {
                input: 0.01,
                output: 0.03,
            },
        ),
        (
            "gpt-3.5-turbo",
            ModelRate {
                input: 0.0005,
                output: 0.0015,
            },
        ),
    ])
});

/// Rate used when the model is not present in the table.
const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Usage ledger for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTracker {
    /// Session this ledger belongs to.
    pub session_id: String,
    /// Model identifier used for rate lookup.
    pub model: String,
    /// Cumulative input tokens.
    pub input_tokens: u64,
    /// Cumulative output tokens.
    pub output_tokens: u64,
    /// Cumulative tool invocations.
    pub tool_calls: u64,
    /// Estimated cost in USD, derived from the token counts.
    pub estimated_cost: f64,
}

impl CostTracker {
    /// Creates a zeroed tracker for a session.
    pub fn new(session_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            tool_calls: 0,
            estimated_cost: 0.0,
        }
    }

    /// Adds usage to the ledger and recomputes the estimated cost.
    pub fn record(&mut self, input_tokens: u64, output_tokens: u64, tool_calls: u64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.tool_calls += tool_calls;
        self.estimated_cost = estimate_cost(&self.model, self.input_tokens, self.output_tokens);
    }

    /// Total tokens consumed so far (input + output).
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Computes the estimated cost in USD for the given cumulative token counts.
///
/// Unknown models fall back to the `gpt-4o-mini` rate.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let rate = MODEL_RATES
        .get(model)
        .or_else(|| MODEL_RATES.get(FALLBACK_MODEL))
        .copied()
        .unwrap_or(ModelRate {
            input: 0.0,
            output: 0.0,
        });
    (input_tokens as f64 * rate.input + output_tokens as f64 * rate.output) / 1000.0
}

/// Budget thresholds for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLimits {
    /// Maximum total tokens (input + output) per session.
    pub max_tokens_per_session: u64,
    /// Maximum estimated cost in USD per session.
    pub max_cost_per_session: f64,
    /// Maximum tool invocations per session.
    pub max_tool_calls_per_session: u64,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            max_tokens_per_session: 100_000,
            max_cost_per_session: 0.50,
            max_tool_calls_per_session: 100,
        }
    }
}

/// Result of evaluating a tracker against limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    /// True iff no threshold is breached.
    pub ok: bool,
    /// One human-readable message per breached threshold.
    pub violations: Vec<String>,
}

/// Evaluates the three thresholds independently.
///
/// Each breached threshold contributes exactly one violation message; the
/// tracker is not modified.
pub fn check_limits(tracker: &CostTracker, limits: &CostLimits) -> LimitCheck {
    let mut violations = Vec::new();

    if tracker.total_tokens() > limits.max_tokens_per_session {
        violations.push(format!(
            "Token limit exceeded: {}/{}",
            tracker.total_tokens(),
            limits.max_tokens_per_session
        ));
    }

    if tracker.estimated_cost > limits.max_cost_per_session {
        violations.push(format!(
            "Cost limit exceeded: ${:.4}/{}",
            tracker.estimated_cost, limits.max_cost_per_session
        ));
    }

    if tracker.tool_calls > limits.max_tool_calls_per_session {
        violations.push(format!(
            "Tool call limit exceeded: {}/{}",
            tracker.tool_calls, limits.max_tool_calls_per_session
        ));
    }

    LimitCheck {
        ok: violations.is_empty(),
        violations,
    }
}
