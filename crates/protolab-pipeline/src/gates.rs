//! Free-text gate classification.
//!
//! Agent outputs are free text, so the reference gates are keyword
//! heuristics. They live behind [`OutputClassifier`] so a structured
//! status field can replace them without touching the pipeline's gate
//! logic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Classifies agent output for the pipeline's gates.
pub trait OutputClassifier: Send + Sync {
    /// QA gate: does the output indicate a passing test run?
    fn qa_passed(&self, output: &str) -> bool;

    /// Delegated-mode check: does the output flag a blocking problem?
    fn signals_blocked(&self, output: &str) -> bool;

    /// Deploy gate: does the output carry an explicit rollback flag?
    fn rollback_flagged(&self, output: &str) -> bool;
}

static QA_PASSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)passed|green|success").expect("qa pattern is valid"));

static ROLLBACK_FLAGGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)rollback_needed":\s*true"#).expect("rollback pattern is valid"));

/// Reference keyword classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl OutputClassifier for KeywordClassifier {
    fn qa_passed(&self, output: &str) -> bool {
        QA_PASSED.is_match(output)
    }

    fn signals_blocked(&self, output: &str) -> bool {
        output.contains("blocked") || output.contains("failed")
    }

    fn rollback_flagged(&self, output: &str) -> bool {
        ROLLBACK_FLAGGED.is_match(output)
    }
}
