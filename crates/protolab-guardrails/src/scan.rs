//! Heuristic sensitive-data scanner.
//!
//! Flags email-address-shaped tokens and secret-hint keywords in free text.
//! A clean report means "no match against the known patterns", not a
//! certification that the text is free of sensitive data.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("email pattern is valid")
});

static SECRET_HINT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)api[_-]?key|secret|password|token").expect("secret-hint pattern is valid")
});

/// Kind of sensitive match found in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// An email-address-shaped token.
    Email,
    /// A secret-like keyword (api_key, secret, password, token).
    SecretHint,
}

/// One match found in the scanned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Matched text for emails; a fixed redacted marker for secret hints.
    pub snippet: String,
}

/// Result of scanning a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// True iff no findings.
    pub ok: bool,
    pub findings: Vec<Finding>,
}

/// Scans `text` for PII-like and secret-like patterns.
pub fn scan_text(text: &str) -> ScanReport {
    let mut findings = Vec::new();

    if let Some(m) = EMAIL_PATTERN.find(text) {
        findings.push(Finding {
            kind: FindingKind::Email,
            snippet: m.as_str().to_string(),
        });
    }

    if SECRET_HINT_PATTERN.is_match(text) {
        findings.push(Finding {
            kind: FindingKind::SecretHint,
            snippet: "...contains secret-like keyword...".to_string(),
        });
    }

    ScanReport {
        ok: findings.is_empty(),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_email() {
        let report = scan_text("Contact jane.doe@example.com for details");
        assert!(!report.ok);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::Email);
        assert_eq!(report.findings[0].snippet, "jane.doe@example.com");
    }

    #[test]
    fn test_detects_secret_hint_case_insensitive() {
        let report = scan_text("Set the API_KEY env var before launch");
        assert!(!report.ok);
        assert_eq!(report.findings[0].kind, FindingKind::SecretHint);
    }

    #[test]
    fn test_clean_text_is_ok() {
        let report = scan_text("Launch announcement: the habit tracker is live!");
        assert!(report.ok);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_email_and_secret_both_reported() {
        let report = scan_text("password reset for bob@corp.io");
        assert!(!report.ok);
        assert_eq!(report.findings.len(), 2);
    }
}
