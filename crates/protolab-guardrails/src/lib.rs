//! Guardrail primitives for the Protolab pipeline.
//!
//! This crate bundles the pure, reusable safety mechanisms the orchestrator
//! composes around external calls:
//!
//! - [`cost`]: token/tool-call accounting and budget limit checks
//! - [`resilience`]: retry with exponential backoff and a circuit breaker
//! - [`scan`]: heuristic detection of PII-like and secret-like text
//!
//! Nothing in here talks to the network or the filesystem; everything is
//! driven by the caller.

pub mod cost;
pub mod resilience;
pub mod scan;

pub use cost::{CostLimits, CostTracker, LimitCheck};
pub use resilience::{BreakerError, BreakerState, CircuitBreaker, RetryConfig, RetryResult};
pub use scan::{Finding, FindingKind, ScanReport};
