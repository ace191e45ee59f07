//! Domain records shared across the pipeline.
//!
//! These are the pure data shapes the store and the orchestrator operate
//! on, independent of any agent runtime or tool provider.

use crate::error::{ProtolabError, Result};
use crate::policy::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use uuid::Uuid;

/// Generates a prefixed unique id, e.g. `session-6f9a...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// One build target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: String,
    pub name: String,
    /// Repository URL once the coder phase has created one.
    pub repo_url: Option<String>,
    /// Deployment environments (e.g. staging, production).
    pub environments: Vec<String>,
}

/// One orchestration attempt over a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_id: String,
    /// Append-only transcript of `agent: message` entries.
    pub transcript: Vec<String>,
    pub budget_tokens: Option<u64>,
}

/// Run lifecycle status. Transitions only move forward:
/// pending → running → succeeded | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// One tool invocation within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
}

/// One agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub agent: Role,
    pub status: RunStatus,
    pub cost_tokens: u64,
    /// Correlation id, usually the owning session id.
    pub trace_id: Option<String>,
    /// Ordered tool invocations made during this run.
    pub tool_calls: Vec<ToolCall>,
}

impl Run {
    /// Creates a pending run for an agent.
    pub fn new(agent: Role, trace_id: Option<String>) -> Self {
        Self {
            id: generate_id("run"),
            agent,
            status: RunStatus::Pending,
            cost_tokens: 0,
            trace_id,
            tool_calls: Vec::new(),
        }
    }

    /// Advances the run status, rejecting backward transitions.
    pub fn advance(&mut self, next: RunStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ProtolabError::internal(format!(
                "invalid run transition {} -> {} for '{}'",
                self.status, next, self.id
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Appends a tool call record.
    pub fn record_tool_call(&mut self, call: ToolCall) {
        self.tool_calls.push(call);
    }
}

/// Kind of produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    Code,
    Doc,
    Report,
}

/// A produced output reference, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    /// Opaque storage reference (URL, path, object key).
    pub storage_ref: String,
}

/// A recorded delegation from one role to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub id: String,
    pub from_role: Role,
    pub to_role: Role,
    pub reason: String,
    pub payload: Option<Value>,
}

impl Handoff {
    /// Creates a handoff; the source and target roles must differ.
    pub fn new(
        from_role: Role,
        to_role: Role,
        reason: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<Self> {
        if from_role == to_role {
            return Err(ProtolabError::internal(format!(
                "handoff source and target must differ (got {from_role})"
            )));
        }
        Ok(Self {
            id: generate_id("handoff"),
            from_role,
            to_role,
            reason: reason.into(),
            payload,
        })
    }
}

/// One audit event on a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub event: String,
    pub meta: Option<Value>,
}

/// An externally-provided capability registered with a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Unique within a session.
    pub name: String,
    pub scopes: Vec<String>,
    /// Append-only usage log.
    pub audit: Vec<AuditEntry>,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scopes,
            audit: Vec::new(),
        }
    }

    /// Appends an audit event with the current timestamp.
    pub fn record(&mut self, event: impl Into<String>, meta: Option<Value>) {
        self.audit.push(AuditEntry {
            at: Utc::now(),
            event: event.into(),
            meta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_transitions_are_forward_only() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Succeeded));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Succeeded.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Succeeded));
    }

    #[test]
    fn test_run_advance_rejects_backward_transition() {
        let mut run = Run::new(Role::Coder, Some("session-1".to_string()));
        run.advance(RunStatus::Running).unwrap();
        run.advance(RunStatus::Succeeded).unwrap();
        assert!(run.advance(RunStatus::Running).is_err());
    }

    #[test]
    fn test_handoff_rejects_same_role() {
        let err = Handoff::new(Role::Coder, Role::Coder, "loop", None);
        assert!(err.is_err());

        let ok = Handoff::new(Role::Orchestrator, Role::Coder, "implement MVP", None);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_tool_record_audit_is_append_only_growth() {
        let mut tool = ToolRecord::new("github_create_pr", vec!["repo:write".to_string()]);
        tool.record("registered", None);
        tool.record("executed", Some(serde_json::json!({"pr": 42})));
        assert_eq!(tool.audit.len(), 2);
        assert_eq!(tool.audit[0].event, "registered");
    }

    #[test]
    fn test_generate_id_is_prefixed_and_unique() {
        let a = generate_id("run");
        let b = generate_id("run");
        assert!(a.starts_with("run-"));
        assert_ne!(a, b);
    }
}
