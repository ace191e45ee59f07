//! Error types for the Protolab pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole pipeline.
///
/// Variants map onto the runtime's error taxonomy: configuration problems
/// abort before any phase runs, approval/authorization variants are
/// suspend-and-resume signals around a single tool call, and transient
/// infrastructure failures are candidates for retry. Everything else is
/// `Internal` and surfaces immediately.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ProtolabError {
    /// Missing credentials or role mapping; fatal before any phase runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity lookup miss with type information.
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// A gated destructive action was attempted without recorded approval.
    ///
    /// Blocks that specific tool call, not the whole pipeline.
    #[error("Approval required for action '{action}' on tool '{tool}'. Request approval before retrying.")]
    ApprovalRequired { action: String, tool: String },

    /// A tool requires user consent; surface the URL and resume later.
    #[error("Authorization pending for tool '{tool}'")]
    AuthorizationPending {
        tool: String,
        auth_url: Option<String>,
    },

    /// The consent flow finished in a non-completed state.
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// A circuit breaker refused the call.
    #[error("circuit breaker is open")]
    BreakerOpen,

    /// The agent runtime failed to produce a result.
    #[error("Agent invocation failed: {0}")]
    Invocation(String),

    /// The tool provider failed to execute a call.
    #[error("Tool execution failed for '{tool}': {message}")]
    ToolExecution { tool: String, message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProtolabError {
    /// Creates a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a NotFound error.
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates an ApprovalRequired error.
    pub fn approval_required(action: impl Into<String>, tool: impl Into<String>) -> Self {
        Self::ApprovalRequired {
            action: action.into(),
            tool: tool.into(),
        }
    }

    /// Creates an AuthorizationPending error.
    pub fn authorization_pending(tool: impl Into<String>, auth_url: Option<String>) -> Self {
        Self::AuthorizationPending {
            tool: tool.into(),
            auth_url,
        }
    }

    /// Creates an Invocation error.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation(message.into())
    }

    /// Creates a ToolExecution error.
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a Config error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this error blocks a single tool call pending human approval.
    pub fn is_approval_required(&self) -> bool {
        matches!(self, Self::ApprovalRequired { .. })
    }

    /// Check if this error signals an outstanding consent flow.
    pub fn is_authorization_pending(&self) -> bool {
        matches!(self, Self::AuthorizationPending { .. })
    }
}

impl From<serde_json::Error> for ProtolabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<String> for ProtolabError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, ProtolabError>`.
pub type Result<T> = std::result::Result<T, ProtolabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_required_message_names_action_and_tool() {
        let err = ProtolabError::approval_required("delete", "delete_repository");
        let message = err.to_string();
        assert!(message.contains("'delete'"));
        assert!(message.contains("'delete_repository'"));
        assert!(err.is_approval_required());
    }

    #[test]
    fn test_predicates() {
        assert!(ProtolabError::config("missing key").is_config());
        assert!(
            ProtolabError::authorization_pending("github_create_pr", None)
                .is_authorization_pending()
        );
        assert!(!ProtolabError::internal("boom").is_approval_required());
    }
}
