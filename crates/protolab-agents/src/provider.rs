//! Tool-execution collaborator contract.
//!
//! The pipeline never talks to a concrete tool-execution service; it
//! consumes this trait. An implementation lists the tools of a toolkit,
//! runs tool calls, and drives the user-consent flow for tools that need
//! authorization.

use async_trait::async_trait;
use protolab_core::error::{ProtolabError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One externally-provided tool, as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Provider-unique tool name, e.g. `github_create_pull_request`.
    pub name: String,
    /// Toolkit the tool belongs to, e.g. `github`.
    pub toolkit: String,
    pub description: String,
    /// Scopes granted to this tool.
    pub scopes: Vec<String>,
}

/// State of a consent flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Pending,
    Completed,
    Failed,
}

/// Result of requesting authorization for a tool + user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationTicket {
    pub status: AuthorizationStatus,
    /// Ticket id to poll with `wait_for_authorization`.
    pub id: Option<String>,
    /// URL the user must visit to grant consent.
    pub url: Option<String>,
}

/// External tool-execution/authorization service.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Lists up to `limit` tools of a toolkit.
    async fn list_tools(&self, toolkit: &str, limit: usize) -> Result<Vec<ToolDescriptor>>;

    /// Requests authorization for a tool on behalf of a user.
    async fn authorize(&self, tool_name: &str, user_id: &str) -> Result<AuthorizationTicket>;

    /// Waits for a consent flow to finish.
    async fn wait_for_authorization(&self, id: &str) -> Result<AuthorizationStatus>;

    /// Executes a tool call.
    ///
    /// May fail with [`ProtolabError::AuthorizationPending`]; the caller is
    /// expected to resolve consent via `authorize`/`wait_for_authorization`
    /// and retry.
    async fn execute(&self, descriptor: &ToolDescriptor, args: Value, user_id: &str)
    -> Result<Value>;
}

/// Consent probe result for one tool + user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthProbe {
    pub needs_auth: bool,
    pub id: Option<String>,
    pub auth_url: Option<String>,
}

/// Checks whether a tool still needs user consent.
pub async fn requires_auth(
    provider: &dyn ToolProvider,
    tool_name: &str,
    user_id: &str,
) -> Result<AuthProbe> {
    let ticket = provider.authorize(tool_name, user_id).await?;
    Ok(AuthProbe {
        needs_auth: ticket.status == AuthorizationStatus::Pending,
        id: ticket.id,
        auth_url: ticket.url,
    })
}

/// Blocks until the consent flow with ticket `id` completes.
pub async fn ensure_authorized(provider: &dyn ToolProvider, id: &str) -> Result<()> {
    match provider.wait_for_authorization(id).await? {
        AuthorizationStatus::Completed => Ok(()),
        status => Err(ProtolabError::AuthorizationFailed(format!(
            "authorization ticket '{id}' resolved to {status:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider {
        ticket: AuthorizationTicket,
        wait_result: AuthorizationStatus,
    }

    #[async_trait]
    impl ToolProvider for StaticProvider {
        async fn list_tools(&self, _toolkit: &str, _limit: usize) -> Result<Vec<ToolDescriptor>> {
            Ok(Vec::new())
        }

        async fn authorize(&self, _tool_name: &str, _user_id: &str) -> Result<AuthorizationTicket> {
            Ok(self.ticket.clone())
        }

        async fn wait_for_authorization(&self, _id: &str) -> Result<AuthorizationStatus> {
            Ok(self.wait_result)
        }

        async fn execute(
            &self,
            _descriptor: &ToolDescriptor,
            _args: Value,
            _user_id: &str,
        ) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_requires_auth_maps_pending_ticket() {
        let provider = StaticProvider {
            ticket: AuthorizationTicket {
                status: AuthorizationStatus::Pending,
                id: Some("ticket-1".to_string()),
                url: Some("https://auth.example/consent".to_string()),
            },
            wait_result: AuthorizationStatus::Completed,
        };

        let probe = requires_auth(&provider, "slack_send_message", "user-1")
            .await
            .unwrap();
        assert!(probe.needs_auth);
        assert_eq!(probe.id.as_deref(), Some("ticket-1"));
    }

    #[tokio::test]
    async fn test_ensure_authorized_fails_on_non_completed() {
        let provider = StaticProvider {
            ticket: AuthorizationTicket {
                status: AuthorizationStatus::Pending,
                id: None,
                url: None,
            },
            wait_result: AuthorizationStatus::Failed,
        };

        let err = ensure_authorized(&provider, "ticket-1").await.unwrap_err();
        assert!(matches!(err, ProtolabError::AuthorizationFailed(_)));
    }
}
