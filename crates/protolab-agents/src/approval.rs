//! Approval-gated tool execution.
//!
//! A [`GatedExecutor`] decorates the raw tool-provider call with the
//! role's policy: tool names classified as a gated action kind fail with
//! an approval-required error unless an approval has been recorded for
//! that tool. Ungated calls are delegated to the provider unchanged.

use crate::provider::{ToolDescriptor, ToolProvider};
use async_trait::async_trait;
use protolab_core::error::{ProtolabError, Result};
use protolab_core::model::ToolRecord;
use protolab_core::policy::{ActionClassifier, GatedAction, Role, ToolPolicies};
use protolab_core::store::InMemoryStore;
use serde_json::Value;
use std::sync::Arc;

/// Host-supplied approval lookup for a specific tool.
#[async_trait]
pub trait ApprovalChecker: Send + Sync {
    async fn is_approved(&self, tool: &ToolDescriptor) -> bool;
}

/// Checker that never grants approval; every gated action blocks until a
/// real approval source is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ApprovalChecker for DenyAll {
    async fn is_approved(&self, _tool: &ToolDescriptor) -> bool {
        false
    }
}

/// Per-role execution wrapper, constructed once at agent-build time.
pub struct GatedExecutor {
    role: Role,
    gated: Vec<GatedAction>,
    classifier: Arc<dyn ActionClassifier>,
    checker: Arc<dyn ApprovalChecker>,
    provider: Arc<dyn ToolProvider>,
    /// When present, each use is appended to the tool's audit log.
    store: Option<Arc<InMemoryStore>>,
}

impl GatedExecutor {
    /// Builds the executor for a role from the policy table.
    ///
    /// Fails with a configuration error when the role has no policy entry.
    pub fn new(
        policies: &ToolPolicies,
        role: Role,
        classifier: Arc<dyn ActionClassifier>,
        checker: Arc<dyn ApprovalChecker>,
        provider: Arc<dyn ToolProvider>,
        store: Option<Arc<InMemoryStore>>,
    ) -> Result<Self> {
        let policy = policies
            .policy_for(role)
            .ok_or_else(|| ProtolabError::config(format!("no tool policy for role '{role}'")))?;
        Ok(Self {
            role,
            gated: policy.approval_required.clone(),
            classifier,
            checker,
            provider,
            store,
        })
    }

    /// Runs a tool call through the role's approval gates.
    pub async fn execute(
        &self,
        descriptor: &ToolDescriptor,
        args: Value,
        user_id: &str,
    ) -> Result<Value> {
        for &action in &self.gated {
            if self.classifier.matches(&descriptor.name, action)
                && !self.checker.is_approved(descriptor).await
            {
                tracing::warn!(
                    role = %self.role,
                    tool = %descriptor.name,
                    action = %action,
                    "blocked gated tool call pending approval"
                );
                self.audit(descriptor, format!("blocked: approval required for {action}"))
                    .await;
                return Err(ProtolabError::approval_required(
                    action.to_string(),
                    descriptor.name.clone(),
                ));
            }
        }

        tracing::debug!(role = %self.role, tool = %descriptor.name, "executing tool call");
        let result = self.provider.execute(descriptor, args, user_id).await;
        match &result {
            Ok(_) => self.audit(descriptor, "executed").await,
            Err(e) => self.audit(descriptor, format!("failed: {e}")).await,
        }
        result
    }

    async fn audit(&self, descriptor: &ToolDescriptor, event: impl Into<String>) {
        if let Some(store) = &self.store {
            let mut record = store
                .get_tool(&descriptor.name)
                .await
                .unwrap_or_else(|| ToolRecord::new(&descriptor.name, descriptor.scopes.clone()));
            record.record(event, None);
            store.upsert_tool(record).await;
        }
    }
}

/// A provider tool bound to a role's gated executor and a user.
///
/// This is the callable shape handed to the agent runtime: the runtime
/// supplies arguments at call time and every call flows through the
/// approval gates.
#[derive(Clone)]
pub struct BoundTool {
    pub descriptor: ToolDescriptor,
    executor: Arc<GatedExecutor>,
    user_id: String,
}

impl BoundTool {
    pub fn new(
        descriptor: ToolDescriptor,
        executor: Arc<GatedExecutor>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            descriptor,
            executor,
            user_id: user_id.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Invokes the tool with the given arguments.
    pub async fn call(&self, args: Value) -> Result<Value> {
        self.executor
            .execute(&self.descriptor, args, &self.user_id)
            .await
    }
}

impl std::fmt::Debug for BoundTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundTool")
            .field("descriptor", &self.descriptor)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
