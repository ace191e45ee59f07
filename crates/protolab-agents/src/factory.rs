//! Role-bound agent construction.
//!
//! The factory resolves a role's toolkits from the policy table, discovers
//! tools through the external provider, binds each tool to the role's
//! approval gates, and asks the agent runtime to construct the agent. The
//! result is an explicit [`AgentHandle`] carrying the role and user
//! context rather than metadata stashed on the runtime object.

use crate::approval::{ApprovalChecker, BoundTool, DenyAll, GatedExecutor};
use crate::instructions::{display_name, instructions_for};
use crate::provider::ToolProvider;
use crate::runtime::{AgentRuntime, RuntimeAgent};
use protolab_core::error::Result;
use protolab_core::model::ToolRecord;
use protolab_core::policy::{ActionClassifier, NameHeuristicClassifier, Role, ToolPolicies};
use protolab_core::store::InMemoryStore;
use std::sync::Arc;

/// Upper bound on tools discovered per toolkit.
pub const TOOLKIT_LIST_LIMIT: usize = 50;

/// A toolkit whose discovery failed during agent construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedToolkit {
    pub toolkit: String,
    pub error: String,
}

/// A constructed role agent plus its binding context.
pub struct AgentHandle {
    pub role: Role,
    pub user_id: String,
    pub agent: RuntimeAgent,
    /// Tools bound to this role's approval gates.
    pub tools: Vec<BoundTool>,
    /// Toolkits whose listing failed; the toolset is degraded but usable.
    pub degraded_toolkits: Vec<DegradedToolkit>,
}

impl AgentHandle {
    /// True when at least one toolkit failed to contribute tools.
    pub fn is_degraded(&self) -> bool {
        !self.degraded_toolkits.is_empty()
    }
}

/// The seven role agents of one pipeline run.
pub struct Crew {
    pub orchestrator: AgentHandle,
    pub researcher: AgentHandle,
    pub architect: AgentHandle,
    pub coder: AgentHandle,
    pub qa: AgentHandle,
    pub publisher: AgentHandle,
    pub marketer: AgentHandle,
}

/// Builds role-bound agents over the external collaborators.
pub struct AgentFactory {
    runtime: Arc<dyn AgentRuntime>,
    provider: Arc<dyn ToolProvider>,
    policies: ToolPolicies,
    classifier: Arc<dyn ActionClassifier>,
    checker: Arc<dyn ApprovalChecker>,
    store: Option<Arc<InMemoryStore>>,
}

impl AgentFactory {
    /// Creates a factory with the reference policy table, the name
    /// heuristic classifier, and a deny-all approval checker.
    pub fn new(runtime: Arc<dyn AgentRuntime>, provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            runtime,
            provider,
            policies: ToolPolicies::default(),
            classifier: Arc::new(NameHeuristicClassifier),
            checker: Arc::new(DenyAll),
            store: None,
        }
    }

    /// Replaces the policy table.
    pub fn with_policies(mut self, policies: ToolPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Replaces the approval checker.
    pub fn with_checker(mut self, checker: Arc<dyn ApprovalChecker>) -> Self {
        self.checker = checker;
        self
    }

    /// Registers discovered tools and audits uses in the given store.
    pub fn with_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds one role-bound agent.
    ///
    /// Toolkit discovery failures are isolated per toolkit: a failing
    /// listing is recorded on the handle and the remaining toolkits still
    /// contribute tools. Whether a degraded toolset is acceptable is the
    /// caller's decision.
    pub async fn create_agent_with_role(
        &self,
        role: Role,
        name: &str,
        instructions: &str,
        model: &str,
        user_id: &str,
    ) -> Result<AgentHandle> {
        let executor = Arc::new(GatedExecutor::new(
            &self.policies,
            role,
            self.classifier.clone(),
            self.checker.clone(),
            self.provider.clone(),
            self.store.clone(),
        )?);

        let toolkits = self
            .policies
            .policy_for(role)
            .map(|p| p.toolkits.clone())
            .unwrap_or_default();

        let mut tools = Vec::new();
        let mut degraded_toolkits = Vec::new();
        for toolkit in &toolkits {
            match self.provider.list_tools(toolkit, TOOLKIT_LIST_LIMIT).await {
                Ok(descriptors) => {
                    for descriptor in descriptors {
                        if let Some(store) = &self.store {
                            if store.get_tool(&descriptor.name).await.is_none() {
                                let mut record =
                                    ToolRecord::new(&descriptor.name, descriptor.scopes.clone());
                                record.record("registered", None);
                                store.upsert_tool(record).await;
                            }
                        }
                        tools.push(BoundTool::new(descriptor, executor.clone(), user_id));
                    }
                }
                Err(e) => {
                    tracing::warn!(%role, %toolkit, error = %e, "toolkit listing failed, continuing with degraded toolset");
                    degraded_toolkits.push(DegradedToolkit {
                        toolkit: toolkit.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let agent = self
            .runtime
            .build_agent(name, instructions, model, tools.clone())
            .await?;

        tracing::info!(%role, name, tool_count = tools.len(), "built role agent");
        Ok(AgentHandle {
            role,
            user_id: user_id.to_string(),
            agent,
            tools,
            degraded_toolkits,
        })
    }

    /// Builds all seven role agents with the reference instructions.
    pub async fn build_crew(&self, model: &str, user_id: &str) -> Result<Crew> {
        Ok(Crew {
            orchestrator: self.build_role(Role::Orchestrator, model, user_id).await?,
            researcher: self.build_role(Role::Researcher, model, user_id).await?,
            architect: self.build_role(Role::Architect, model, user_id).await?,
            coder: self.build_role(Role::Coder, model, user_id).await?,
            qa: self.build_role(Role::Qa, model, user_id).await?,
            publisher: self.build_role(Role::Publisher, model, user_id).await?,
            marketer: self.build_role(Role::Marketer, model, user_id).await?,
        })
    }

    async fn build_role(&self, role: Role, model: &str, user_id: &str) -> Result<AgentHandle> {
        self.create_agent_with_role(
            role,
            display_name(role),
            instructions_for(role),
            model,
            user_id,
        )
        .await
    }
}
