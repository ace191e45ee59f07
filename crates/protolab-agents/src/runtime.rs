//! Agent-runtime collaborator contract.
//!
//! The reasoning engine behind each agent is a black box: given a name,
//! instructions, a model, and a set of callable tools, it constructs an
//! agent and later produces a final text output per invocation. The
//! pipeline only depends on this trait.

use crate::approval::BoundTool;
use async_trait::async_trait;
use protolab_core::error::Result;
use serde::{Deserialize, Serialize};

/// Opaque reference to an agent held by the external runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeAgent {
    /// Runtime-assigned identifier.
    pub id: String,
    pub name: String,
    pub model: String,
}

/// Final output of one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub final_output: String,
}

/// External language-model-backed agent runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Constructs an agent carrying the given toolset and instructions.
    async fn build_agent(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
        tools: Vec<BoundTool>,
    ) -> Result<RuntimeAgent>;

    /// Runs the agent on an input until it produces a final output.
    async fn invoke(&self, agent: &RuntimeAgent, input: &str) -> Result<AgentReply>;
}
