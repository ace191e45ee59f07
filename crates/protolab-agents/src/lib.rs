//! Role-bound agents over external collaborators.
//!
//! This crate defines the two collaborator contracts the pipeline consumes
//! as black boxes — the agent runtime and the tool provider — plus the
//! approval-gated executor that wraps every tool call and the factory that
//! assembles role agents from all of the above.

pub mod approval;
pub mod factory;
pub mod instructions;
pub mod provider;
pub mod runtime;

pub use approval::{ApprovalChecker, BoundTool, DenyAll, GatedExecutor};
pub use factory::{AgentFactory, AgentHandle, Crew, DegradedToolkit, TOOLKIT_LIST_LIMIT};
pub use instructions::{display_name, instructions_for};
pub use provider::{
    AuthProbe, AuthorizationStatus, AuthorizationTicket, ToolDescriptor, ToolProvider,
    ensure_authorized, requires_auth,
};
pub use runtime::{AgentReply, AgentRuntime, RuntimeAgent};
