//! Role and tool-authorization policy model.
//!
//! The policy table is configuration, not behavior: it fixes which toolkits
//! each role may use and which action kinds need a recorded human approval
//! before execution. It is the single source of truth the approval-gated
//! executor consults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString};

/// A specialized agent role in the build pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Orchestrator,
    Researcher,
    Architect,
    Coder,
    Qa,
    Publisher,
    Marketer,
}

/// Action kinds that may require human approval regardless of toolkit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatedAction {
    Delete,
    Rollback,
    Revoke,
    ExternalPost,
}

/// Per-role authorization rule: allowed toolkits plus gated action kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Toolkits the role may use; an empty set is permitted.
    pub toolkits: Vec<String>,
    /// Action kinds that need a recorded approval before execution.
    pub approval_required: Vec<GatedAction>,
}

impl ToolPolicy {
    fn new(toolkits: &[&str], approval_required: &[GatedAction]) -> Self {
        Self {
            toolkits: toolkits.iter().map(|s| s.to_string()).collect(),
            approval_required: approval_required.to_vec(),
        }
    }
}

/// The process-wide role-to-policy table, fixed at configuration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicies {
    pub roles: HashMap<Role, ToolPolicy>,
}

impl ToolPolicies {
    /// Looks up the policy for a role.
    pub fn policy_for(&self, role: Role) -> Option<&ToolPolicy> {
        self.roles.get(&role)
    }
}

impl Default for ToolPolicies {
    fn default() -> Self {
        use GatedAction::*;
        let roles = HashMap::from([
            (
                Role::Orchestrator,
                ToolPolicy::new(&[], &[Delete, Rollback, Revoke, ExternalPost]),
            ),
            (Role::Researcher, ToolPolicy::new(&["google"], &[])),
            (Role::Architect, ToolPolicy::new(&[], &[])),
            (Role::Coder, ToolPolicy::new(&["github"], &[Delete, Revoke])),
            (Role::Qa, ToolPolicy::new(&["github"], &[])),
            (
                Role::Publisher,
                ToolPolicy::new(&["vercel", "render", "fly"], &[Rollback, Delete]),
            ),
            (
                Role::Marketer,
                ToolPolicy::new(&["google", "slack"], &[ExternalPost]),
            ),
        ]);
        Self { roles }
    }
}

/// Classifies a tool name against a gated action kind.
///
/// Kept behind a trait so the substring heuristics can be swapped for
/// structured status fields without touching the gate logic that consumes
/// the classification.
pub trait ActionClassifier: Send + Sync {
    fn matches(&self, tool_name: &str, action: GatedAction) -> bool;
}

/// Default classifier: case-insensitive substring heuristics on the tool
/// name (`delete`/`remove`, `rollback`/`revert`, `revoke`/`disconnect`,
/// `post`/`publish`/`send`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeuristicClassifier;

impl ActionClassifier for NameHeuristicClassifier {
    fn matches(&self, tool_name: &str, action: GatedAction) -> bool {
        let name = tool_name.to_lowercase();
        match action {
            GatedAction::Delete => name.contains("delete") || name.contains("remove"),
            GatedAction::Rollback => name.contains("rollback") || name.contains("revert"),
            GatedAction::Revoke => name.contains("revoke") || name.contains("disconnect"),
            GatedAction::ExternalPost => {
                name.contains("post") || name.contains("publish") || name.contains("send")
            }
        }
    }
}
