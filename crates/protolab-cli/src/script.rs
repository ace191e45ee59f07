//! Scripted collaborators for offline demo runs.
//!
//! These stand in for the external agent runtime and tool provider so the
//! demo subcommands can exercise the full pipeline without network access
//! or credentials. Replies are canned per role and shaped like the fenced
//! JSON the real role instructions ask for.

use async_trait::async_trait;
use protolab_agents::approval::BoundTool;
use protolab_agents::provider::{
    AuthorizationStatus, AuthorizationTicket, ToolDescriptor, ToolProvider,
};
use protolab_agents::runtime::{AgentReply, AgentRuntime, RuntimeAgent};
use protolab_core::error::Result;
use protolab_core::model::generate_id;
use serde_json::{Value, json};

/// Agent runtime that answers each role with a plausible canned reply.
#[derive(Debug, Default)]
pub struct ScriptedRuntime;

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn build_agent(
        &self,
        name: &str,
        _instructions: &str,
        model: &str,
        tools: Vec<BoundTool>,
    ) -> Result<RuntimeAgent> {
        tracing::debug!(name, tool_count = tools.len(), "scripted runtime built agent");
        Ok(RuntimeAgent {
            id: generate_id("agent"),
            name: name.to_string(),
            model: model.to_string(),
        })
    }

    async fn invoke(&self, agent: &RuntimeAgent, _input: &str) -> Result<AgentReply> {
        let final_output = match agent.name.as_str() {
            "Orchestrator" => {
                "Plan compiled: research, architecture, build, qa, deploy and marketing \
                 all completed via handoffs. Gates respected; no approvals outstanding."
                    .to_string()
            }
            "Researcher" => {
                "Competitor scan done: Strava habits, Runkeeper streaks. \
                 Opportunity: lightweight streak tracking without social pressure."
                    .to_string()
            }
            "Architect" => json!({
                "stack": {"frontend": "Next.js", "backend": "FastAPI", "database": "PostgreSQL"},
                "endpoints": [{"method": "POST", "path": "/habits", "purpose": "create habit"}]
            })
            .to_string(),
            "Coder" => {
                "Repo 'runner-habits' scaffolded, PR #1 opened, CI wired via GitHub Actions."
                    .to_string()
            }
            "QA" => "All 12 E2E tests passed; CI green.".to_string(),
            "Publisher" => json!({
                "deploy_env": "staging",
                "health_status": "healthy",
                "rollback_needed": false
            })
            .to_string(),
            "Marketer" => {
                "Launch blurb drafted: track your runs, keep your streak. Email queued for review."
                    .to_string()
            }
            _ => "done".to_string(),
        };
        Ok(AgentReply { final_output })
    }
}

/// Tool provider that fabricates a small toolset per toolkit.
#[derive(Debug, Default)]
pub struct ScriptedProvider;

#[async_trait]
impl ToolProvider for ScriptedProvider {
    async fn list_tools(&self, toolkit: &str, limit: usize) -> Result<Vec<ToolDescriptor>> {
        let names = match toolkit {
            "google" => vec!["google_search", "google_fetch_page"],
            "github" => vec!["github_create_repo", "github_open_pr", "github_delete_branch"],
            "vercel" => vec!["vercel_deploy", "vercel_rollback_deploy"],
            "render" => vec!["render_deploy"],
            "fly" => vec!["fly_deploy"],
            "slack" => vec!["slack_send_message"],
            _ => vec![],
        };
        Ok(names
            .into_iter()
            .take(limit)
            .map(|name| ToolDescriptor {
                name: name.to_string(),
                toolkit: toolkit.to_string(),
                description: format!("{toolkit} capability"),
                scopes: vec![format!("{toolkit}:default")],
            })
            .collect())
    }

    async fn authorize(&self, _tool_name: &str, _user_id: &str) -> Result<AuthorizationTicket> {
        Ok(AuthorizationTicket {
            status: AuthorizationStatus::Completed,
            id: None,
            url: None,
        })
    }

    async fn wait_for_authorization(&self, _id: &str) -> Result<AuthorizationStatus> {
        Ok(AuthorizationStatus::Completed)
    }

    async fn execute(
        &self,
        descriptor: &ToolDescriptor,
        args: Value,
        _user_id: &str,
    ) -> Result<Value> {
        Ok(json!({ "tool": descriptor.name, "args": args, "result": "ok" }))
    }
}
