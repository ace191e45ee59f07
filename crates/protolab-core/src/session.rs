//! Managed project sessions.
//!
//! A [`ProjectSession`] bundles one project, its orchestration session, the
//! cost ledger, and produced artifacts under a single id. The
//! [`SessionManager`] is the facade the orchestrator and demo paths mutate
//! sessions through: transcripts and artifact lists only grow, cost
//! counters only increase, and `close_session` is the only way a session
//! reaches `completed`.

use crate::error::{ProtolabError, Result};
use crate::model::{Artifact, ArtifactKind, Project, Session, generate_id};
use chrono::{DateTime, Utc};
use protolab_guardrails::cost::CostTracker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};
use tokio::sync::RwLock;

/// Token budget allocated to a new session.
pub const DEFAULT_BUDGET_TOKENS: u64 = 100_000;

/// Pipeline phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Intake,
    Research,
    Architecture,
    Build,
    Qa,
    Deploy,
    Marketing,
    Complete,
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Failed,
}

/// Caller-supplied context attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub user_id: String,
    pub model: String,
}

/// One managed orchestration attempt: project, session, costs, artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSession {
    pub id: String,
    pub project: Project,
    pub session: Session,
    pub cost_tracker: CostTracker,
    pub artifacts: Vec<Artifact>,
    pub current_phase: Phase,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: SessionMetadata,
}

/// Read-only aggregates derived from a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub project_name: String,
    pub current_phase: Phase,
    pub status: SessionStatus,
    /// Estimated cost in USD.
    pub cost: f64,
    pub artifact_count: usize,
    pub transcript_length: usize,
    pub duration_secs: i64,
}

/// Creates, mutates, and summarizes project sessions.
///
/// All mutation for one session should be funneled through one logical
/// owner; the manager itself only guarantees that individual operations are
/// atomic.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, ProjectSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a project + session + cost tracker triple.
    ///
    /// The new session starts in phase `intake` with status `active`, a
    /// 100k token budget, and staging/production environments.
    pub async fn create_session(
        &self,
        project_name: impl Into<String>,
        user_id: impl Into<String>,
        model: impl Into<String>,
    ) -> ProjectSession {
        let project_id = generate_id("project");
        let session_id = generate_id("session");
        let model = model.into();
        let now = Utc::now();

        let project_session = ProjectSession {
            id: session_id.clone(),
            project: Project {
                id: project_id.clone(),
                name: project_name.into(),
                repo_url: None,
                environments: vec!["staging".to_string(), "production".to_string()],
            },
            session: Session {
                id: session_id.clone(),
                project_id,
                transcript: Vec::new(),
                budget_tokens: Some(DEFAULT_BUDGET_TOKENS),
            },
            cost_tracker: CostTracker::new(session_id.clone(), model.clone()),
            artifacts: Vec::new(),
            current_phase: Phase::Intake,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            metadata: SessionMetadata {
                user_id: user_id.into(),
                model,
            },
        };

        tracing::info!(session_id = %session_id, project = %project_session.project.name, "created session");
        self.sessions
            .write()
            .await
            .insert(session_id, project_session.clone());
        project_session
    }

    pub async fn get_session(&self, session_id: &str) -> Option<ProjectSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Updates phase and/or status; other fields are untouched.
    pub async fn update_session(
        &self,
        session_id: &str,
        phase: Option<Phase>,
        status: Option<SessionStatus>,
    ) -> Result<ProjectSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProtolabError::not_found("session", session_id))?;

        if let Some(phase) = phase {
            session.current_phase = phase;
        }
        if let Some(status) = status {
            session.status = status;
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    /// Appends an `agent: message` entry to the transcript.
    pub async fn add_transcript_entry(
        &self,
        session_id: &str,
        agent: &str,
        message: &str,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProtolabError::not_found("session", session_id))?;

        session.session.transcript.push(format!("{agent}: {message}"));
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Records a produced artifact with a generated id.
    pub async fn add_artifact(
        &self,
        session_id: &str,
        kind: ArtifactKind,
        storage_ref: impl Into<String>,
    ) -> Result<Artifact> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProtolabError::not_found("session", session_id))?;

        let artifact = Artifact {
            id: generate_id("artifact"),
            kind,
            storage_ref: storage_ref.into(),
        };
        session.artifacts.push(artifact.clone());
        session.updated_at = Utc::now();
        Ok(artifact)
    }

    /// Adds usage to the session's cost ledger; counters only increase.
    pub async fn update_costs(
        &self,
        session_id: &str,
        input_tokens: u64,
        output_tokens: u64,
        tool_calls: u64,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProtolabError::not_found("session", session_id))?;

        session
            .cost_tracker
            .record(input_tokens, output_tokens, tool_calls);
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Sessions currently in `active` status.
    pub async fn active_sessions(&self) -> Vec<ProjectSession> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .cloned()
            .collect()
    }

    /// Sessions owned by a user.
    pub async fn sessions_by_user(&self, user_id: &str) -> Vec<ProjectSession> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.metadata.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Marks a session completed. Closed sessions remain queryable; there
    /// is no deletion.
    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProtolabError::not_found("session", session_id))?;

        session.status = SessionStatus::Completed;
        session.updated_at = Utc::now();
        tracing::info!(session_id, "closed session");
        Ok(())
    }

    /// Derives read-only aggregates for a session.
    pub async fn session_summary(&self, session_id: &str) -> Option<SessionSummary> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(session_id)?;

        Some(SessionSummary {
            id: session.id.clone(),
            project_name: session.project.name.clone(),
            current_phase: session.current_phase,
            status: session.status,
            cost: session.cost_tracker.estimated_cost,
            artifact_count: session.artifacts.len(),
            transcript_length: session.session.transcript.len(),
            duration_secs: (session.updated_at - session.created_at).num_seconds(),
        })
    }
}
