//! Service facade for the HTTP layer.
//!
//! Thin surface the (out-of-scope) web API calls into: start a pipeline
//! run over a managed session, and query a session's summary. The facade
//! owns keeping the managed session's phase/status in sync with the
//! pipeline outcome.

use crate::orchestrator::{Pipeline, PipelineStatus};
use protolab_core::error::Result;
use protolab_core::session::{Phase, SessionManager, SessionStatus, SessionSummary};
use serde::Serialize;
use std::sync::Arc;

/// Receipt returned when a pipeline run is started.
#[derive(Debug, Clone, Serialize)]
pub struct RunReceipt {
    pub session_id: String,
    pub status: PipelineStatus,
    pub phase: String,
    pub next_steps: Vec<String>,
}

/// Pipeline entry points exposed to the request/response layer.
pub struct PipelineService {
    sessions: Arc<SessionManager>,
    pipeline: Pipeline,
}

impl PipelineService {
    pub fn new(sessions: Arc<SessionManager>, pipeline: Pipeline) -> Self {
        Self { sessions, pipeline }
    }

    /// Creates a managed session and runs the delegated pipeline over it.
    ///
    /// The session's phase/status reflect the outcome: completed runs
    /// close the session at phase `complete`, failed runs mark it failed,
    /// blocked runs leave it active for a retry after the block is
    /// resolved.
    pub async fn create_pipeline_run(
        &self,
        user_id: &str,
        project_name: &str,
    ) -> Result<RunReceipt> {
        let managed = self
            .sessions
            .create_session(project_name, user_id, self.pipeline.model())
            .await;

        let report = self.pipeline.run_delegated(user_id, project_name).await?;

        match report.status {
            PipelineStatus::Completed => {
                self.sessions
                    .update_session(&managed.id, Some(Phase::Complete), None)
                    .await?;
                self.sessions.close_session(&managed.id).await?;
            }
            PipelineStatus::Failed => {
                self.sessions
                    .update_session(&managed.id, None, Some(SessionStatus::Failed))
                    .await?;
            }
            PipelineStatus::Blocked => {}
        }

        self.sessions
            .add_transcript_entry(
                &managed.id,
                "System",
                &format!(
                    "Pipeline finished with status: {} (gate phase: {})",
                    report.status, report.phase
                ),
            )
            .await?;

        Ok(RunReceipt {
            session_id: managed.id,
            status: report.status,
            phase: report.phase,
            next_steps: report.next_steps,
        })
    }

    /// Read-only session summary for status polling.
    pub async fn get_session_status(&self, session_id: &str) -> Option<SessionSummary> {
        self.sessions.session_summary(session_id).await
    }
}
