//! In-memory registries for pipeline records.
//!
//! The store is the single writer surface for shared records: all mutation
//! goes through `upsert_*`, which replaces whole records by key
//! (last-writer-wins). There is no cross-registry transactionality; callers
//! keep related records consistent, e.g. by writing a session before the
//! runs that reference it.

use crate::model::{Artifact, Handoff, Project, Run, Session, ToolRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-wide in-memory registries, keyed by id (tools by name).
///
/// Construct one per process and share it as `Arc<InMemoryStore>`; nothing
/// in this crate holds a global instance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    sessions: RwLock<HashMap<String, Session>>,
    runs: RwLock<HashMap<String, Run>>,
    artifacts: RwLock<HashMap<String, Artifact>>,
    handoffs: RwLock<HashMap<String, Handoff>>,
    tools: RwLock<HashMap<String, ToolRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_project(&self, project: Project) {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project);
    }

    pub async fn get_project(&self, id: &str) -> Option<Project> {
        self.projects.read().await.get(id).cloned()
    }

    pub async fn upsert_session(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    pub async fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn upsert_run(&self, run: Run) {
        self.runs.write().await.insert(run.id.clone(), run);
    }

    pub async fn get_run(&self, id: &str) -> Option<Run> {
        self.runs.read().await.get(id).cloned()
    }

    /// Snapshot of all recorded runs, in no particular order.
    pub async fn list_runs(&self) -> Vec<Run> {
        self.runs.read().await.values().cloned().collect()
    }

    pub async fn upsert_artifact(&self, artifact: Artifact) {
        self.artifacts
            .write()
            .await
            .insert(artifact.id.clone(), artifact);
    }

    pub async fn get_artifact(&self, id: &str) -> Option<Artifact> {
        self.artifacts.read().await.get(id).cloned()
    }

    pub async fn upsert_handoff(&self, handoff: Handoff) {
        self.handoffs
            .write()
            .await
            .insert(handoff.id.clone(), handoff);
    }

    pub async fn get_handoff(&self, id: &str) -> Option<Handoff> {
        self.handoffs.read().await.get(id).cloned()
    }

    /// Snapshot of all recorded hand-offs, in no particular order.
    pub async fn list_handoffs(&self) -> Vec<Handoff> {
        self.handoffs.read().await.values().cloned().collect()
    }

    pub async fn upsert_tool(&self, tool: ToolRecord) {
        self.tools.write().await.insert(tool.name.clone(), tool);
    }

    pub async fn get_tool(&self, name: &str) -> Option<ToolRecord> {
        self.tools.read().await.get(name).cloned()
    }
}
