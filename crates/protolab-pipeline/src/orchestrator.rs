//! The phase state machine.
//!
//! Two orchestration strategies over the same crew of role agents:
//!
//! - **Delegated**: one orchestrator agent is invoked with the full project
//!   brief and trusted to sequence hand-offs internally; the pipeline
//!   records a single run and classifies the outcome.
//! - **Sequential**: the pipeline invokes researcher → architect → coder →
//!   qa → publisher → marketer itself and enforces the QA, Deploy, and
//!   Safety gates between phases.
//!
//! Gate failures are data, not errors: every terminal outcome carries a
//! phase/gate label, a status, and either outputs or a details payload.
//! Retry and circuit breaking are composed around these entry points by
//! the caller, never hard-coded here.

use crate::gates::{KeywordClassifier, OutputClassifier};
use protolab_agents::factory::{AgentFactory, AgentHandle};
use protolab_agents::provider::ToolProvider;
use protolab_agents::runtime::AgentRuntime;
use protolab_core::error::Result;
use protolab_core::model::{Handoff, Project, Run, RunStatus, Session, generate_id};
use protolab_core::policy::Role;
use protolab_core::session::DEFAULT_BUDGET_TOKENS;
use protolab_core::store::InMemoryStore;
use protolab_guardrails::scan::scan_text;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use strum::Display;

/// Terminal status of a delegated pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStatus {
    Completed,
    Blocked,
    Failed,
}

/// Outcome of a delegated pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub status: PipelineStatus,
    /// Phase or gate label the run ended in.
    pub phase: String,
    pub outputs: HashMap<String, Value>,
    pub next_steps: Vec<String>,
    pub session_id: String,
}

/// Status of a sequential gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateStatus {
    Ok,
    Blocked,
}

/// Outcome of a sequential pipeline run: either every gate passed and the
/// per-phase outputs are present, or a named gate blocked with details.
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub gate: String,
    pub status: GateStatus,
    pub details: Option<Value>,
    pub outputs: Option<HashMap<String, String>>,
}

impl GateOutcome {
    fn blocked(gate: &str, details: Value) -> Self {
        Self {
            gate: gate.to_string(),
            status: GateStatus::Blocked,
            details: Some(details),
            outputs: None,
        }
    }

    fn ok(outputs: HashMap<String, String>) -> Self {
        Self {
            gate: "Summary".to_string(),
            status: GateStatus::Ok,
            details: None,
            outputs: Some(outputs),
        }
    }
}

/// Drives the crew through the pipeline phases.
pub struct Pipeline {
    runtime: Arc<dyn AgentRuntime>,
    factory: AgentFactory,
    store: Arc<InMemoryStore>,
    classifier: Arc<dyn OutputClassifier>,
    model: String,
}

impl Pipeline {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        provider: Arc<dyn ToolProvider>,
        store: Arc<InMemoryStore>,
        model: impl Into<String>,
    ) -> Self {
        let factory = AgentFactory::new(runtime.clone(), provider).with_store(store.clone());
        Self {
            runtime,
            factory,
            store,
            classifier: Arc::new(KeywordClassifier),
            model: model.into(),
        }
    }

    /// Swaps the gate classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn OutputClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs the delegated strategy: one orchestrator invocation over the
    /// full project brief.
    ///
    /// Collaborator construction errors propagate as `Err`; everything
    /// after that point is folded into the report, including invocation
    /// failures.
    pub async fn run_delegated(&self, user_id: &str, project_name: &str) -> Result<PipelineReport> {
        let crew = self.factory.build_crew(&self.model, user_id).await?;

        let project_id = generate_id("project");
        let session_id = generate_id("session");
        let project = Project {
            id: project_id.clone(),
            name: project_name.to_string(),
            repo_url: None,
            environments: vec!["staging".to_string(), "production".to_string()],
        };
        let mut session = Session {
            id: session_id.clone(),
            project_id,
            transcript: Vec::new(),
            budget_tokens: Some(DEFAULT_BUDGET_TOKENS),
        };
        self.store.upsert_project(project.clone()).await;
        self.store.upsert_session(session.clone()).await;

        tracing::info!(session_id = %session_id, project = project_name, "starting delegated pipeline");
        let mut run = Run::new(Role::Orchestrator, Some(session_id.clone()));
        run.advance(RunStatus::Running)?;
        self.store.upsert_run(run.clone()).await;

        let reply = self
            .runtime
            .invoke(&crew.orchestrator.agent, &project_brief(project_name))
            .await;

        match reply {
            Ok(reply) => {
                let output = reply.final_output;
                run.advance(RunStatus::Succeeded)?;
                self.store.upsert_run(run).await;

                session.transcript.push(format!("Orchestrator: {output}"));
                self.store.upsert_session(session.clone()).await;

                if self.classifier.signals_blocked(&output) {
                    return Ok(PipelineReport {
                        status: PipelineStatus::Blocked,
                        phase: "orchestration".to_string(),
                        outputs: HashMap::from([("orchestrator".to_string(), json!(output))]),
                        next_steps: vec![
                            "Resolve blocking issues".to_string(),
                            "Retry orchestration".to_string(),
                        ],
                        session_id,
                    });
                }

                let scan = scan_text(&output);
                if !scan.ok {
                    tracing::warn!(session_id = %session_id, findings = scan.findings.len(), "sensitive data found in orchestrator output");
                    return Ok(PipelineReport {
                        status: PipelineStatus::Blocked,
                        phase: "safety".to_string(),
                        outputs: HashMap::from([
                            ("orchestrator".to_string(), json!(output)),
                            ("scan".to_string(), serde_json::to_value(&scan)?),
                        ]),
                        next_steps: vec![
                            "Remove PII from outputs".to_string(),
                            "Retry orchestration".to_string(),
                        ],
                        session_id,
                    });
                }

                Ok(PipelineReport {
                    status: PipelineStatus::Completed,
                    phase: "orchestration".to_string(),
                    outputs: HashMap::from([
                        ("orchestrator".to_string(), json!(output)),
                        ("project".to_string(), serde_json::to_value(&project)?),
                        ("session".to_string(), serde_json::to_value(&session)?),
                    ]),
                    next_steps: vec![
                        "Monitor agent handoffs".to_string(),
                        "Review phase progress".to_string(),
                        "Address any approval requests".to_string(),
                    ],
                    session_id,
                })
            }
            Err(error) => {
                tracing::error!(session_id = %session_id, %error, "orchestrator invocation failed");
                run.advance(RunStatus::Failed)?;
                self.store.upsert_run(run).await;

                Ok(PipelineReport {
                    status: PipelineStatus::Failed,
                    phase: "orchestration".to_string(),
                    outputs: HashMap::from([("error".to_string(), json!(error.to_string()))]),
                    next_steps: vec![
                        "Review error logs".to_string(),
                        "Check agent configuration".to_string(),
                        "Retry pipeline".to_string(),
                    ],
                    session_id,
                })
            }
        }
    }

    /// Runs the sequential strategy with explicit gates.
    ///
    /// Halts at the first failing gate; later phases are never invoked.
    /// Invocation errors (after retries at the call site) propagate as
    /// `Err` with the phase's run recorded as failed.
    pub async fn run_sequential(&self, user_id: &str) -> Result<GateOutcome> {
        let crew = self.factory.build_crew(&self.model, user_id).await?;
        let trace_id = generate_id("trace");

        let research = self
            .invoke_phase(
                &crew.researcher,
                "Perform competitor scan for similar runner habit trackers.",
                &trace_id,
            )
            .await?;

        let architecture = self
            .invoke_phase(
                &crew.architect,
                "Propose stack and data model for Next.js + FastAPI mono-repo with CI.",
                &trace_id,
            )
            .await?;

        let build = self
            .invoke_phase(
                &crew.coder,
                "Create repo 'runner-habits' with Next.js (App Router TS) + FastAPI skeleton, open PR, add CI.",
                &trace_id,
            )
            .await?;

        let qa = self
            .invoke_phase(&crew.qa, "Trigger E2E/CI and summarize results.", &trace_id)
            .await?;
        if !self.classifier.qa_passed(&qa) {
            tracing::warn!(trace_id = %trace_id, "QA gate blocked, halting before deploy");
            return Ok(GateOutcome::blocked("QA", json!(qa)));
        }

        let deploy = self
            .invoke_phase(
                &crew.publisher,
                "Deploy to staging, set env vars, run health checks; rollback if failing.",
                &trace_id,
            )
            .await?;
        if self.classifier.rollback_flagged(&deploy) {
            tracing::warn!(trace_id = %trace_id, "Deploy gate blocked, halting before marketing");
            return Ok(GateOutcome::blocked("Deploy", json!(deploy)));
        }

        let marketing = self
            .invoke_phase(
                &crew.marketer,
                "Draft a launch blurb and email; ensure no PII leaks.",
                &trace_id,
            )
            .await?;
        let scan = scan_text(&marketing);
        if !scan.ok {
            tracing::warn!(trace_id = %trace_id, findings = scan.findings.len(), "Safety gate blocked on marketing output");
            return Ok(GateOutcome::blocked("Safety", serde_json::to_value(&scan)?));
        }

        Ok(GateOutcome::ok(HashMap::from([
            ("research".to_string(), research),
            ("architecture".to_string(), architecture),
            ("build".to_string(), build),
            ("qa".to_string(), qa),
            ("deploy".to_string(), deploy),
            ("marketing".to_string(), marketing),
        ])))
    }

    /// Invokes one phase agent, recording the hand-off and the run.
    async fn invoke_phase(
        &self,
        handle: &AgentHandle,
        input: &str,
        trace_id: &str,
    ) -> Result<String> {
        if let Ok(handoff) = Handoff::new(Role::Orchestrator, handle.role, input, None) {
            self.store.upsert_handoff(handoff).await;
        }

        let mut run = Run::new(handle.role, Some(trace_id.to_string()));
        run.advance(RunStatus::Running)?;
        self.store.upsert_run(run.clone()).await;

        tracing::info!(role = %handle.role, trace_id, "invoking phase agent");
        match self.runtime.invoke(&handle.agent, input).await {
            Ok(reply) => {
                run.advance(RunStatus::Succeeded)?;
                self.store.upsert_run(run).await;
                Ok(reply.final_output)
            }
            Err(error) => {
                tracing::error!(role = %handle.role, %error, "phase invocation failed");
                run.advance(RunStatus::Failed)?;
                self.store.upsert_run(run).await;
                Err(error)
            }
        }
    }
}

/// The full project brief handed to the orchestrator agent.
fn project_brief(project_name: &str) -> String {
    format!(
        r#"Coordinate the complete MVP build for project "{project_name}".

Project Requirements:
- Build a runner habit tracking app
- Next.js frontend with TypeScript
- FastAPI backend with PostgreSQL
- CI/CD pipeline with testing
- Deploy to staging and production

Coordinate all phases using handoffs to specialized agents:
1. Research market and competitors
2. Design system architecture
3. Implement and scaffold repository
4. Run QA and testing
5. Deploy to environments
6. Create marketing content

Ensure proper gates: QA must pass before deployment, deployment must succeed before marketing.
Monitor progress and provide status updates."#
    )
}
