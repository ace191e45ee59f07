//! End-to-end pipeline behavior over scripted collaborators.

use async_trait::async_trait;
use protolab_agents::approval::BoundTool;
use protolab_agents::provider::{
    AuthorizationStatus, AuthorizationTicket, ToolDescriptor, ToolProvider,
};
use protolab_agents::runtime::{AgentReply, AgentRuntime, RuntimeAgent};
use protolab_core::error::{ProtolabError, Result};
use protolab_core::model::RunStatus;
use protolab_core::policy::Role;
use protolab_core::session::SessionManager;
use protolab_core::store::InMemoryStore;
use protolab_pipeline::orchestrator::{GateStatus, Pipeline, PipelineStatus};
use protolab_pipeline::service::PipelineService;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Runtime that answers each agent (by display name) with a canned reply.
struct ScriptedRuntime {
    replies: HashMap<String, Result<String>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedRuntime {
    fn new(replies: &[(&str, Result<String>)]) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .iter()
                .map(|(name, reply)| (name.to_string(), reply.clone()))
                .collect(),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn invoked(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn build_agent(
        &self,
        name: &str,
        _instructions: &str,
        model: &str,
        _tools: Vec<BoundTool>,
    ) -> Result<RuntimeAgent> {
        Ok(RuntimeAgent {
            id: format!("agent-{name}"),
            name: name.to_string(),
            model: model.to_string(),
        })
    }

    async fn invoke(&self, agent: &RuntimeAgent, _input: &str) -> Result<AgentReply> {
        self.invocations.lock().unwrap().push(agent.name.clone());
        match self.replies.get(&agent.name) {
            Some(Ok(output)) => Ok(AgentReply {
                final_output: output.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(AgentReply {
                final_output: "done".to_string(),
            }),
        }
    }
}

/// Provider with no discoverable tools.
struct EmptyProvider;

#[async_trait]
impl ToolProvider for EmptyProvider {
    async fn list_tools(&self, _toolkit: &str, _limit: usize) -> Result<Vec<ToolDescriptor>> {
        Ok(Vec::new())
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
        _descriptor: &ToolDescriptor,
        _args: Value,
        _user_id: &str,
    ) -> Result<Value> {
        Ok(Value::Null)
    }
}

fn pipeline(runtime: Arc<ScriptedRuntime>, store: Arc<InMemoryStore>) -> Pipeline {
    Pipeline::new(runtime, Arc::new(EmptyProvider), store, "gpt-4o-mini")
}

const GREEN_QA: &str = "All 12 E2E tests passed, CI green.";
const CLEAN_DEPLOY: &str = r#"{ "deploy_env": "staging", "health_status": "healthy", "rollback_needed": false }"#;
const CLEAN_MARKETING: &str = "Launch blurb: the runner habit tracker everyone has been waiting for.";

#[tokio::test]
async fn test_sequential_all_gates_pass() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[
        ("QA", Ok(GREEN_QA.to_string())),
        ("Publisher", Ok(CLEAN_DEPLOY.to_string())),
        ("Marketer", Ok(CLEAN_MARKETING.to_string())),
    ]);

    let outcome = pipeline(runtime.clone(), store.clone())
        .run_sequential("user-1")
        .await
        .unwrap();

    assert_eq!(outcome.gate, "Summary");
    assert_eq!(outcome.status, GateStatus::Ok);
    let outputs = outcome.outputs.unwrap();
    assert_eq!(outputs.len(), 6);
    assert_eq!(outputs["qa"], GREEN_QA);

    assert_eq!(
        runtime.invoked(),
        vec![
            "Researcher",
            "Architect",
            "Coder",
            "QA",
            "Publisher",
            "Marketer"
        ]
    );
}

#[tokio::test]
async fn test_sequential_qa_gate_blocks_before_deploy() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[("QA", Ok("3 tests failed".to_string()))]);

    let outcome = pipeline(runtime.clone(), store.clone())
        .run_sequential("user-1")
        .await
        .unwrap();

    assert_eq!(outcome.gate, "QA");
    assert_eq!(outcome.status, GateStatus::Blocked);
    assert!(outcome.details.unwrap().as_str().unwrap().contains("failed"));
    assert!(outcome.outputs.is_none());

    let invoked = runtime.invoked();
    assert!(!invoked.contains(&"Publisher".to_string()));
    assert!(!invoked.contains(&"Marketer".to_string()));

    // No runs were recorded for the phases behind the gate.
    let runs = store.list_runs().await;
    assert!(runs.iter().all(|r| r.agent != Role::Publisher));
    assert!(runs.iter().all(|r| r.agent != Role::Marketer));
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| r.status == RunStatus::Succeeded));
}

#[tokio::test]
async fn test_sequential_deploy_gate_blocks_before_marketing() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[
        ("QA", Ok(GREEN_QA.to_string())),
        (
            "Publisher",
            Ok(r#"{ "health_status": "degraded", "rollback_needed": true }"#.to_string()),
        ),
    ]);

    let outcome = pipeline(runtime.clone(), store)
        .run_sequential("user-1")
        .await
        .unwrap();

    assert_eq!(outcome.gate, "Deploy");
    assert_eq!(outcome.status, GateStatus::Blocked);
    assert!(!runtime.invoked().contains(&"Marketer".to_string()));
}

#[tokio::test]
async fn test_sequential_safety_gate_blocks_on_pii() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[
        ("QA", Ok(GREEN_QA.to_string())),
        ("Publisher", Ok(CLEAN_DEPLOY.to_string())),
        (
            "Marketer",
            Ok("Questions? Write to launch@example.com".to_string()),
        ),
    ]);

    let outcome = pipeline(runtime, store)
        .run_sequential("user-1")
        .await
        .unwrap();

    assert_eq!(outcome.gate, "Safety");
    assert_eq!(outcome.status, GateStatus::Blocked);
    let details = outcome.details.unwrap();
    assert_eq!(details["findings"][0]["kind"], "email");
}

#[tokio::test]
async fn test_sequential_handoffs_are_recorded() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[("QA", Ok("nothing ran".to_string()))]);

    let _ = pipeline(runtime, store.clone())
        .run_sequential("user-1")
        .await
        .unwrap();

    // One hand-off per invoked phase, all from the orchestrator.
    let handoffs = store.list_handoffs().await;
    assert_eq!(handoffs.len(), 4);
    assert!(handoffs.iter().all(|h| h.from_role == Role::Orchestrator));
    assert!(handoffs.iter().any(|h| h.to_role == Role::Qa));
}

#[tokio::test]
async fn test_delegated_completed() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[(
        "Orchestrator",
        Ok("Plan drawn up; all six phases finished cleanly.".to_string()),
    )]);

    let report = pipeline(runtime, store.clone())
        .run_delegated("user-1", "runner-habits")
        .await
        .unwrap();

    assert_eq!(report.status, PipelineStatus::Completed);
    assert_eq!(report.phase, "orchestration");
    assert!(report.outputs.contains_key("orchestrator"));
    assert!(report.outputs.contains_key("project"));

    // One succeeded orchestrator run, and the transcript grew.
    let runs = store.list_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].agent, Role::Orchestrator);
    assert_eq!(runs[0].status, RunStatus::Succeeded);

    let session = store.get_session(&report.session_id).await.unwrap();
    assert_eq!(session.transcript.len(), 1);
    assert!(session.transcript[0].starts_with("Orchestrator:"));
}

#[tokio::test]
async fn test_delegated_blocked_output() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[(
        "Orchestrator",
        Ok("QA phase blocked on missing CI credentials".to_string()),
    )]);

    let report = pipeline(runtime, store)
        .run_delegated("user-1", "runner-habits")
        .await
        .unwrap();

    assert_eq!(report.status, PipelineStatus::Blocked);
    assert_eq!(report.phase, "orchestration");
    assert!(
        report
            .next_steps
            .iter()
            .any(|s| s.contains("Resolve blocking issues"))
    );
}

#[tokio::test]
async fn test_delegated_pii_blocks_at_safety() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[(
        "Orchestrator",
        Ok("All done. Contact jane.doe@example.com for rollout".to_string()),
    )]);

    let report = pipeline(runtime, store)
        .run_delegated("user-1", "runner-habits")
        .await
        .unwrap();

    assert_eq!(report.status, PipelineStatus::Blocked);
    assert_eq!(report.phase, "safety");
    assert!(report.outputs.contains_key("scan"));
}

#[tokio::test]
async fn test_delegated_invocation_failure_records_failed_run() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[(
        "Orchestrator",
        Err(ProtolabError::invocation("model endpoint unreachable")),
    )]);

    let report = pipeline(runtime, store.clone())
        .run_delegated("user-1", "runner-habits")
        .await
        .unwrap();

    assert_eq!(report.status, PipelineStatus::Failed);
    assert!(
        report.outputs["error"]
            .as_str()
            .unwrap()
            .contains("unreachable")
    );

    let runs = store.list_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_service_round_trip_closes_completed_session() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = ScriptedRuntime::new(&[(
        "Orchestrator",
        Ok("Every phase wrapped up cleanly.".to_string()),
    )]);
    let sessions = Arc::new(SessionManager::new());
    let service = PipelineService::new(sessions.clone(), pipeline(runtime, store));

    let receipt = service
        .create_pipeline_run("user-1", "runner-habits")
        .await
        .unwrap();
    assert_eq!(receipt.status, PipelineStatus::Completed);

    let summary = service.get_session_status(&receipt.session_id).await.unwrap();
    assert_eq!(summary.current_phase.to_string(), "complete");
    assert_eq!(summary.status.to_string(), "completed");
    assert_eq!(summary.transcript_length, 1);

    assert!(service.get_session_status("session-unknown").await.is_none());
}
