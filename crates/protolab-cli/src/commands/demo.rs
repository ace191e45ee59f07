//! Offline demo walkthroughs over the scripted collaborators.

use crate::script::{ScriptedProvider, ScriptedRuntime};
use anyhow::Result;
use protolab_core::model::ArtifactKind;
use protolab_core::session::SessionManager;
use protolab_core::store::InMemoryStore;
use protolab_guardrails::cost::{CostLimits, check_limits};
use protolab_guardrails::resilience::{
    BreakerError, CircuitBreaker, RetryConfig, with_smart_retry,
};
use protolab_pipeline::orchestrator::Pipeline;
use protolab_pipeline::service::PipelineService;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Session management and cost tracking walkthrough.
pub async fn session() -> Result<()> {
    let manager = SessionManager::new();

    let alpha = manager
        .create_session("project-alpha", "user-1", "gpt-4o-mini")
        .await;
    let beta = manager.create_session("project-beta", "user-2", "gpt-4o").await;
    println!("Created session {} for {}", alpha.id, alpha.project.name);
    println!("Created session {} for {}", beta.id, beta.project.name);

    manager
        .add_transcript_entry(&alpha.id, "Researcher", "Analyzing market trends...")
        .await?;
    manager
        .add_transcript_entry(&alpha.id, "Architect", "Designing system architecture...")
        .await?;
    manager
        .add_artifact(&alpha.id, ArtifactKind::Report, "reports/market-scan.md")
        .await?;
    manager
        .add_transcript_entry(&beta.id, "Coder", "Setting up repository...")
        .await?;

    manager.update_costs(&alpha.id, 1500, 800, 3).await?;
    manager.update_costs(&beta.id, 2200, 1200, 5).await?;

    let active = manager.active_sessions().await;
    println!("\nActive sessions: {}", active.len());
    for session in &active {
        if let Some(summary) = manager.session_summary(&session.id).await {
            println!(
                "  {}: phase={} cost=${:.4} artifacts={} transcript={}",
                summary.project_name,
                summary.current_phase,
                summary.cost,
                summary.artifact_count,
                summary.transcript_length
            );
        }
        let check = check_limits(&session.cost_tracker, &CostLimits::default());
        println!(
            "  limits: {}",
            if check.ok {
                "ok".to_string()
            } else {
                check.violations.join(", ")
            }
        );
    }

    manager.close_session(&alpha.id).await?;
    println!(
        "\nClosed {}; active sessions now: {}",
        alpha.id,
        manager.active_sessions().await.len()
    );
    Ok(())
}

/// Retry and circuit breaker walkthrough.
pub async fn resilience() -> Result<()> {
    println!("Retry with exponential backoff:");
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_in_op = attempts.clone();
    let result = with_smart_retry(
        move || {
            let attempts = attempts_in_op.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("temporary failure (attempt {n})"))
                } else {
                    Ok("success after retries")
                }
            }
        },
        &RetryConfig {
            base_delay: Duration::from_millis(200),
            ..RetryConfig::default()
        },
    )
    .await;
    println!(
        "  success={} attempts={} total_delay={}ms value={:?}",
        result.success,
        result.attempts,
        result.total_delay.as_millis(),
        result.value
    );

    println!("\nCircuit breaker:");
    let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
    for i in 1..=3 {
        let outcome: std::result::Result<(), _> = breaker
            .execute(|| async { Err::<(), _>("upstream unavailable".to_string()) })
            .await;
        let label = match outcome {
            Err(BreakerError::Open) => "fail-fast (breaker open)",
            Err(BreakerError::Inner(_)) => "failed through",
            Ok(()) => "ok",
        };
        println!("  call {i}: {label} (state={:?})", breaker.state().await);
    }
    Ok(())
}

/// Sequential and delegated pipeline runs over scripted collaborators.
pub async fn pipeline(project: &str, user: &str) -> Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::new(ScriptedRuntime),
        Arc::new(ScriptedProvider),
        store.clone(),
        "gpt-4o-mini",
    );

    println!("Sequential pipeline:");
    let outcome = pipeline.run_sequential(user).await?;
    println!("  gate={} status={}", outcome.gate, outcome.status);
    if let Some(outputs) = &outcome.outputs {
        for (phase, output) in outputs {
            println!("  {phase}: {output}");
        }
    }
    println!("  runs recorded: {}", store.list_runs().await.len());

    println!("\nDelegated pipeline (with retry wrapper):");
    let sessions = Arc::new(SessionManager::new());
    let service = PipelineService::new(sessions, pipeline);
    let result = with_smart_retry(
        || service.create_pipeline_run(user, project),
        &RetryConfig {
            max_retries: 2,
            base_delay: Duration::from_millis(2000),
            ..RetryConfig::default()
        },
    )
    .await;

    match (result.success, result.value) {
        (true, Some(receipt)) => {
            println!(
                "  status={} phase={} session={}",
                receipt.status, receipt.phase, receipt.session_id
            );
            println!("  next steps: {}", receipt.next_steps.join(", "));
            if let Some(summary) = service.get_session_status(&receipt.session_id).await {
                println!(
                    "  summary: phase={} status={} cost=${:.4} duration={}s",
                    summary.current_phase, summary.status, summary.cost, summary.duration_secs
                );
            }
        }
        _ => {
            println!(
                "  pipeline failed after {} attempts: {:?}",
                result.attempts, result.error
            );
        }
    }
    Ok(())
}
