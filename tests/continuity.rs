//! Durable continuity on a real SQLite file: recovery across pool
//! re-opens, summary preservation, and the analytics rollup.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use juno::config::JunoConfig;
use juno::continuity;
use juno::llm::{CompletionModel, CompletionRequest};
use juno::services::IncomingMessage;
use juno::session::students::DEMO_STUDENT_NUMBER;
use juno::state::{AppState, create_app_state};

// ============================================================================
// Test Utilities
// ============================================================================

/// Provider double that fails every call, so summaries come from the
/// keyword excerpt and replies from the canned fallbacks.
struct OfflineModel;

#[async_trait]
impl CompletionModel for OfflineModel {
    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        anyhow::bail!("provider offline")
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("provider offline")
    }
}

fn file_config(dir: &TempDir) -> JunoConfig {
    JunoConfig {
        database_url: Some(format!("sqlite://{}", dir.path().join("juno.db").display())),
        ..JunoConfig::default()
    }
}

/// Open (or re-open) the database file and wire a full app over it.
async fn durable_state(dir: &TempDir) -> Arc<AppState> {
    let config = file_config(dir);
    let backend = continuity::connect(&config).await;
    assert!(backend.store.is_durable(), "expected the database backend");
    create_app_state(config, Arc::new(OfflineModel), backend)
}

fn message<'a>(session_id: &'a str, text: &'a str) -> IncomingMessage<'a> {
    IncomingMessage {
        session_id: Some(session_id),
        message: text,
        name: None,
        student_number: None,
        chat_id: None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn continuity_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let chat_id = {
        let state = durable_state(&dir).await;
        let session = state
            .registry
            .create(Some("Priya Shah"), Some(DEMO_STUDENT_NUMBER), None)
            .await
            .session;
        let session_id = session.session_id.clone();

        state
            .chat
            .handle_message(message(&session_id, "Why am I charged the gym fee?"))
            .await
            .unwrap();
        let outcome = state
            .chat
            .handle_message(message(&session_id, "How do I apply for the exemption?"))
            .await
            .unwrap();

        assert!(state.continuity.chat_id_exists(&outcome.chat_id).await.unwrap());
        outcome.chat_id
    };

    // Fresh pool over the same file, as after a process restart.
    let state = durable_state(&dir).await;
    let resumed = state.registry.create(None, None, Some(&chat_id)).await;

    assert_eq!(resumed.session.name, "Priya Shah");
    assert_eq!(
        resumed.session.student_number.as_deref(),
        Some(DEMO_STUDENT_NUMBER)
    );
    let context = resumed.session.previous_context.expect("summary persisted");
    assert!(context.starts_with("The student asked about:"));
    // The database backend reconstructs identity and summary, not transcripts.
    assert!(resumed.recovered_history.is_empty());
}

#[tokio::test]
async fn unknown_chat_id_recovers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state = durable_state(&dir).await;

    assert!(!state.continuity.chat_id_exists("40000").await.unwrap());
    assert!(state.continuity.recover("40000").await.unwrap().is_none());
}

#[tokio::test]
async fn short_resumed_exchange_keeps_the_earlier_summary() {
    let dir = tempfile::tempdir().unwrap();
    let state = durable_state(&dir).await;

    // Two exchanges push the first conversation past the summary threshold.
    let first = state.registry.create(Some("Omar"), None, None).await.session;
    state
        .chat
        .handle_message(message(&first.session_id, "When is tuition due this semester?"))
        .await
        .unwrap();
    let outcome = state
        .chat
        .handle_message(message(&first.session_id, "Is there a payment plan?"))
        .await
        .unwrap();
    let chat_id = outcome.chat_id;

    // Resume under the chat ID and stop after a single exchange, below the
    // threshold. The stored summary must survive it.
    let resumed = state.registry.create(None, None, Some(&chat_id)).await.session;
    state
        .chat
        .handle_message(message(&resumed.session_id, "One more question about the plan."))
        .await
        .unwrap();

    let again = state.registry.create(None, None, Some(&chat_id)).await.session;
    assert!(
        again
            .previous_context
            .as_deref()
            .unwrap()
            .starts_with("The student asked about: When is tuition due")
    );
}

#[tokio::test]
async fn analytics_reflect_stored_exchanges() {
    let dir = tempfile::tempdir().unwrap();
    let state = durable_state(&dir).await;

    let session = state
        .registry
        .create(Some("Lena"), Some(DEMO_STUDENT_NUMBER), None)
        .await
        .session;
    state
        .chat
        .handle_message(message(&session.session_id, "Why is my tuition invoice so high?"))
        .await
        .unwrap();
    state
        .chat
        .handle_message(message(
            &session.session_id,
            "Can I set up a payment plan for the balance?",
        ))
        .await
        .unwrap();

    let report = state.database.as_ref().unwrap().analytics(7).await.unwrap();
    assert_eq!(report.period_days, 7);
    assert_eq!(report.total_sessions, 1);
    // User and assistant rows both count toward volume.
    assert_eq!(report.total_messages, 4);

    // Only user rows carry a verdict, so two fee questions are one bucket.
    assert_eq!(report.breakdown.len(), 1);
    assert_eq!(report.breakdown[0].intent, "fee_inquiry");
    assert_eq!(report.breakdown[0].emotional_state, "neutral");
    assert_eq!(report.breakdown[0].count, 2);
}

#[tokio::test]
async fn unreachable_database_falls_back_to_memory() {
    let config = JunoConfig {
        database_url: Some("sqlite:///proc/juno/forbidden.db".to_string()),
        ..JunoConfig::default()
    };

    let backend = continuity::connect(&config).await;
    assert!(!backend.store.is_durable());
    assert!(backend.database.is_none());
    assert!(backend.fallback.is_some());
}
