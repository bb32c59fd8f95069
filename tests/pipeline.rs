//! Chat pipeline semantics, driven through `ChatService` with scripted
//! model doubles: what the classifier steers, what the generator sees, and
//! what lands in the continuity record.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use juno::config::JunoConfig;
use juno::continuity::{ContinuityBackend, FallbackContinuityStore};
use juno::llm::intent::{EmotionalState, Intent};
use juno::llm::{CompletionModel, CompletionRequest};
use juno::services::{ChatError, IncomingMessage};
use juno::session::students::DEMO_STUDENT_NUMBER;
use juno::state::{AppState, create_app_state};

// ============================================================================
// Test Utilities
// ============================================================================

/// Answers calls from a script and records every request it saw.
struct RecordingModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingModel {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionModel for RecordingModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("not scripted")
    }
}

/// Provider double that fails every call.
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

fn fallback_state(
    model: Arc<dyn CompletionModel>,
) -> (Arc<AppState>, Arc<FallbackContinuityStore>) {
    let fallback = Arc::new(FallbackContinuityStore::new(3_600));
    let backend = ContinuityBackend {
        store: fallback.clone(),
        database: None,
        fallback: Some(fallback.clone()),
    };
    let state = create_app_state(JunoConfig::default(), model, backend);
    (state, fallback)
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
// Classifier-steered retrieval
// ============================================================================

#[tokio::test]
async fn classifier_verdict_steers_retrieval_into_the_prompt() {
    let model = Arc::new(RecordingModel::new(&[
        r#"{"intent":"fee_inquiry","emotionalState":"neutral","requiresEscalation":false,"needsRetrieval":true,"category":"fees","keywords":["gym","fee"]}"#,
        "Fully remote students can apply for a supplementary fee exemption.",
    ]));
    let (state, _) = fallback_state(model.clone());
    let session = state
        .registry
        .create(Some("Priya"), Some(DEMO_STUDENT_NUMBER), None)
        .await
        .session;

    let outcome = state
        .chat
        .handle_message(message(
            &session.session_id,
            "Why am I charged a gym fee as a remote student?",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::FeeInquiry);
    assert_eq!(outcome.emotional_state, EmotionalState::Neutral);
    assert!(!outcome.escalation_required);
    assert!(outcome.response.starts_with("Fully remote students"));
    assert!(outcome.response.contains("Your Chat ID is"));

    // One classification call, one generation call; two messages stay
    // under the summarization threshold.
    assert_eq!(model.calls(), 2);

    let classify = model.request(0);
    assert!(classify.json_response);

    let generate = model.request(1);
    assert!(!generate.json_response);
    let system = &generate.messages[0];
    assert_eq!(system.role, "system");
    assert!(system.content.contains("Relevant Information from the Northfield Knowledge Base"));
    assert!(system.content.contains("[Source 1:"));
    assert_eq!(
        generate.messages.last().unwrap().content,
        "Why am I charged a gym fee as a remote student?"
    );
}

#[tokio::test]
async fn retrieval_is_skipped_when_the_classifier_says_so() {
    let model = Arc::new(RecordingModel::new(&[
        r#"{"intent":"general_inquiry","emotionalState":"neutral","requiresEscalation":false,"needsRetrieval":false,"category":"general","keywords":[]}"#,
        "Happy to help!",
    ]));
    let (state, _) = fallback_state(model.clone());
    let session = state.registry.create(Some("Ana"), None, None).await.session;

    state
        .chat
        .handle_message(message(&session.session_id, "Hi there, are you around?"))
        .await
        .unwrap();

    let generate = model.request(1);
    assert!(
        !generate.messages[0]
            .content
            .contains("Relevant Information from the Northfield Knowledge Base")
    );
}

// ============================================================================
// Chat IDs and continuity records
// ============================================================================

#[tokio::test]
async fn chat_id_is_minted_once_and_exchanges_accumulate() {
    let (state, fallback) = fallback_state(Arc::new(OfflineModel));
    let session = state.registry.create(Some("Noah"), None, None).await.session;

    let first = state
        .chat
        .handle_message(message(&session.session_id, "What are the add and drop deadlines?"))
        .await
        .unwrap();
    let second = state
        .chat
        .handle_message(message(&session.session_id, "And when is tuition due?"))
        .await
        .unwrap();

    assert_eq!(first.chat_id, second.chat_id);
    let value: u32 = first.chat_id.parse().unwrap();
    assert!((40_000..=49_999).contains(&value));

    let record = fallback.record(&first.chat_id).await.unwrap();
    assert_eq!(record.name, "Noah");
    assert_eq!(record.history.len(), 4);
    // Two exchanges put the buffer over the summarization threshold; with
    // the provider down the summary is the keyword excerpt.
    assert!(record.summary.starts_with("The student asked about:"));
}

#[tokio::test]
async fn first_exchange_stays_below_the_summary_threshold() {
    let (state, fallback) = fallback_state(Arc::new(OfflineModel));
    let session = state.registry.create(Some("Mei"), None, None).await.session;

    let outcome = state
        .chat
        .handle_message(message(&session.session_id, "How do recorded lectures work?"))
        .await
        .unwrap();

    let record = fallback.record(&outcome.chat_id).await.unwrap();
    assert_eq!(record.history.len(), 2);
    assert!(record.summary.is_empty());
}

#[tokio::test]
async fn resumed_chat_id_restores_identity_and_context() {
    let (state, _) = fallback_state(Arc::new(OfflineModel));
    let session = state
        .registry
        .create(Some("Maya"), Some(DEMO_STUDENT_NUMBER), None)
        .await
        .session;
    let session_id = session.session_id.clone();

    state
        .chat
        .handle_message(message(&session_id, "How do I get the transit fee waived?"))
        .await
        .unwrap();
    let outcome = state
        .chat
        .handle_message(message(&session_id, "Who do I email about it?"))
        .await
        .unwrap();

    // A later visitor quoting the chat ID gets identity and context back.
    let resumed = state.registry.create(None, None, Some(&outcome.chat_id)).await;
    assert_eq!(resumed.session.name, "Maya");
    assert_eq!(
        resumed.session.student_number.as_deref(),
        Some(DEMO_STUDENT_NUMBER)
    );
    assert!(
        resumed
            .session
            .previous_context
            .as_deref()
            .unwrap()
            .starts_with("The student asked about:")
    );
    assert_eq!(resumed.recovered_history.len(), 4);

    // Caller-supplied identity still wins over the record.
    let overridden = state
        .registry
        .create(Some("Sam"), None, Some(&outcome.chat_id))
        .await;
    assert_eq!(overridden.session.name, "Sam");
}

// ============================================================================
// Degraded operation
// ============================================================================

#[tokio::test]
async fn offline_provider_still_answers_with_guidance() {
    let (state, _) = fallback_state(Arc::new(OfflineModel));
    let session = state.registry.create(Some("Ana"), None, None).await.session;

    let outcome = state
        .chat
        .handle_message(message(
            &session.session_id,
            "What online programs does Northfield offer?",
        ))
        .await
        .unwrap();

    assert!(!outcome.response.is_empty());
    assert_eq!(outcome.emotional_state, EmotionalState::Neutral);
    assert!(!outcome.escalation_required);
    assert!(outcome.response.contains("Your Chat ID is"));
}

#[tokio::test]
async fn stressed_fallback_already_names_the_contact() {
    let (state, _) = fallback_state(Arc::new(OfflineModel));
    let session = state
        .registry
        .create(Some("Omar"), Some(DEMO_STUDENT_NUMBER), None)
        .await
        .session;

    let outcome = state
        .chat
        .handle_message(message(
            &session.session_id,
            "This is too much, I'm completely overwhelmed",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.emotional_state, EmotionalState::Stressed);
    assert!(outcome.escalation_required);
    // The canned reply already carries the Wellbeing Centre's email, so no
    // second contact block gets appended.
    assert!(outcome.response.contains("wellbeing@northfield.edu"));
    assert!(!outcome.response.contains("📞"));
}

#[tokio::test]
async fn empty_and_stale_inputs_map_to_client_errors() {
    let (state, _) = fallback_state(Arc::new(OfflineModel));

    let err = state
        .chat
        .handle_message(message("whatever", "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));

    let err = state
        .chat
        .handle_message(IncomingMessage {
            session_id: Some("expired-session"),
            message: "hello",
            name: None,
            student_number: Some("12345"),
            chat_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::SessionNotFound));
}
