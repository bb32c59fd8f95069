// src/services/chat.rs
//! The chat pipeline: validate, resolve the session, classify, retrieve,
//! escalate, mint the chat ID, generate, persist.
//!
//! Every model-dependent step degrades instead of failing, so after the
//! session is resolved the pipeline always produces a reply. The only
//! client-visible errors are a blank message and an unresolvable session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::JunoConfig;
use crate::continuity::{CompletedExchange, ContinuityStore};
use crate::escalation::ContactDirectory;
use crate::knowledge::KnowledgeStore;
use crate::llm::CompletionModel;
use crate::llm::generation::{GenerationRequest, ResponseGenerator};
use crate::llm::intent::{EmotionalState, Intent, IntentClassifier};
use crate::memory::{ConversationMemory, MessageRole};
use crate::session::SessionRegistry;

use super::summarization::Summarizer;

/// History window handed to the intent classifier.
const CLASSIFIER_WINDOW: usize = 5;
/// History window handed to the response generator.
const GENERATION_WINDOW: usize = 10;

/// Results retained from a knowledge search.
const RETRIEVAL_TOP_K: usize = 3;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("Session not found. Please start a new session.")]
    SessionNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Inbound chat fields, deserialized but not yet validated.
pub struct IncomingMessage<'a> {
    pub session_id: Option<&'a str>,
    pub message: &'a str,
    pub name: Option<&'a str>,
    pub student_number: Option<&'a str>,
    pub chat_id: Option<&'a str>,
}

/// Everything the wire response reports about one completed exchange.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
    pub chat_id: String,
    pub intent: Intent,
    pub emotional_state: EmotionalState,
    pub escalation_required: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct ChatService {
    registry: Arc<SessionRegistry>,
    memory: Arc<ConversationMemory>,
    continuity: Arc<dyn ContinuityStore>,
    knowledge: Arc<KnowledgeStore>,
    contacts: Arc<ContactDirectory>,
    classifier: IntentClassifier,
    generator: ResponseGenerator,
    summarizer: Summarizer,
}

impl ChatService {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        registry: Arc<SessionRegistry>,
        memory: Arc<ConversationMemory>,
        continuity: Arc<dyn ContinuityStore>,
        knowledge: Arc<KnowledgeStore>,
        contacts: Arc<ContactDirectory>,
        config: &JunoConfig,
    ) -> Self {
        Self {
            registry,
            memory,
            continuity,
            knowledge,
            contacts,
            classifier: IntentClassifier::new(model.clone(), config.intent_model.clone()),
            generator: ResponseGenerator::new(
                model.clone(),
                config.model.clone(),
                config.support_email.clone(),
            ),
            summarizer: Summarizer::new(model, config.model.clone()),
        }
    }

    pub async fn handle_message(
        &self,
        incoming: IncomingMessage<'_>,
    ) -> Result<ChatOutcome, ChatError> {
        let message = incoming.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session = self
            .registry
            .resolve_or_create(
                incoming.session_id,
                incoming.name,
                incoming.student_number,
                incoming.chat_id,
            )
            .await
            .ok_or(ChatError::SessionNotFound)?;

        // One memory read serves both model calls; the classifier sees the
        // tail of the generator's window.
        let history = self.memory.recent(&session.session_id, GENERATION_WINDOW).await;
        let classify_from = history.len().saturating_sub(CLASSIFIER_WINDOW);
        let analysis = self.classifier.classify(message, &history[classify_from..]).await;
        let descriptor = analysis.descriptor().clone();

        info!(
            "💬 session {} classified as {}/{}{}",
            session.session_id,
            descriptor.intent.as_str(),
            descriptor.emotional_state.as_str(),
            if analysis.is_degraded() { " (rules)" } else { "" }
        );

        let knowledge_context = descriptor.needs_retrieval.then(|| {
            let results = self.knowledge.search(message, RETRIEVAL_TOP_K);
            KnowledgeStore::format_context(&results)
        });

        let escalate = descriptor.requires_escalation || descriptor.emotional_state.is_crisis();
        let escalation =
            escalate.then(|| self.contacts.contact(&descriptor.category, session.user_type));

        // The chat ID is minted before generation so the reply can disclose it.
        let (session, chat_id) = match session.chat_id.clone() {
            Some(existing) => (session, existing),
            None => {
                let minted = self.registry.mint_chat_id().await;
                match self.registry.attach_chat_id(&session.session_id, &minted).await {
                    Some(updated) => {
                        // A concurrent request may have attached first; the
                        // session's assignment is what counts.
                        let assigned = updated.chat_id.clone().unwrap_or(minted);
                        (updated, assigned)
                    }
                    None => {
                        // Session expired mid-request; keep serving from the
                        // local copy rather than failing the exchange.
                        let mut session = session;
                        session.chat_id = Some(minted.clone());
                        (session, minted)
                    }
                }
            }
        };

        let reply = self
            .generator
            .generate(GenerationRequest {
                message,
                history: &history,
                descriptor: &descriptor,
                session: &session,
                knowledge_context: knowledge_context.as_deref(),
                escalation,
            })
            .await;

        // Memory first; the continuity write reads the buffer back.
        self.memory.append(&session.session_id, MessageRole::User, message).await;
        self.memory
            .append(&session.session_id, MessageRole::Assistant, reply.text())
            .await;

        let full_history = self.memory.full(&session.session_id).await;
        let summary = self.summarizer.summarize(&full_history).await;

        let exchange = CompletedExchange {
            session: &session,
            chat_id: &chat_id,
            user_message: message,
            assistant_message: reply.text(),
            descriptor: &descriptor,
            summary: &summary,
            history: &full_history,
        };
        if let Err(e) = self.continuity.persist_exchange(&exchange).await {
            // Best-effort: the student already has their reply.
            warn!("Failed to persist exchange for chat {}: {e:#}", chat_id);
        }

        Ok(ChatOutcome {
            response: reply.into_text(),
            session_id: session.session_id,
            chat_id,
            intent: descriptor.intent,
            emotional_state: descriptor.emotional_state,
            escalation_required: escalate,
            timestamp: Utc::now(),
        })
    }
}
