// src/llm/generation.rs
//! Reply generation with post-processing and canned degradation.
//!
//! A provider failure never surfaces to the student: the generator falls
//! back to canned text keyed on the emotional state, with crisis text
//! taking precedence. Post-processing runs on both paths so the escalation
//! contact block and the chat-ID disclosure are never lost.

use std::sync::Arc;

use tracing::warn;

use crate::escalation::ContactRecord;
use crate::memory::StoredMessage;
use crate::session::Session;

use super::intent::{EmotionalState, IntentDescriptor};
use super::prompts::{PromptContext, build_system_prompt};
use super::{ChatMessage, CompletionModel, CompletionRequest};

/// Most recent messages included as model context per reply.
const HISTORY_WINDOW: usize = 10;

const CRISIS_FALLBACK: &str = "\
I want to make sure you get support right away. Please reach out now:

- Student Wellbeing Centre Crisis Support: 416-555-0144 ext. 2700
- 24/7 Crisis Line: 1-833-555-0199
- CalmLine (post-secondary student helpline): 1-877-555-0132

You don't have to go through this alone. These people are available around the clock and want to hear from you.";

const STRESSED_FALLBACK: &str = "\
I'm having trouble generating a full answer right now, but I hear that this is a lot to carry. \
The Student Wellbeing Centre offers free counselling for remote students, 8am-10pm daily: \
wellbeing@northfield.edu or 416-555-0144 ext. 2700. Please ask me again in a moment and I'll \
pick up the rest of your question.";

/// Everything the generator needs for one reply.
pub struct GenerationRequest<'a> {
    pub message: &'a str,
    pub history: &'a [StoredMessage],
    pub descriptor: &'a IntentDescriptor,
    pub session: &'a Session,
    pub knowledge_context: Option<&'a str>,
    pub escalation: Option<&'a ContactRecord>,
}

/// A reply plus how it was produced. Degraded replies are canned text, not
/// model output, but they go through the same post-processing.
#[derive(Debug, Clone)]
pub enum GeneratedReply {
    Model(String),
    Degraded(String),
}

impl GeneratedReply {
    pub fn text(&self) -> &str {
        match self {
            GeneratedReply::Model(text) | GeneratedReply::Degraded(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            GeneratedReply::Model(text) | GeneratedReply::Degraded(text) => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GeneratedReply::Degraded(_))
    }
}

pub struct ResponseGenerator {
    model: Arc<dyn CompletionModel>,
    model_name: String,
    support_email: String,
}

impl ResponseGenerator {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        model_name: impl Into<String>,
        support_email: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            support_email: support_email.into(),
        }
    }

    pub async fn generate(&self, request: GenerationRequest<'_>) -> GeneratedReply {
        let system_prompt = build_system_prompt(&PromptContext {
            descriptor: request.descriptor,
            session: request.session,
            knowledge_context: request.knowledge_context,
            escalation: request.escalation,
        });

        let mut messages = vec![ChatMessage::system(system_prompt)];
        let skip = request.history.len().saturating_sub(HISTORY_WINDOW);
        messages.extend(request.history[skip..].iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(request.message));

        match self
            .model
            .complete(CompletionRequest::new(&self.model_name, messages))
            .await
        {
            Ok(text) => GeneratedReply::Model(self.post_process(text, &request)),
            Err(e) => {
                warn!("Response model unavailable, using canned reply: {e:#}");
                let canned = self.fallback_text(request.descriptor.emotional_state);
                GeneratedReply::Degraded(self.post_process(canned, &request))
            }
        }
    }

    /// Canned reply for a provider outage, keyed on emotional state. Crisis
    /// text always carries the live contact numbers.
    pub fn fallback_text(&self, emotional_state: EmotionalState) -> String {
        match emotional_state {
            EmotionalState::Crisis => CRISIS_FALLBACK.to_string(),
            EmotionalState::Stressed => STRESSED_FALLBACK.to_string(),
            _ => format!(
                "I apologize, but I'm having technical difficulties right now. Please try \
                 again in a moment, or contact Student Services at {} for immediate \
                 assistance.",
                self.support_email
            ),
        }
    }

    /// Appends the escalation contact block and the chat-ID disclosure when
    /// the text does not already carry them.
    fn post_process(&self, mut text: String, request: &GenerationRequest<'_>) -> String {
        if let Some(contact) = request.escalation {
            if !text.contains(&contact.email) {
                text.push_str("\n\n");
                text.push_str(&contact.format_block());
            }
        }

        if let Some(chat_id) = &request.session.chat_id {
            if !text.contains(chat_id.as_str()) {
                text.push_str(&format!(
                    "\n\n📋 **Your Chat ID is: {chat_id}**\n\
                     Save it to pick this conversation up again later."
                ));
            }
        }

        text
    }
}
