// src/services/summarization.rs
//! Conversation summarization for chat-ID continuity.
//!
//! The summary is the durable carrier of context across sessions, so it is
//! recomputed after every persisted exchange once the buffer is long enough
//! to say anything useful.

use std::sync::Arc;

use tracing::warn;

use crate::llm::{ChatMessage, CompletionModel, CompletionRequest};
use crate::memory::{MessageRole, StoredMessage};

/// Minimum buffered messages before a summary is worth generating. Below
/// this the persisted summary is the empty string.
pub const SUMMARY_THRESHOLD: usize = 3;

const SUMMARY_MAX_TOKENS: u32 = 150;
const SUMMARY_TEMPERATURE: f32 = 0.3;

const SUMMARY_PROMPT: &str = "Summarize this conversation in 2-3 sentences, focusing on the \
                              main topics discussed and any action items or escalations.";

/// Cap on the deterministic excerpt used when the model is down.
const EXCERPT_MAX_CHARS: usize = 240;

pub struct Summarizer {
    model: Arc<dyn CompletionModel>,
    model_name: String,
}

impl Summarizer {
    pub fn new(model: Arc<dyn CompletionModel>, model_name: impl Into<String>) -> Self {
        Self { model, model_name: model_name.into() }
    }

    /// Empty below the threshold. A model failure degrades to a
    /// deterministic excerpt of the student's questions; persistence never
    /// waits on a perfect summary.
    pub async fn summarize(&self, history: &[StoredMessage]) -> String {
        if history.len() < SUMMARY_THRESHOLD {
            return String::new();
        }

        let transcript = history
            .iter()
            .map(|message| format!("{}: {}", message.role.as_str(), message.content))
            .collect::<Vec<_>>()
            .join("\n");

        let mut request = CompletionRequest::new(
            &self.model_name,
            vec![ChatMessage::system(SUMMARY_PROMPT), ChatMessage::user(transcript)],
        );
        request.max_tokens = Some(SUMMARY_MAX_TOKENS);
        request.temperature = Some(SUMMARY_TEMPERATURE);

        match self.model.complete(request).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                warn!("Summary model unavailable, storing an excerpt instead: {e:#}");
                excerpt(history)
            }
        }
    }
}

/// Deterministic stand-in summary: the student's questions, clipped.
fn excerpt(history: &[StoredMessage]) -> String {
    let topics: Vec<&str> = history
        .iter()
        .filter(|message| message.role == MessageRole::User)
        .map(|message| message.content.trim())
        .filter(|content| !content.is_empty())
        .collect();

    let mut summary = format!("The student asked about: {}", topics.join("; "));
    if summary.chars().count() > EXCERPT_MAX_CHARS {
        summary = summary.chars().take(EXCERPT_MAX_CHARS).collect();
        summary.push_str("...");
    }
    summary
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    struct ScriptedModel {
        reply: Option<String>,
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            assert_eq!(request.max_tokens, Some(SUMMARY_MAX_TOKENS));
            self.reply.clone().ok_or_else(|| anyhow!("model offline"))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(anyhow!("not scripted"))
        }
    }

    fn history(contents: &[(&str, MessageRole)]) -> Vec<StoredMessage> {
        contents
            .iter()
            .map(|(content, role)| StoredMessage {
                role: *role,
                content: content.to_string(),
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn below_threshold_yields_empty_summary() {
        let summarizer = Summarizer::new(
            Arc::new(ScriptedModel { reply: Some("should not be called".to_string()) }),
            "test-model",
        );
        let short = history(&[
            ("hello", MessageRole::User),
            ("hi there", MessageRole::Assistant),
        ]);

        assert_eq!(summarizer.summarize(&short).await, "");
    }

    #[tokio::test]
    async fn at_threshold_uses_the_model() {
        let summarizer = Summarizer::new(
            Arc::new(ScriptedModel { reply: Some(" Asked about fees. ".to_string()) }),
            "test-model",
        );
        let enough = history(&[
            ("why the gym fee?", MessageRole::User),
            ("here's why", MessageRole::Assistant),
            ("and the bus pass?", MessageRole::User),
        ]);

        assert_eq!(summarizer.summarize(&enough).await, "Asked about fees.");
    }

    #[tokio::test]
    async fn model_outage_degrades_to_an_excerpt() {
        let summarizer = Summarizer::new(Arc::new(ScriptedModel { reply: None }), "test-model");
        let enough = history(&[
            ("why the gym fee?", MessageRole::User),
            ("here's why", MessageRole::Assistant),
            ("and the bus pass?", MessageRole::User),
        ]);

        let summary = summarizer.summarize(&enough).await;
        assert!(summary.contains("why the gym fee?"));
        assert!(summary.contains("and the bus pass?"));
        assert!(!summary.contains("here's why"));
    }

    #[tokio::test]
    async fn excerpt_is_clipped() {
        let summarizer = Summarizer::new(Arc::new(ScriptedModel { reply: None }), "test-model");
        let long_question = "a".repeat(500);
        let enough = history(&[
            (long_question.as_str(), MessageRole::User),
            ("short answer", MessageRole::Assistant),
            ("follow-up", MessageRole::User),
        ]);

        let summary = summarizer.summarize(&enough).await;
        assert!(summary.chars().count() <= EXCERPT_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }
}
