// src/llm/mod.rs
// LLM module exports and submodule declarations

pub mod client;
pub mod generation;
pub mod intent;
pub mod prompts;

pub use client::OpenAIClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::memory::{MessageRole, StoredMessage};

/// One message in a completion request, in the provider's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&StoredMessage> for ChatMessage {
    fn from(message: &StoredMessage) -> Self {
        match message.role {
            MessageRole::User => ChatMessage::user(message.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(message.content.clone()),
        }
    }
}

/// Parameters for one completion call. `max_tokens` and `temperature` ride
/// along only when set; most calls run on provider defaults.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the provider to emit a single JSON object.
    pub json_response: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            json_response: false,
        }
    }
}

/// The model provider seam.
///
/// Production uses [`OpenAIClient`]; tests inject scripted doubles. Every
/// call is a single attempt, and callers degrade on failure instead of
/// retrying.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Reserved: embedding lookup for a future similarity-search mode of
    /// the knowledge store. Not called by the active pipeline.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
