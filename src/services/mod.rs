// src/services/mod.rs

pub mod chat;
pub mod summarization;

pub use chat::{ChatError, ChatOutcome, ChatService, IncomingMessage};
pub use summarization::Summarizer;
