// src/memory/mod.rs
//! Short-term conversation memory.
//!
//! One capped buffer per session, expiring 24h after the last write. This is
//! the only owner of live history; everything else (model context windows,
//! the history endpoint, continuity snapshots) works from clones.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{Sweepable, TtlCache};

/// Hard cap on buffered messages per conversation. Oldest entries are
/// discarded first once the cap is reached.
pub const HISTORY_CAP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate numbers for one conversation buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    /// Milliseconds between the first and last buffered message.
    #[serde(rename = "duration")]
    pub duration_ms: i64,
}

pub struct ConversationMemory {
    conversations: TtlCache<VecDeque<StoredMessage>>,
    cap: usize,
}

impl ConversationMemory {
    pub fn new(ttl_secs: u64, cap: usize) -> Self {
        Self {
            conversations: TtlCache::new(ttl_secs),
            cap,
        }
    }

    /// Append one message, evicting the oldest entries beyond the cap.
    /// Writing refreshes the buffer's lifetime.
    pub async fn append(&self, session_id: &str, role: MessageRole, content: impl Into<String>) {
        let message = StoredMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };

        let cap = self.cap;
        let appended = self
            .conversations
            .update(session_id, |history| {
                history.push_back(message.clone());
                while history.len() > cap {
                    history.pop_front();
                }
            })
            .await;

        if appended.is_none() {
            let mut history = VecDeque::with_capacity(self.cap);
            history.push_back(message);
            self.conversations.insert(session_id, history).await;
        }
    }

    /// The last `n` messages, oldest first.
    pub async fn recent(&self, session_id: &str, n: usize) -> Vec<StoredMessage> {
        let history = self.conversations.get(session_id).await.unwrap_or_default();
        let skip = history.len().saturating_sub(n);
        history.into_iter().skip(skip).collect()
    }

    /// The whole buffer, oldest first.
    pub async fn full(&self, session_id: &str) -> Vec<StoredMessage> {
        self.conversations
            .get(session_id)
            .await
            .map(|history| history.into_iter().collect())
            .unwrap_or_default()
    }

    /// Counts and span for one buffer. An unknown or expired session yields
    /// all zeroes rather than an error.
    pub async fn stats(&self, session_id: &str) -> ConversationStats {
        let history = self.full(session_id).await;
        let user_messages = history
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count();
        let duration_ms = match (history.first(), history.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        };

        ConversationStats {
            message_count: history.len(),
            user_messages,
            assistant_messages: history.len() - user_messages,
            duration_ms,
        }
    }
}

#[async_trait]
impl Sweepable for ConversationMemory {
    fn name(&self) -> &'static str {
        "conversation-memory"
    }

    async fn sweep(&self) -> usize {
        self.conversations.sweep().await
    }
}
