// src/continuity/fallback.rs
//! In-memory continuity for deployments without a database.
//!
//! Records live for 30 days of inactivity and die with the process. Because
//! no session table exists to join against, each record is self-contained:
//! identity, summary, and the full capped history travel together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::{Sweepable, TtlCache};
use crate::memory::StoredMessage;

use super::{CompletedExchange, ContinuityStore, RecoveredConversation};

/// Everything known about a finished conversation under one chat ID.
#[derive(Debug, Clone)]
pub struct FallbackRecord {
    pub chat_id: String,
    pub name: String,
    pub student_number: Option<String>,
    pub summary: String,
    pub history: Vec<StoredMessage>,
    pub last_interaction: DateTime<Utc>,
}

pub struct FallbackContinuityStore {
    records: TtlCache<FallbackRecord>,
}

impl FallbackContinuityStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self { records: TtlCache::new(ttl_secs) }
    }

    /// Raw record lookup, used by tests and diagnostics.
    pub async fn record(&self, chat_id: &str) -> Option<FallbackRecord> {
        self.records.get(chat_id).await
    }
}

#[async_trait]
impl ContinuityStore for FallbackContinuityStore {
    fn is_durable(&self) -> bool {
        false
    }

    async fn recover(&self, chat_id: &str) -> anyhow::Result<Option<RecoveredConversation>> {
        Ok(self.records.get(chat_id).await.map(|record| RecoveredConversation {
            summary: Some(record.summary).filter(|s| !s.trim().is_empty()),
            name: Some(record.name).filter(|n| !n.is_empty()),
            student_number: record.student_number,
            history: record.history,
        }))
    }

    async fn chat_id_exists(&self, chat_id: &str) -> anyhow::Result<bool> {
        Ok(self.records.get(chat_id).await.is_some())
    }

    async fn persist_exchange(&self, exchange: &CompletedExchange<'_>) -> anyhow::Result<()> {
        // An empty summary keeps whatever the previous session produced;
        // the write still replaces identity and history.
        let summary = if exchange.summary.is_empty() {
            self.records
                .get(exchange.chat_id)
                .await
                .map(|record| record.summary)
                .unwrap_or_default()
        } else {
            exchange.summary.to_string()
        };

        let record = FallbackRecord {
            chat_id: exchange.chat_id.to_string(),
            name: exchange.session.name.clone(),
            student_number: exchange.session.student_number.clone(),
            summary,
            history: exchange.history.to_vec(),
            last_interaction: Utc::now(),
        };
        self.records.insert(exchange.chat_id, record).await;
        Ok(())
    }
}

#[async_trait]
impl Sweepable for FallbackContinuityStore {
    fn name(&self) -> &'static str {
        "fallback-continuity"
    }

    async fn sweep(&self) -> usize {
        self.records.sweep().await
    }
}
