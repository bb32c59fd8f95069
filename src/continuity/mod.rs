// src/continuity/mod.rs
//! Chat-ID continuity across sessions and, when a database is configured,
//! across restarts.
//!
//! Exactly one backend is authoritative per process: [`connect`] resolves
//! the choice once at startup, and every caller goes through the
//! [`ContinuityStore`] trait. No call site branches on which backend is
//! live; the capability difference is visible only through `is_durable`.

pub mod durable;
pub mod fallback;

pub use durable::DurableContinuityStore;
pub use fallback::FallbackContinuityStore;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::JunoConfig;
use crate::db::Database;
use crate::llm::intent::IntentDescriptor;
use crate::memory::StoredMessage;
use crate::session::Session;

/// What a chat-ID lookup brings back from a previous conversation.
///
/// The durable backend reconstructs identity with a second lookup and never
/// returns history; a fallback record carries identity and the full capped
/// history inline because no join is possible. `summary` is `None` until a
/// summary has actually been produced.
#[derive(Debug, Clone, Default)]
pub struct RecoveredConversation {
    pub summary: Option<String>,
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub history: Vec<StoredMessage>,
}

/// One finished exchange, ready to persist under a chat ID.
pub struct CompletedExchange<'a> {
    pub session: &'a Session,
    pub chat_id: &'a str,
    pub user_message: &'a str,
    pub assistant_message: &'a str,
    pub descriptor: &'a IntentDescriptor,
    /// Recomputed summary; empty below the summarization threshold.
    pub summary: &'a str,
    /// Snapshot of the full conversation buffer after this exchange.
    pub history: &'a [StoredMessage],
}

#[async_trait]
pub trait ContinuityStore: Send + Sync {
    /// True when records survive process restarts.
    fn is_durable(&self) -> bool;

    /// Look up a previous conversation by chat ID. `Ok(None)` means the ID
    /// has never been seen; a brand-new chat ID is not an error.
    async fn recover(&self, chat_id: &str) -> Result<Option<RecoveredConversation>>;

    /// Whether any continuity state already uses this chat ID.
    async fn chat_id_exists(&self, chat_id: &str) -> Result<bool>;

    /// Record a completed exchange. Last-write-wins for the continuity
    /// record itself; no merging across sessions sharing a chat ID.
    async fn persist_exchange(&self, exchange: &CompletedExchange<'_>) -> Result<()>;
}

/// The backend resolution made at startup.
///
/// `database` is kept around for the analytics queries, which only exist in
/// durable mode; `fallback` is kept so the sweeper can prune expired
/// records. Exactly one of the two is populated.
pub struct ContinuityBackend {
    pub store: Arc<dyn ContinuityStore>,
    pub database: Option<Database>,
    pub fallback: Option<Arc<FallbackContinuityStore>>,
}

/// Resolve the continuity backend, once, for the process lifetime.
///
/// Durable requires `DATABASE_URL` to be set and the pool plus migrations
/// to come up; any failure falls back permanently to the in-memory store.
pub async fn connect(config: &JunoConfig) -> ContinuityBackend {
    if let Some(url) = &config.database_url {
        match Database::connect(url, config.sqlite_max_connections).await {
            Ok(database) => {
                info!("💾 Continuity backend: durable database");
                let store = Arc::new(DurableContinuityStore::new(database.pool().clone()));
                return ContinuityBackend {
                    store,
                    database: Some(database),
                    fallback: None,
                };
            }
            Err(e) => {
                warn!("Database initialization failed, continuing without persistence: {e:#}");
            }
        }
    } else {
        info!("DATABASE_URL not set; conversation continuity will not survive restarts");
    }

    let fallback = Arc::new(FallbackContinuityStore::new(config.continuity_ttl_secs));
    ContinuityBackend {
        store: fallback.clone(),
        database: None,
        fallback: Some(fallback),
    }
}
