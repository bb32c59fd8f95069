// src/session/registry.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{Sweepable, TtlCache};
use crate::continuity::ContinuityStore;
use crate::memory::StoredMessage;

use super::{Session, StudentDirectory, UserType};

/// Inclusive range chat IDs are drawn from.
const CHAT_ID_MIN: u32 = 40_000;
const CHAT_ID_MAX: u32 = 49_999;
/// Collision retries before the last draw is kept regardless.
const CHAT_ID_RETRIES: u32 = 5;

/// A freshly created session plus whatever the continuity record carried.
///
/// Recovered history is handed back to a resuming client but not replayed
/// into live memory; the recovered summary is what carries context into the
/// generation prompt.
pub struct NewSession {
    pub session: Session,
    pub recovered_history: Vec<StoredMessage>,
}

/// Live sessions, keyed by session ID, expiring 24h after the last write.
pub struct SessionRegistry {
    sessions: TtlCache<Session>,
    continuity: Arc<dyn ContinuityStore>,
}

impl SessionRegistry {
    pub fn new(session_ttl_secs: u64, continuity: Arc<dyn ContinuityStore>) -> Self {
        Self {
            sessions: TtlCache::new(session_ttl_secs),
            continuity,
        }
    }

    fn usable(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    /// Return the live session for `session_id`, or create a new one.
    ///
    /// `None` only when a session ID was supplied but is unknown or expired
    /// AND nothing usable (name or chat ID) was supplied to start over; a
    /// bare student number cannot fabricate an identity. Callers treat
    /// `None` as "ask the client to start a new session".
    pub async fn resolve_or_create(
        &self,
        session_id: Option<&str>,
        name: Option<&str>,
        student_number: Option<&str>,
        chat_id: Option<&str>,
    ) -> Option<Session> {
        if let Some(id) = Self::usable(session_id) {
            if let Some(existing) = self.sessions.get(id).await {
                return Some(existing);
            }
            if Self::usable(name).is_none() && Self::usable(chat_id).is_none() {
                return None;
            }
        }
        Some(self.create(name, student_number, chat_id).await.session)
    }

    /// Create a session, recovering identity and context from the chat ID's
    /// continuity record when one exists. Caller-supplied fields always win;
    /// recovered values only fill the blanks. A recovery failure is treated
    /// as "no record" so session creation never fails.
    pub async fn create(
        &self,
        name: Option<&str>,
        student_number: Option<&str>,
        chat_id: Option<&str>,
    ) -> NewSession {
        let chat_id = Self::usable(chat_id);

        let mut recovered = None;
        if let Some(chat_id) = chat_id {
            match self.continuity.recover(chat_id).await {
                Ok(Some(previous)) => {
                    info!("Recovered continuity record for chat ID {}", chat_id);
                    recovered = Some(previous);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Continuity recovery failed for chat ID {}: {:#}", chat_id, e);
                }
            }
        }
        let recovered = recovered.unwrap_or_default();

        let name = Self::usable(name)
            .map(str::to_string)
            .or(recovered.name)
            .unwrap_or_default();
        let student_number = Self::usable(student_number)
            .map(str::to_string)
            .or(recovered.student_number);

        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            user_type: UserType::from_student_number(student_number.as_deref()),
            student_info: StudentDirectory::lookup(student_number.as_deref()),
            name,
            student_number,
            chat_id: chat_id.map(str::to_string),
            previous_context: recovered.summary,
            created_at: Utc::now(),
        };
        self.sessions
            .insert(session.session_id.clone(), session.clone())
            .await;

        NewSession {
            session,
            recovered_history: recovered.history,
        }
    }

    /// Mutate a live session in place, refreshing its lifetime. Returns the
    /// updated session, or `None` for an unknown or expired ID.
    pub async fn update<F>(&self, session_id: &str, updater: F) -> Option<Session>
    where
        F: FnOnce(&mut Session),
    {
        self.sessions.update(session_id, updater).await
    }

    /// Attach a chat ID to a session, exactly once. A session that already
    /// carries a chat ID keeps it; the attempted reassignment is ignored.
    pub async fn attach_chat_id(&self, session_id: &str, chat_id: &str) -> Option<Session> {
        self.update(session_id, |session| {
            if session.chat_id.is_none() {
                session.chat_id = Some(chat_id.to_string());
            }
        })
        .await
    }

    /// Draw a fresh chat ID, verifying it is unused via the continuity
    /// store. Retries a bounded number of times on collision; the final
    /// draw is kept unchecked and last-write-wins applies from there.
    pub async fn mint_chat_id(&self) -> String {
        let mut candidate = Self::random_chat_id();
        let mut attempts = 0;
        while attempts < CHAT_ID_RETRIES {
            match self.continuity.chat_id_exists(&candidate).await {
                Ok(false) => return candidate,
                Ok(true) => {
                    attempts += 1;
                    candidate = Self::random_chat_id();
                }
                Err(e) => {
                    warn!("Chat ID uniqueness check failed, keeping {}: {:#}", candidate, e);
                    return candidate;
                }
            }
        }
        warn!(
            "No unused chat ID found after {} attempts; keeping {}",
            CHAT_ID_RETRIES, candidate
        );
        candidate
    }

    fn random_chat_id() -> String {
        rand::rng().random_range(CHAT_ID_MIN..=CHAT_ID_MAX).to_string()
    }
}

#[async_trait]
impl Sweepable for SessionRegistry {
    fn name(&self) -> &'static str {
        "sessions"
    }

    async fn sweep(&self) -> usize {
        self.sessions.sweep().await
    }
}
