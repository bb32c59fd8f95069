// src/continuity/durable.rs
//! Database-backed continuity. Records survive restarts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use super::{CompletedExchange, ContinuityStore, RecoveredConversation};

pub struct DurableContinuityStore {
    pool: SqlitePool,
}

impl DurableContinuityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContinuityStore for DurableContinuityStore {
    fn is_durable(&self) -> bool {
        true
    }

    /// Two sequential lookups: the continuity row for the summary, then the
    /// most recent session row under the same chat ID for identity. History
    /// is never reconstructed from message rows; the summary is the carrier
    /// of past context.
    async fn recover(&self, chat_id: &str) -> Result<Option<RecoveredConversation>> {
        let continuity = sqlx::query(
            "SELECT session_summary FROM chat_continuity WHERE chat_id = ?1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up chat continuity")?;

        let Some(continuity) = continuity else {
            return Ok(None);
        };

        let summary = continuity
            .get::<Option<String>, _>("session_summary")
            .filter(|s| !s.trim().is_empty());

        let identity = sqlx::query(
            "SELECT name, student_number FROM sessions
             WHERE chat_id = ?1
             ORDER BY last_active DESC
             LIMIT 1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up session identity")?;

        let (name, student_number) = match identity {
            Some(row) => (
                Some(row.get::<String, _>("name")).filter(|n| !n.is_empty()),
                row.get::<Option<String>, _>("student_number"),
            ),
            None => (None, None),
        };

        Ok(Some(RecoveredConversation {
            summary,
            name,
            student_number,
            history: Vec::new(),
        }))
    }

    async fn chat_id_exists(&self, chat_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_continuity WHERE chat_id = ?1")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check chat ID")?;
        Ok(count > 0)
    }

    async fn persist_exchange(&self, exchange: &CompletedExchange<'_>) -> Result<()> {
        let session = exchange.session;
        let student_info = serde_json::to_string(&session.student_info)
            .context("Failed to serialize student info")?;

        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_id, name, student_number, chat_id, user_type, student_info, last_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
            ON CONFLICT(session_id) DO UPDATE SET
                chat_id = excluded.chat_id,
                last_active = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.name)
        .bind(&session.student_number)
        .bind(exchange.chat_id)
        .bind(session.user_type.as_str())
        .bind(student_info)
        .execute(&self.pool)
        .await
        .context("Failed to upsert session")?;

        // Only the user row carries the classification verdict; assistant
        // rows would double every analytics bucket.
        sqlx::query(
            "INSERT INTO messages (session_id, role, content, intent, emotional_state)
             VALUES (?1, 'user', ?2, ?3, ?4)",
        )
        .bind(&session.session_id)
        .bind(exchange.user_message)
        .bind(exchange.descriptor.intent.as_str())
        .bind(exchange.descriptor.emotional_state.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert user message")?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content) VALUES (?1, 'assistant', ?2)",
        )
        .bind(&session.session_id)
        .bind(exchange.assistant_message)
        .execute(&self.pool)
        .await
        .context("Failed to insert assistant message")?;

        // An empty summary never clobbers the one a previous session
        // produced under this chat ID.
        let summary = (!exchange.summary.is_empty()).then_some(exchange.summary);
        sqlx::query(
            r#"
            INSERT INTO chat_continuity (chat_id, session_summary, last_session_id, updated_at)
            VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT(chat_id) DO UPDATE SET
                session_summary = COALESCE(excluded.session_summary, chat_continuity.session_summary),
                last_session_id = excluded.last_session_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(exchange.chat_id)
        .bind(summary)
        .bind(&session.session_id)
        .execute(&self.pool)
        .await
        .context("Failed to upsert chat continuity")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::Database;
    use crate::llm::intent::IntentDescriptor;
    use crate::session::{Session, StudentInfo, UserType};

    use super::*;

    async fn store() -> (Database, DurableContinuityStore) {
        let db = Database::connect("sqlite::memory:", 1).await.expect("database");
        let store = DurableContinuityStore::new(db.pool().clone());
        (db, store)
    }

    fn session(session_id: &str, name: &str) -> Session {
        Session {
            session_id: session_id.to_string(),
            name: name.to_string(),
            student_number: Some("400127653".to_string()),
            chat_id: Some("40111".to_string()),
            user_type: UserType::Current,
            student_info: StudentInfo::unknown(),
            previous_context: None,
            created_at: Utc::now(),
        }
    }

    fn exchange<'a>(
        session: &'a Session,
        descriptor: &'a IntentDescriptor,
        summary: &'a str,
    ) -> CompletedExchange<'a> {
        CompletedExchange {
            session,
            chat_id: "40111",
            user_message: "How do I drop a course?",
            assistant_message: "Here is how you drop a course.",
            descriptor,
            summary,
            history: &[],
        }
    }

    #[tokio::test]
    async fn unknown_chat_id_recovers_nothing() {
        let (_db, store) = store().await;
        assert!(store.recover("49999").await.unwrap().is_none());
        assert!(!store.chat_id_exists("49999").await.unwrap());
    }

    #[tokio::test]
    async fn persisted_exchange_is_recoverable_with_identity() {
        let (_db, store) = store().await;
        let session = session("s1", "Alex");
        let descriptor = IntentDescriptor::default();

        store
            .persist_exchange(&exchange(&session, &descriptor, "Asked about dropping a course."))
            .await
            .unwrap();

        assert!(store.chat_id_exists("40111").await.unwrap());

        let recovered = store.recover("40111").await.unwrap().expect("record");
        assert_eq!(recovered.summary.as_deref(), Some("Asked about dropping a course."));
        assert_eq!(recovered.name.as_deref(), Some("Alex"));
        assert_eq!(recovered.student_number.as_deref(), Some("400127653"));
        // Durable recovery carries no inline history; the summary is the context.
        assert!(recovered.history.is_empty());
    }

    #[tokio::test]
    async fn empty_summary_does_not_erase_a_previous_one() {
        let (_db, store) = store().await;
        let first = session("s1", "Alex");
        let descriptor = IntentDescriptor::default();

        store
            .persist_exchange(&exchange(&first, &descriptor, "Talked about fees."))
            .await
            .unwrap();

        // A resumed conversation's first exchange is below the summary
        // threshold and persists an empty summary.
        let second = session("s2", "Alex");
        store.persist_exchange(&exchange(&second, &descriptor, "")).await.unwrap();

        let recovered = store.recover("40111").await.unwrap().expect("record");
        assert_eq!(recovered.summary.as_deref(), Some("Talked about fees."));
    }

    #[tokio::test]
    async fn identity_comes_from_the_most_recent_session() {
        let (db, store) = store().await;
        let descriptor = IntentDescriptor::default();

        let first = session("s1", "Alex");
        store.persist_exchange(&exchange(&first, &descriptor, "one")).await.unwrap();

        // Backdate the first session so ordering by last_active is decisive.
        sqlx::query(
            "UPDATE sessions SET last_active = datetime('now', '-1 hour') WHERE session_id = 's1'",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let mut second = session("s2", "Alexandra");
        second.student_number = Some("400999999".to_string());
        store.persist_exchange(&exchange(&second, &descriptor, "two")).await.unwrap();

        let recovered = store.recover("40111").await.unwrap().expect("record");
        assert_eq!(recovered.name.as_deref(), Some("Alexandra"));
        assert_eq!(recovered.student_number.as_deref(), Some("400999999"));
    }

    #[tokio::test]
    async fn messages_record_the_verdict_on_the_user_row() {
        let (db, store) = store().await;
        let session = session("s1", "Alex");
        let descriptor = IntentDescriptor {
            intent: crate::llm::intent::Intent::CourseQuestion,
            emotional_state: crate::llm::intent::EmotionalState::Stressed,
            ..Default::default()
        };

        store.persist_exchange(&exchange(&session, &descriptor, "")).await.unwrap();

        let rows = sqlx::query("SELECT role, intent, emotional_state FROM messages ORDER BY id")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String, _>("role"), "user");
        assert_eq!(rows[0].get::<Option<String>, _>("intent").as_deref(), Some("course_question"));
        assert_eq!(
            rows[0].get::<Option<String>, _>("emotional_state").as_deref(),
            Some("stressed")
        );
        assert_eq!(rows[1].get::<String, _>("role"), "assistant");
        assert_eq!(rows[1].get::<Option<String>, _>("intent"), None);
    }

    #[tokio::test]
    async fn stores_sharing_a_pool_see_each_other() {
        let (db, store_a) = store().await;
        let store_b = DurableContinuityStore::new(db.pool().clone());
        let session = session("s1", "Alex");
        let descriptor = IntentDescriptor::default();

        store_a.persist_exchange(&exchange(&session, &descriptor, "shared")).await.unwrap();
        assert!(store_b.chat_id_exists("40111").await.unwrap());
    }
}
