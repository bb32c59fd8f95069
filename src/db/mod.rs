// src/db/mod.rs
//! SQLite pool, schema migrations, and usage analytics.
//!
//! The database is optional at runtime. When `DATABASE_URL` is unset or the
//! connection fails, the service runs on in-memory continuity and this
//! module is simply never constructed.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

const CREATE_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    student_number TEXT,
    chat_id TEXT,
    user_type TEXT NOT NULL DEFAULT 'prospective',
    student_info TEXT,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_active DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    intent TEXT,
    emotional_state TEXT,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
)
"#;

const CREATE_CHAT_CONTINUITY: &str = r#"
CREATE TABLE IF NOT EXISTS chat_continuity (
    chat_id TEXT PRIMARY KEY,
    session_summary TEXT,
    last_session_id TEXT,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const CREATE_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_chat_id ON sessions(chat_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_last_active ON sessions(last_active)",
];

/// Usage counts for the analytics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period_days: u32,
    pub total_sessions: i64,
    pub total_messages: i64,
    pub breakdown: Vec<AnalyticsBucket>,
}

/// One classified-message bucket. Only user messages carry a verdict, so
/// assistant rows never appear here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBucket {
    pub intent: String,
    pub emotional_state: String,
    pub count: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the database and applies migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Counts for the trailing `days` window: totals plus the
    /// intent-by-emotional-state breakdown of classified user messages.
    pub async fn analytics(&self, days: u32) -> Result<AnalyticsReport> {
        let window = format!("-{days} days");

        let totals = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sessions WHERE created_at > datetime('now', ?1))
                    AS total_sessions,
                (SELECT COUNT(*) FROM messages WHERE created_at > datetime('now', ?1))
                    AS total_messages
            "#,
        )
        .bind(&window)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute analytics totals")?;

        let rows = sqlx::query(
            r#"
            SELECT intent, emotional_state, COUNT(*) AS count
            FROM messages
            WHERE created_at > datetime('now', ?1) AND intent IS NOT NULL
            GROUP BY intent, emotional_state
            ORDER BY count DESC
            "#,
        )
        .bind(&window)
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute analytics breakdown")?;

        let breakdown = rows
            .into_iter()
            .map(|row| AnalyticsBucket {
                intent: row.get("intent"),
                emotional_state: row
                    .get::<Option<String>, _>("emotional_state")
                    .unwrap_or_else(|| "neutral".to_string()),
                count: row.get("count"),
            })
            .collect();

        Ok(AnalyticsReport {
            period_days: days,
            total_sessions: totals.get("total_sessions"),
            total_messages: totals.get("total_messages"),
            breakdown,
        })
    }
}

/// Creates every table and index if absent. Safe to run on every startup.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_SESSIONS)
        .execute(pool)
        .await
        .context("Failed to create sessions table")?;
    sqlx::query(CREATE_MESSAGES)
        .execute(pool)
        .await
        .context("Failed to create messages table")?;
    sqlx::query(CREATE_CHAT_CONTINUITY)
        .execute(pool)
        .await
        .context("Failed to create chat_continuity table")?;
    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create index")?;
    }

    info!("✅ Database migrations complete");
    Ok(())
}
