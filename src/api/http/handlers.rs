// src/api/http/handlers.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::{ApiError, ApiResult, IntoApiError};
use crate::db::AnalyticsReport;
use crate::escalation::ContactRecord;
use crate::session::UserType;
use crate::state::AppState;

pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "Juno - Northfield Remote Student Support",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "session": "POST /api/session",
            "chat": "POST /api/chat",
            "history": "GET /api/history/{sessionId}",
            "contacts": "GET /api/contacts/{category}",
            "analytics": "GET /api/analytics",
            "health": "GET /health",
        },
    }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let continuity = if state.continuity.is_durable() {
        "durable"
    } else {
        "in-memory"
    };
    Json(json!({
        "status": "healthy",
        "service": "juno",
        "version": env!("CARGO_PKG_VERSION"),
        "continuity": continuity,
        "timestamp": Utc::now(),
    }))
}

/// Unknown session IDs report an empty history rather than a 404; the
/// client polls this endpoint before the first exchange lands.
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    let history = state.memory.full(&session_id).await;
    let stats = state.memory.stats(&session_id).await;
    Json(json!({
        "history": history,
        "stats": stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    #[serde(rename = "userType")]
    pub user_type: Option<String>,
}

impl ContactQuery {
    fn user_type(&self) -> UserType {
        match self.user_type.as_deref() {
            Some("prospective") => UserType::Prospective,
            _ => UserType::Current,
        }
    }
}

pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(query): Query<ContactQuery>,
) -> Json<ContactRecord> {
    Json(state.contacts.contact(&category, query.user_type()).clone())
}

pub async fn all_contacts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContactQuery>,
) -> Json<BTreeMap<&'static str, ContactRecord>> {
    let contacts = state
        .contacts
        .all(query.user_type())
        .into_iter()
        .map(|(category, record)| (category, record.clone()))
        .collect();
    Json(contacts)
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsReport>> {
    let Some(database) = &state.database else {
        return Err(ApiError::service_unavailable(
            "Analytics requires the database backend",
        ));
    };
    let days = query.days.unwrap_or(7).clamp(1, 365);
    let report = database
        .analytics(days)
        .await
        .into_api_error("Failed to compute analytics")?;
    Ok(Json(report))
}
