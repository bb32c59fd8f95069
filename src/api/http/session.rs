// src/api/http/session.rs

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::memory::StoredMessage;
use crate::session::{StudentInfo, UserType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub user_type: UserType,
    pub student_info: StudentInfo,
    pub greeting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_history: Option<Vec<StoredMessage>>,
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Json<CreateSessionResponse>> {
    let has_name = request.name.as_deref().is_some_and(|n| !n.trim().is_empty());
    let has_chat_id = request.chat_id.as_deref().is_some_and(|c| !c.trim().is_empty());
    if !has_name && !has_chat_id {
        return Err(ApiError::bad_request("Name is required"));
    }

    let created = state
        .registry
        .create(
            request.name.as_deref(),
            request.student_number.as_deref(),
            request.chat_id.as_deref(),
        )
        .await;
    let session = created.session;

    // A chat ID that recovered no identity cannot name the student either.
    if session.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    info!(
        "✅ Session {} created for {} ({})",
        session.session_id,
        session.name,
        session.user_type.as_str()
    );

    let greeting = if session.previous_context.is_some() {
        format!(
            "Welcome back {}! I remember our previous conversation. How can I help you today?",
            session.name
        )
    } else {
        format!(
            "Hi {}! I'm Juno, Northfield's assistant for remote students. How can I help you today?",
            session.name
        )
    };

    Ok(Json(CreateSessionResponse {
        session_id: session.session_id,
        user_type: session.user_type,
        student_info: session.student_info,
        greeting,
        previous_context: session.previous_context,
        message_history: (!created.recovered_history.is_empty())
            .then_some(created.recovered_history),
    }))
}
