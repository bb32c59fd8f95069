// src/api/http/chat.rs

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::api::error::ApiError;
use crate::llm::intent::{EmotionalState, Intent};
use crate::services::{ChatError, IncomingMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub chat_id: String,
    pub intent: Intent,
    pub emotional_state: EmotionalState,
    pub escalation_required: bool,
    pub timestamp: DateTime<Utc>,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let outcome = state
        .chat
        .handle_message(IncomingMessage {
            session_id: request.session_id.as_deref(),
            message: request.message.as_deref().unwrap_or(""),
            name: request.name.as_deref(),
            student_number: request.student_number.as_deref(),
            chat_id: request.chat_id.as_deref(),
        })
        .await;

    match outcome {
        Ok(outcome) => Json(ChatResponse {
            response: outcome.response,
            session_id: outcome.session_id,
            chat_id: outcome.chat_id,
            intent: outcome.intent,
            emotional_state: outcome.emotional_state,
            escalation_required: outcome.escalation_required,
            timestamp: outcome.timestamp,
        })
        .into_response(),
        Err(e @ ChatError::EmptyMessage) => ApiError::bad_request(e.to_string()).into_response(),
        Err(e @ ChatError::SessionNotFound) => ApiError::not_found(e.to_string()).into_response(),
        Err(ChatError::Internal(e)) => {
            error!("Chat pipeline failed: {e:#}");
            apology_response(&state)
        }
    }
}

/// The chat endpoint's 500 carries an apology the client can render in the
/// chat window, not the bare error shape the other endpoints use.
fn apology_response(state: &AppState) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "I apologize, but I encountered an error processing your message.",
            "response": format!(
                "I'm having technical difficulties right now. Please try again in a moment, \
                 or contact Northfield Student Services at {} for immediate assistance.",
                state.config.support_email
            ),
        })),
    )
        .into_response()
}
