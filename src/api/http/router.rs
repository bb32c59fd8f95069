// src/api/http/router.rs

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

use super::chat::chat_handler;
use super::handlers::{
    all_contacts_handler, analytics_handler, contact_handler, health_handler, history_handler,
    root_handler,
};
use super::session::create_session_handler;

/// Builds the HTTP surface: session bootstrap, the chat pipeline, and the
/// read-only lookups (history, contacts, analytics).
pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/session", post(create_session_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/history/{session_id}", get(history_handler))
        .route("/api/contacts", get(all_contacts_handler))
        .route("/api/contacts/{category}", get(contact_handler))
        .route("/api/analytics", get(analytics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN {origin:?}, falling back to any origin");
            layer.allow_origin(Any)
        }
    }
}
