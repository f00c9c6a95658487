//! Chat API Handler

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use ops_agent::{complete, new_session_id, InvokeRequest};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: String,
}

/// POST /api/chat - One agent turn
///
/// A body that is not a JSON object with a non-blank `message` is rejected
/// with 400 before the agent is called.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = match request.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Message is required" })),
            )
                .into_response()
        }
    };

    let session_id = state
        .signer
        .session_from_headers(&headers)
        .unwrap_or_else(new_session_id);
    info!(%session_id, "Chat request: {} chars", message.len());

    let request = InvokeRequest::new(session_id.as_str(), message);
    let cookie = [(header::SET_COOKIE, state.signer.set_cookie(&session_id))];
    match complete(state.agent.as_ref(), &request).await {
        Ok(response) => (
            StatusCode::OK,
            cookie,
            Json(ChatResponse {
                response,
                session_id,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(%session_id, "Chat processing failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                cookie,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
