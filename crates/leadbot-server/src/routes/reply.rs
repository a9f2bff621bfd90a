use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use leadbot::errors::ConversationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
struct ReplyRequest {
    #[serde(default)]
    thread_id: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ReplyResponse {
    thread_id: String,
    reply: String,
    iterations: usize,
    tools: Vec<String>,
    fallback: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

fn error_response(status: StatusCode, error: String, reply: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, reply })).into_response()
}

async fn reply_handler(
    State(state): State<AppState>,
    Json(request): Json<ReplyRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "message must not be empty".to_string(),
            None,
        );
    }

    let thread_id = request
        .thread_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::info!(%thread_id, "received reply request");

    match state.agent.turn(&thread_id, &request.message).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ReplyResponse {
                thread_id,
                reply: outcome.reply,
                iterations: outcome.iterations,
                tools: outcome.tools_invoked,
                fallback: outcome.fallback,
            }),
        )
            .into_response(),
        Err(e @ ConversationError::ThreadCorrupted { .. }) => {
            error_response(StatusCode::CONFLICT, e.to_string(), None)
        }
        Err(e) => {
            tracing::error!(%thread_id, error = %e, "turn failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                Some(e.fallback_reply().to_string()),
            )
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reply", post(reply_handler))
        .with_state(state)
}
