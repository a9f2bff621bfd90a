use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use leadbot::models::message::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
struct ThreadResponse {
    thread_id: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ListThreadsResponse {
    threads: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn get_thread(State(state): State<AppState>, Path(thread_id): Path<String>) -> Response {
    let store = state.agent.store();
    if !store.contains(&thread_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Thread '{}' not found", thread_id),
            }),
        )
            .into_response();
    }

    let messages = store.snapshot(&thread_id);
    (
        StatusCode::OK,
        Json(ThreadResponse {
            thread_id,
            messages,
        }),
    )
        .into_response()
}

async fn list_threads(State(state): State<AppState>) -> Json<ListThreadsResponse> {
    Json(ListThreadsResponse {
        threads: state.agent.store().thread_ids(),
    })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/threads", get(list_threads))
        .route("/threads/:thread_id", get(get_thread))
        .with_state(state)
}
