use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
struct StatusResponse {
    status: String,
    knowledge: String,
    tools: Vec<String>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let knowledge = if state.knowledge_available {
        "available"
    } else {
        "unavailable"
    };
    Json(StatusResponse {
        status: "ok".to_string(),
        knowledge: knowledge.to_string(),
        tools: state.agent.tools().into_iter().map(|t| t.name).collect(),
    })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state)
}
