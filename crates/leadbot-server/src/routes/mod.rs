pub mod reply;
pub mod status;
pub mod threads;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(reply::routes(state.clone()))
        .merge(threads::routes(state.clone()))
        .merge(status::routes(state))
}
