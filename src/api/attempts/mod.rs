mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(handlers::start_attempt))
        .route("/answer", post(handlers::save_answer))
        .route("/submit", post(handlers::submit_attempt))
        .route("/expire", post(handlers::expire_attempt))
        .route("/my", get(handlers::list_my_attempts))
}
