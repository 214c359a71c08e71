mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id/complete-content", post(handlers::complete_content))
        .route("/:course_id/user-progress", get(handlers::user_progress))
}
