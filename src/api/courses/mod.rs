mod handlers;

use axum::{routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:course_id/quizzes/:quiz_id/questions", put(handlers::replace_questions))
}

#[cfg(test)]
mod tests;
