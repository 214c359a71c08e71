mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/issue/:course_id", post(handlers::issue_certificate))
        .route(
            "/issue/:course_id/students/:student_id",
            post(handlers::issue_certificate_for_student),
        )
        .route("/verify/:certificate_id", get(handlers::verify_certificate))
        .route("/download/:certificate_id", get(handlers::download_certificate))
        .route("/my", get(handlers::list_my_certificates))
}
