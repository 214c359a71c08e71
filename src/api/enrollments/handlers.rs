use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::enrollment::{CompleteContentRequest, ProgressResponse};
use crate::services::progress;

pub(super) async fn complete_content(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CompleteContentRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let snapshot = progress::mark_complete(&state, &user, &course_id, &payload.content_id).await?;

    Ok(Json(snapshot.into()))
}

pub(super) async fn user_progress(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let snapshot = progress::get_progress(&state, &user, &course_id).await?;

    Ok(Json(snapshot.into()))
}
