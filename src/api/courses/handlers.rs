use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::quiz::{QuizResponse, ReplaceQuestionsRequest};
use crate::services::quiz_authoring;

pub(super) async fn replace_questions(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ReplaceQuestionsRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let quiz = quiz_authoring::replace_questions(
        &state,
        &user,
        &course_id,
        &quiz_id,
        payload.into_questions(),
    )
    .await?;

    Ok(Json(QuizResponse::from_db(quiz)))
}
