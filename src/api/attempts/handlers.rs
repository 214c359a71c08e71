use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    AnswerSavedResponse, AttemptResultResponse, AttemptSelectionRequest, AttemptStartResponse,
    HistoryQuery, QuizHistoryItem, QuizTargetRequest,
};
use crate::services::{attempt_history, attempt_lifecycle, attempts};

pub(super) async fn start_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizTargetRequest>,
) -> Result<(StatusCode, Json<AttemptStartResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let started = attempts::start(&state, &user, &payload.course_id, &payload.quiz_id).await?;
    let status = if started.resumed { StatusCode::OK } else { StatusCode::CREATED };

    Ok((status, Json(AttemptStartResponse::from_started(started, primitive_now_utc()))))
}

pub(super) async fn save_answer(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptSelectionRequest>,
) -> Result<Json<AnswerSavedResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let interval = state.settings().attempts().answer_save_interval_seconds;
    let rate_key = format!("answers:{}:{}", payload.quiz_id, user.id);
    let allowed = state.redis().rate_limit(&rate_key, 1, interval).await.unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Answers are being saved too often"));
    }

    let selection =
        attempt_lifecycle::normalize_selection(payload.selected_index, payload.answers)?;
    let saved =
        attempts::record_answer(&state, &user, &payload.course_id, &payload.quiz_id, selection)
            .await?;

    Ok(Json(AnswerSavedResponse::from_db(saved, primitive_now_utc())))
}

pub(super) async fn submit_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptSelectionRequest>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let selection =
        attempt_lifecycle::normalize_selection(payload.selected_index, payload.answers)?;
    let closed =
        attempts::submit(&state, &user, &payload.course_id, &payload.quiz_id, selection).await?;

    Ok(Json(AttemptResultResponse::from_closed(closed)))
}

pub(super) async fn expire_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizTargetRequest>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let closed = attempts::expire(&state, &user, &payload.course_id, &payload.quiz_id).await?;

    Ok(Json(AttemptResultResponse::from_closed(closed)))
}

pub(super) async fn list_my_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<QuizHistoryItem>>, ApiError> {
    query.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let entries = attempt_history::load_history(&state, &user, &query.course_id).await?;

    Ok(Json(entries.into_iter().map(QuizHistoryItem::from_entry).collect()))
}
