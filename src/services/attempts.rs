use sqlx::PgConnection;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizAttempt, User};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::services::access;
use crate::services::attempt_lifecycle::{
    self, decide_start, plan_close, ClosePlan, CloseTrigger, StartDecision,
};
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: QuizAttempt,
    pub(crate) quiz: Quiz,
    pub(crate) resumed: bool,
}

#[derive(Debug)]
pub(crate) struct ClosedAttempt {
    pub(crate) attempt: QuizAttempt,
    /// The attempt was already terminal; nothing was written.
    pub(crate) already_recorded: bool,
}

/// Where a terminal transition came from, for logs and metrics.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CloseSource {
    Submit,
    ExpireRequest,
    Start,
    Sweeper,
}

impl CloseSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ExpireRequest => "expire_request",
            Self::Start => "start",
            Self::Sweeper => "sweeper",
        }
    }
}

pub(crate) async fn start(
    state: &AppState,
    learner: &User,
    course_id: &str,
    quiz_id: &str,
) -> ServiceResult<StartedAttempt> {
    access::load_course(state.db(), course_id).await?;

    let mut tx = state.db().begin().await.map_err(ServiceError::db("Failed to start transaction"))?;

    let quiz = repositories::quizzes::find_in_course_for_share(&mut *tx, course_id, quiz_id)
        .await
        .map_err(ServiceError::db("Failed to fetch quiz"))?
        .ok_or_else(|| ServiceError::NotFound("Quiz not found".to_string()))?;
    access::require_active_enrollment(&mut *tx, course_id, &learner.id).await?;

    if quiz.questions.is_empty() {
        return Err(ServiceError::InvalidState("Quiz has no questions".to_string()));
    }

    repositories::attempts::acquire_quiz_learner_lock(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to acquire attempt lock"))?;

    let now = primitive_now_utc();
    let latest = repositories::attempts::find_latest(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to fetch latest attempt"))?;

    let attempt_number = match decide_start(latest.as_ref(), now) {
        StartDecision::Resume => {
            tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;
            let attempt = latest.ok_or_else(|| {
                ServiceError::Conflict("Attempt disappeared while resuming".to_string())
            })?;
            metrics::counter!("quiz_attempts_resumed_total").increment(1);
            tracing::info!(
                attempt_id = %attempt.id,
                learner_id = %learner.id,
                quiz_id,
                "Resumed quiz attempt"
            );
            return Ok(StartedAttempt { attempt, quiz, resumed: true });
        }
        StartDecision::Create { attempt_number, expire_stale } => {
            if let Some(stale) = latest.as_ref().filter(|_| expire_stale) {
                let source = CloseSource::Start;
                close_locked(&mut tx, stale, &quiz, AttemptStatus::Expired, None, now, source)
                    .await?;
            }
            attempt_number
        }
    };

    let question_count = quiz.questions.len();
    let attempt_id = Uuid::new_v4().to_string();
    let created = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            course_id,
            quiz_id,
            learner_id: &learner.id,
            attempt_number,
            answers: vec![None; question_count],
            max_score: question_count as i32,
            deadline_at: now + state.settings().attempts().duration(),
            created_at: now,
        },
    )
    .await
    .map_err(ServiceError::db("Failed to create attempt"))?
    .ok_or_else(|| {
        ServiceError::Conflict("Another attempt was started concurrently; retry".to_string())
    })?;

    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;

    metrics::counter!("quiz_attempts_started_total").increment(1);
    tracing::info!(
        attempt_id = %created.id,
        learner_id = %learner.id,
        quiz_id,
        attempt_number,
        deadline_at = %created.deadline_at,
        "Started quiz attempt"
    );

    Ok(StartedAttempt { attempt: created, quiz, resumed: false })
}

/// Auto-save of the current selections on the open attempt.
pub(crate) async fn record_answer(
    state: &AppState,
    learner: &User,
    course_id: &str,
    quiz_id: &str,
    selection: Vec<Option<i32>>,
) -> ServiceResult<QuizAttempt> {
    if selection.iter().all(Option::is_none) {
        return Err(ServiceError::Validation(
            "selected_index or answers is required".to_string(),
        ));
    }

    let (mut tx, quiz) = open_transition(state, learner, course_id, quiz_id).await?;
    attempt_lifecycle::validate_selection(&quiz.questions, &selection)?;

    let now = primitive_now_utc();
    let latest = repositories::attempts::find_latest(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to fetch latest attempt"))?;
    let open = match latest {
        Some(attempt) if attempt.status == AttemptStatus::InProgress => attempt,
        _ => return Err(ServiceError::InvalidState("No attempt in progress".to_string())),
    };
    if attempt_lifecycle::is_overdue(&open, now) {
        return Err(ServiceError::InvalidState("Attempt deadline has passed".to_string()));
    }

    let merged = attempt_lifecycle::merge_answers(&open.answers, &selection, quiz.questions.len());
    let saved = repositories::attempts::record_answers(&mut *tx, &open.id, &merged, now)
        .await
        .map_err(ServiceError::db("Failed to record answers"))?
        .ok_or_else(|| ServiceError::InvalidState("Attempt is no longer open".to_string()))?;

    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;

    tracing::debug!(attempt_id = %saved.id, learner_id = %learner.id, "Recorded answers");
    Ok(saved)
}

pub(crate) async fn submit(
    state: &AppState,
    learner: &User,
    course_id: &str,
    quiz_id: &str,
    selection: Vec<Option<i32>>,
) -> ServiceResult<ClosedAttempt> {
    let (mut tx, quiz) = open_transition(state, learner, course_id, quiz_id).await?;
    attempt_lifecycle::validate_selection(&quiz.questions, &selection)?;

    let now = primitive_now_utc();
    let latest = repositories::attempts::find_latest(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to fetch latest attempt"))?;

    let closed = match (plan_close(latest.as_ref(), CloseTrigger::Learner, now), latest) {
        (ClosePlan::Submit, Some(open)) => {
            close_locked(
                &mut tx,
                &open,
                &quiz,
                AttemptStatus::Submitted,
                Some(selection.as_slice()),
                now,
                CloseSource::Submit,
            )
            .await?
        }
        (ClosePlan::Expire, Some(open)) => {
            // Late answers are ignored; the recorded ones are scored.
            let source = CloseSource::Submit;
            close_locked(&mut tx, &open, &quiz, AttemptStatus::Expired, None, now, source).await?
        }
        (ClosePlan::AlreadyClosed, Some(done)) => {
            ClosedAttempt { attempt: done, already_recorded: true }
        }
        _ => {
            return Err(ServiceError::InvalidState(
                "No attempt to submit; start the quiz first".to_string(),
            ))
        }
    };

    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;
    Ok(closed)
}

/// Client-reported timeout. The server clock decides whether the deadline
/// has really passed.
pub(crate) async fn expire(
    state: &AppState,
    learner: &User,
    course_id: &str,
    quiz_id: &str,
) -> ServiceResult<ClosedAttempt> {
    let (mut tx, quiz) = open_transition(state, learner, course_id, quiz_id).await?;

    let now = primitive_now_utc();
    let latest = repositories::attempts::find_latest(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to fetch latest attempt"))?;

    let closed = match (plan_close(latest.as_ref(), CloseTrigger::Deadline, now), latest) {
        (ClosePlan::Expire, Some(open)) => {
            close_locked(
                &mut tx,
                &open,
                &quiz,
                AttemptStatus::Expired,
                None,
                now,
                CloseSource::ExpireRequest,
            )
            .await?
        }
        (ClosePlan::AlreadyClosed, Some(done)) => {
            ClosedAttempt { attempt: done, already_recorded: true }
        }
        (ClosePlan::NotYetDue { remaining_seconds }, _) => {
            return Err(ServiceError::InvalidState(format!(
                "Attempt deadline has not passed; {remaining_seconds} seconds remaining"
            )))
        }
        _ => return Err(ServiceError::InvalidState("No attempt to expire".to_string())),
    };

    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;
    Ok(closed)
}

/// Expires one overdue attempt found by a scan. Returns `None` when another
/// transition got there first or the attempt is not overdue any more.
pub(crate) async fn expire_overdue_attempt(
    state: &AppState,
    candidate: &QuizAttempt,
    now: PrimitiveDateTime,
    source: CloseSource,
) -> ServiceResult<Option<ClosedAttempt>> {
    let mut tx = state.db().begin().await.map_err(ServiceError::db("Failed to start transaction"))?;

    repositories::attempts::acquire_quiz_learner_lock(
        &mut *tx,
        &candidate.quiz_id,
        &candidate.learner_id,
    )
    .await
    .map_err(ServiceError::db("Failed to acquire attempt lock"))?;

    let current = repositories::attempts::find_by_id(&mut *tx, &candidate.id)
        .await
        .map_err(ServiceError::db("Failed to fetch attempt"))?;
    let Some(current) = current else {
        return Ok(None);
    };
    if current.status.is_terminal() || !attempt_lifecycle::is_overdue(&current, now) {
        return Ok(None);
    }

    let quiz =
        repositories::quizzes::find_in_course(&mut *tx, &current.course_id, &current.quiz_id)
            .await
            .map_err(ServiceError::db("Failed to fetch quiz"))?
            .ok_or_else(|| ServiceError::NotFound("Quiz not found".to_string()))?;

    let closed =
        close_locked(&mut tx, &current, &quiz, AttemptStatus::Expired, None, now, source).await?;
    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;

    Ok((!closed.already_recorded).then_some(closed))
}

/// One sweeper pass over a bounded batch of overdue attempts. Failures on a
/// single attempt are logged and the pass continues.
pub(crate) async fn sweep_expired(state: &AppState) -> ServiceResult<usize> {
    let now = primitive_now_utc();
    let limit = state.settings().attempts().expiry_sweep_batch_size as i64;
    let overdue = repositories::attempts::list_overdue(state.db(), now, limit)
        .await
        .map_err(ServiceError::db("Failed to list overdue attempts"))?;

    let mut closed = 0;
    for attempt in &overdue {
        match expire_overdue_attempt(state, attempt, now, CloseSource::Sweeper).await {
            Ok(Some(_)) => closed += 1,
            Ok(None) => {}
            Err(err) => {
                tracing::error!(attempt_id = %attempt.id, error = %err, "Failed to expire attempt");
            }
        }
    }
    Ok(closed)
}

/// Opens the transaction shared by submit, expire and record_answer: checks
/// course, quiz and enrollment, then takes the (quiz, learner) lock.
async fn open_transition(
    state: &AppState,
    learner: &User,
    course_id: &str,
    quiz_id: &str,
) -> ServiceResult<(sqlx::Transaction<'static, sqlx::Postgres>, Quiz)> {
    access::load_course(state.db(), course_id).await?;

    let mut tx = state.db().begin().await.map_err(ServiceError::db("Failed to start transaction"))?;

    let quiz = repositories::quizzes::find_in_course(&mut *tx, course_id, quiz_id)
        .await
        .map_err(ServiceError::db("Failed to fetch quiz"))?
        .ok_or_else(|| ServiceError::NotFound("Quiz not found".to_string()))?;
    access::require_active_enrollment(&mut *tx, course_id, &learner.id).await?;

    repositories::attempts::acquire_quiz_learner_lock(&mut *tx, quiz_id, &learner.id)
        .await
        .map_err(ServiceError::db("Failed to acquire attempt lock"))?;

    Ok((tx, quiz))
}

/// Applies a terminal transition while the (quiz, learner) lock is held.
/// `sent` answers from a submit are scored exactly as given, unanswered
/// positions counting 0; `None` scores the last recorded answers.
async fn close_locked(
    conn: &mut PgConnection,
    attempt: &QuizAttempt,
    quiz: &Quiz,
    status: AttemptStatus,
    sent: Option<&[Option<i32>]>,
    now: PrimitiveDateTime,
    source: CloseSource,
) -> ServiceResult<ClosedAttempt> {
    let answers = attempt_lifecycle::pad_answers(
        sent.unwrap_or(attempt.answers.as_slice()),
        quiz.questions.len(),
    );
    let score = attempt_lifecycle::score(&quiz.questions, &answers);

    let closed = repositories::attempts::close(
        &mut *conn,
        repositories::attempts::CloseAttempt {
            id: &attempt.id,
            status,
            answers: &answers,
            score,
            closed_at: now,
        },
    )
    .await
    .map_err(ServiceError::db("Failed to close attempt"))?;

    let Some(closed) = closed else {
        let current = repositories::attempts::find_by_id(&mut *conn, &attempt.id)
            .await
            .map_err(ServiceError::db("Failed to fetch attempt"))?
            .ok_or_else(|| ServiceError::NotFound("Attempt not found".to_string()))?;
        return Ok(ClosedAttempt { attempt: current, already_recorded: true });
    };

    metrics::counter!(
        "quiz_attempts_closed_total",
        "status" => status.as_str(),
        "trigger" => source.as_str()
    )
    .increment(1);
    tracing::info!(
        attempt_id = %closed.id,
        learner_id = %closed.learner_id,
        quiz_id = %closed.quiz_id,
        status = status.as_str(),
        score,
        max_score = closed.max_score,
        trigger = source.as_str(),
        "Closed quiz attempt"
    );

    Ok(ClosedAttempt { attempt: closed, already_recorded: false })
}
