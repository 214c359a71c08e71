use sqlx::types::Json;

use crate::db::models::QuizAttempt;
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, course_id, quiz_id, learner_id, attempt_number, status, answers, score, \
    max_score, deadline_at, last_answer_at, submitted_at, created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) learner_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) answers: Vec<Option<i32>>,
    pub(crate) max_score: i32,
    pub(crate) deadline_at: time::PrimitiveDateTime,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Values written by a terminal transition.
pub(crate) struct CloseAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: &'a [Option<i32>],
    pub(crate) score: i32,
    pub(crate) closed_at: time::PrimitiveDateTime,
}

/// Serializes every transition for one (quiz, learner) pair until the
/// surrounding transaction ends.
pub(crate) async fn acquire_quiz_learner_lock(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("quiz_attempt:{quiz_id}:{learner_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!("SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_latest(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts \
         WHERE quiz_id = $1 AND learner_id = $2 \
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(quiz_id)
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

/// Returns `None` when a concurrent start already took the attempt number
/// or the in-progress slot.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "INSERT INTO quiz_attempts (
            id, course_id, quiz_id, learner_id, attempt_number, status, answers,
            max_score, deadline_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
        ON CONFLICT DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(attempt.id)
    .bind(attempt.course_id)
    .bind(attempt.quiz_id)
    .bind(attempt.learner_id)
    .bind(attempt.attempt_number)
    .bind(AttemptStatus::InProgress)
    .bind(Json(attempt.answers))
    .bind(attempt.max_score)
    .bind(attempt.deadline_at)
    .bind(attempt.created_at)
    .fetch_optional(executor)
    .await
}

/// Stores the current selections while the attempt is open and its deadline
/// has not passed. `None` means the attempt is closed or overdue.
pub(crate) async fn record_answers(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    answers: &[Option<i32>],
    now: time::PrimitiveDateTime,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts
         SET answers = $2, last_answer_at = $3, updated_at = $3
         WHERE id = $1 AND status = $4 AND deadline_at > $3
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(Json(answers))
    .bind(now)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Terminal write. Only an in-progress row is touched, so the first
/// transition wins and every later one gets `None`.
pub(crate) async fn close(
    executor: impl sqlx::PgExecutor<'_>,
    params: CloseAttempt<'_>,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts
         SET status = $2, answers = $3, score = $4, submitted_at = $5, updated_at = $5
         WHERE id = $1 AND status = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.status)
    .bind(Json(params.answers))
    .bind(params.score)
    .bind(params.closed_at)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_learner_course(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
    course_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts \
         WHERE learner_id = $1 AND course_id = $2 \
         ORDER BY quiz_id, attempt_number"
    ))
    .bind(learner_id)
    .bind(course_id)
    .fetch_all(executor)
    .await
}

/// In-progress attempts whose deadline is at or before `now`, oldest first.
pub(crate) async fn list_overdue(
    executor: impl sqlx::PgExecutor<'_>,
    now: time::PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts \
         WHERE status = $1 AND deadline_at <= $2 \
         ORDER BY deadline_at LIMIT $3"
    ))
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn shift_deadline(
    pool: &sqlx::PgPool,
    id: &str,
    deadline_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quiz_attempts SET deadline_at = $2 WHERE id = $1")
        .bind(id)
        .bind(deadline_at)
        .execute(pool)
        .await?;
    Ok(())
}
