use sqlx::types::Json;

use crate::db::models::{Quiz, QuizQuestion};

pub(crate) const COLUMNS: &str =
    "id, course_id, title, order_index, questions, created_at, updated_at";

#[cfg(test)]
pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) order_index: i32,
    pub(crate) questions: Vec<QuizQuestion>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn find_in_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    quiz_id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND course_id = $2"
    ))
    .bind(quiz_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

/// Shared row lock: attempts may start concurrently, but not while the
/// question set is being replaced.
pub(crate) async fn find_in_course_for_share(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    quiz_id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND course_id = $2 FOR SHARE"
    ))
    .bind(quiz_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_course_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    quiz_id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND course_id = $2 FOR UPDATE"
    ))
    .bind(quiz_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY order_index, created_at, id"
    ))
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn has_attempts(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quiz_attempts WHERE quiz_id = $1)")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn replace_questions(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    questions: &[QuizQuestion],
    now: time::PrimitiveDateTime,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET questions = $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(quiz_id)
    .bind(Json(questions))
    .bind(now)
    .fetch_one(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn create(
    pool: &sqlx::PgPool,
    quiz: CreateQuiz<'_>,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (id, course_id, title, order_index, questions, created_at, updated_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$6) RETURNING {COLUMNS}"
    ))
    .bind(quiz.id)
    .bind(quiz.course_id)
    .bind(quiz.title)
    .bind(quiz.order_index)
    .bind(Json(quiz.questions))
    .bind(quiz.created_at)
    .fetch_one(pool)
    .await
}
