#[cfg(test)]
use sqlx::PgPool;
#[cfg(test)]
use uuid::Uuid;

use crate::db::models::Enrollment;
#[cfg(test)]
use crate::db::types::EnrollmentStatus;

pub(crate) const COLUMNS: &str = "\
    id, course_id, learner_id, status, completed_content, progress, \
    completed_at, enrolled_at, updated_at";

pub(crate) async fn find_for_learner_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    learner_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE course_id = $1 AND learner_id = $2"
    ))
    .bind(course_id)
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Set-union of one content id into the completed set. Concurrent completions
/// of different units both survive; a repeated id leaves the row untouched.
pub(crate) async fn add_completed_content(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    content_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET completed_content = CASE
                WHEN $2 = ANY(completed_content) THEN completed_content
                ELSE array_append(completed_content, $2)
             END,
             updated_at = CASE
                WHEN $2 = ANY(completed_content) THEN updated_at
                ELSE $3
             END
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(content_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Stores the last computed percentage. `completed_at` is stamped the first
/// time the learner reaches 100 and kept afterwards.
pub(crate) async fn store_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    progress: i32,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE enrollments
         SET progress = $2,
             completed_at = CASE
                WHEN $2 = 100 THEN COALESCE(completed_at, $3)
                ELSE completed_at
             END
         WHERE id = $1",
    )
    .bind(id)
    .bind(progress)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn enroll(
    pool: &PgPool,
    course_id: &str,
    learner_id: &str,
    status: EnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (id, course_id, learner_id, status, enrolled_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT (course_id, learner_id) DO UPDATE SET status = EXCLUDED.status
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(course_id)
    .bind(learner_id)
    .bind(status)
    .bind(now)
    .fetch_one(pool)
    .await
}
