#[cfg(test)]
use sqlx::PgPool;

use crate::db::models::Course;

pub(crate) const COLUMNS: &str =
    "id, slug, title, instructor_id, is_active, created_at, updated_at";

#[cfg(test)]
pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) title: &'a str,
    pub(crate) instructor_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Content ids of the course as it is right now, in display order.
pub(crate) async fn list_content_ids(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM course_contents WHERE course_id = $1 ORDER BY order_index, created_at, id",
    )
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn content_exists(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    content_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM course_contents WHERE course_id = $1 AND id = $2)",
    )
    .bind(course_id)
    .bind(content_id)
    .fetch_one(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn create(pool: &PgPool, course: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, slug, title, instructor_id, is_active, created_at, updated_at) \
         VALUES ($1,$2,$3,$4,TRUE,$5,$5) RETURNING {COLUMNS}"
    ))
    .bind(course.id)
    .bind(course.slug)
    .bind(course.title)
    .bind(course.instructor_id)
    .bind(course.created_at)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn create_content(
    pool: &PgPool,
    id: &str,
    course_id: &str,
    title: &str,
    order_index: i32,
    now: time::PrimitiveDateTime,
) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO course_contents (id, course_id, title, order_index, created_at) \
         VALUES ($1,$2,$3,$4,$5) RETURNING id",
    )
    .bind(id)
    .bind(course_id)
    .bind(title)
    .bind(order_index)
    .bind(now)
    .fetch_one(pool)
    .await
}
