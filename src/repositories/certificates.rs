use sqlx::PgPool;

use crate::db::models::Certificate;

pub(crate) const COLUMNS: &str = "id, course_id, learner_id, issued_by, fingerprint, issued_at";

pub(crate) struct CreateCertificate<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) learner_id: &'a str,
    pub(crate) issued_by: &'a str,
    pub(crate) fingerprint: &'a str,
    pub(crate) issued_at: time::PrimitiveDateTime,
}

/// A certificate joined with the names printed on it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CertificateView {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) learner_id: String,
    pub(crate) learner_name: String,
    pub(crate) instructor_id: String,
    pub(crate) fingerprint: String,
    pub(crate) issued_at: time::PrimitiveDateTime,
}

const VIEW_SELECT: &str = "\
    SELECT c.id, c.course_id, co.title AS course_title, c.learner_id, \
           u.full_name AS learner_name, co.instructor_id, c.fingerprint, c.issued_at \
    FROM certificates c \
    JOIN courses co ON co.id = c.course_id \
    JOIN users u ON u.id = c.learner_id";

pub(crate) async fn find_by_learner_course(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
    course_id: &str,
) -> Result<Option<Certificate>, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {COLUMNS} FROM certificates WHERE learner_id = $1 AND course_id = $2"
    ))
    .bind(learner_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

/// Inserts unless a certificate for (learner, course) already exists, then
/// returns whichever row survived.
pub(crate) async fn insert_if_absent(
    pool: &PgPool,
    certificate: CreateCertificate<'_>,
) -> Result<(Certificate, bool), sqlx::Error> {
    let inserted = sqlx::query_as::<_, Certificate>(&format!(
        "INSERT INTO certificates (id, course_id, learner_id, issued_by, fingerprint, issued_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         ON CONFLICT (learner_id, course_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(certificate.id)
    .bind(certificate.course_id)
    .bind(certificate.learner_id)
    .bind(certificate.issued_by)
    .bind(certificate.fingerprint)
    .bind(certificate.issued_at)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok((row, true));
    }

    let existing =
        find_by_learner_course(pool, certificate.learner_id, certificate.course_id).await?;
    existing.map(|row| (row, false)).ok_or(sqlx::Error::RowNotFound)
}

pub(crate) async fn find_view(
    pool: &PgPool,
    id: &str,
) -> Result<Option<CertificateView>, sqlx::Error> {
    sqlx::query_as::<_, CertificateView>(&format!("{VIEW_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_views_by_learner(
    pool: &PgPool,
    learner_id: &str,
) -> Result<Vec<CertificateView>, sqlx::Error> {
    sqlx::query_as::<_, CertificateView>(&format!(
        "{VIEW_SELECT} WHERE c.learner_id = $1 ORDER BY c.issued_at DESC, c.id"
    ))
    .bind(learner_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn count_for_learner_course(
    pool: &PgPool,
    learner_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM certificates WHERE learner_id = $1 AND course_id = $2")
        .bind(learner_id)
        .bind(course_id)
        .fetch_one(pool)
        .await
}
