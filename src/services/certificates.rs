use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Course, Enrollment, User};
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::repositories::certificates::CertificateView;
use crate::services::access;
use crate::services::certificate_pdf;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::progress::ProgressSnapshot;

const ID_PREFIX: &str = "CC-";
const ID_RANDOM_BYTES: usize = 18;

#[derive(Debug)]
pub(crate) struct IssuedCertificate {
    pub(crate) certificate: CertificateView,
    pub(crate) created: bool,
}

/// Opaque, unguessable certificate id.
pub(crate) fn new_certificate_id() -> String {
    let mut bytes = [0u8; ID_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{ID_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

pub(crate) fn is_well_formed_id(id: &str) -> bool {
    let Some(token) = id.strip_prefix(ID_PREFIX) else {
        return false;
    };
    token.len() == ID_RANDOM_BYTES * 4 / 3
        && token.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

/// Keyed digest printed on the certificate so a copy can be matched against
/// the stored record.
pub(crate) fn fingerprint(
    secret: &str,
    certificate_id: &str,
    learner_id: &str,
    course_id: &str,
    issued_at_unix: i64,
) -> String {
    let issued_at = issued_at_unix.to_string();
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    for field in [certificate_id, learner_id, course_id, issued_at.as_str()] {
        hasher.update(b"\n");
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub(crate) async fn issue(
    state: &AppState,
    learner: &User,
    course_id: &str,
) -> ServiceResult<IssuedCertificate> {
    let course = access::load_course(state.db(), course_id).await?;
    let enrollment = access::require_active_enrollment(state.db(), course_id, &learner.id).await?;

    issue_for(state, &course, &enrollment, &learner.id).await
}

pub(crate) async fn issue_by_instructor(
    state: &AppState,
    instructor: &User,
    course_id: &str,
    student_id: &str,
) -> ServiceResult<IssuedCertificate> {
    let course = access::load_course(state.db(), course_id).await?;
    access::require_instructor(&course, instructor)?;

    let enrollment =
        repositories::enrollments::find_for_learner_course(state.db(), course_id, student_id)
            .await
            .map_err(ServiceError::db("Failed to fetch enrollment"))?
            .filter(|enrollment| enrollment.status == EnrollmentStatus::Active)
            .ok_or_else(|| {
                ServiceError::Ineligible("Student is not enrolled in this course".to_string())
            })?;

    issue_for(state, &course, &enrollment, &instructor.id).await
}

async fn issue_for(
    state: &AppState,
    course: &Course,
    enrollment: &Enrollment,
    issued_by: &str,
) -> ServiceResult<IssuedCertificate> {
    let learner_id = enrollment.learner_id.as_str();

    let existing =
        repositories::certificates::find_by_learner_course(state.db(), learner_id, &course.id)
            .await
            .map_err(ServiceError::db("Failed to fetch certificate"))?;
    if let Some(existing) = existing {
        let certificate = load_view(state, &existing.id).await?;
        return Ok(IssuedCertificate { certificate, created: false });
    }

    let content_ids = repositories::courses::list_content_ids(state.db(), &course.id)
        .await
        .map_err(ServiceError::db("Failed to list course content"))?;
    let snapshot = ProgressSnapshot::compute(&enrollment.completed_content, &content_ids);
    if !snapshot.is_complete() {
        return Err(ServiceError::Ineligible(format!(
            "Course progress is {}%; a certificate requires 100%",
            snapshot.progress
        )));
    }

    let now = primitive_now_utc();
    let id = new_certificate_id();
    let fingerprint = fingerprint(
        &state.settings().security().secret_key,
        &id,
        learner_id,
        &course.id,
        now.assume_utc().unix_timestamp(),
    );

    let (stored, created) = repositories::certificates::insert_if_absent(
        state.db(),
        repositories::certificates::CreateCertificate {
            id: &id,
            course_id: &course.id,
            learner_id,
            issued_by,
            fingerprint: &fingerprint,
            issued_at: now,
        },
    )
    .await
    .map_err(ServiceError::db("Failed to store certificate"))?;

    if created {
        metrics::counter!("certificates_issued_total").increment(1);
        tracing::info!(
            certificate_id = %stored.id,
            learner_id,
            course_id = %course.id,
            issued_by,
            "Issued certificate"
        );
    }

    let certificate = load_view(state, &stored.id).await?;
    Ok(IssuedCertificate { certificate, created })
}

/// Public lookup. Malformed and unknown ids are indistinguishable.
pub(crate) async fn verify(
    state: &AppState,
    certificate_id: &str,
) -> ServiceResult<Option<CertificateView>> {
    if !is_well_formed_id(certificate_id) {
        return Ok(None);
    }

    repositories::certificates::find_view(state.db(), certificate_id)
        .await
        .map_err(ServiceError::db("Failed to fetch certificate"))
}

pub(crate) async fn download(
    state: &AppState,
    caller: &User,
    certificate_id: &str,
) -> ServiceResult<(CertificateView, Vec<u8>)> {
    let view = load_view(state, certificate_id).await?;

    let allowed = view.learner_id == caller.id
        || view.instructor_id == caller.id
        || caller.is_platform_admin;
    if !allowed {
        return Err(ServiceError::Forbidden("Not allowed to download this certificate"));
    }

    let pdf = certificate_pdf::render(&view, state.settings().certificates());
    Ok((view, pdf))
}

pub(crate) async fn list_mine(
    state: &AppState,
    learner: &User,
) -> ServiceResult<Vec<CertificateView>> {
    repositories::certificates::list_views_by_learner(state.db(), &learner.id)
        .await
        .map_err(ServiceError::db("Failed to list certificates"))
}

async fn load_view(state: &AppState, certificate_id: &str) -> ServiceResult<CertificateView> {
    repositories::certificates::find_view(state.db(), certificate_id)
        .await
        .map_err(ServiceError::db("Failed to fetch certificate"))?
        .ok_or_else(|| ServiceError::NotFound("Certificate not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_well_formed_and_distinct() {
        let first = new_certificate_id();
        let second = new_certificate_id();

        assert!(first.starts_with("CC-"));
        assert_eq!(first.len(), 27);
        assert!(is_well_formed_id(&first));
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(!is_well_formed_id(""));
        assert!(!is_well_formed_id("CC-short"));
        assert!(!is_well_formed_id("XX-AAAAAAAAAAAAAAAAAAAAAAAA"));
        assert!(!is_well_formed_id("CC-AAAAAAAAAAAA/AAAAAAAAAAA"));
        assert!(!is_well_formed_id("'; DROP TABLE certificates; --"));
        assert!(is_well_formed_id("CC-AAAAAAAAAAAA-_AAAAAAAAAA"));
    }

    #[test]
    fn fingerprint_depends_on_secret_and_fields() {
        let base = fingerprint("secret", "CC-1", "learner", "course", 1_700_000_000);

        assert_eq!(base.len(), 64);
        assert_eq!(base, fingerprint("secret", "CC-1", "learner", "course", 1_700_000_000));
        assert_ne!(base, fingerprint("other", "CC-1", "learner", "course", 1_700_000_000));
        assert_ne!(base, fingerprint("secret", "CC-1", "learner", "course2", 1_700_000_000));
        assert_ne!(base, fingerprint("secret", "CC-1", "learner", "course", 1_700_000_001));
    }
}
