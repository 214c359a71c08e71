use crate::db::models::{Course, Enrollment, User};
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::services::error::{ServiceError, ServiceResult};

pub(crate) async fn load_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> ServiceResult<Course> {
    repositories::courses::find_by_id(executor, course_id)
        .await
        .map_err(ServiceError::db("Failed to fetch course"))?
        .ok_or_else(|| ServiceError::NotFound("Course not found".to_string()))
}

/// The learner's enrollment, which must be active.
pub(crate) async fn require_active_enrollment(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    learner_id: &str,
) -> ServiceResult<Enrollment> {
    let enrollment = repositories::enrollments::find_for_learner_course(
        executor, course_id, learner_id,
    )
    .await
    .map_err(ServiceError::db("Failed to fetch enrollment"))?;

    match enrollment {
        Some(enrollment) if enrollment.status == EnrollmentStatus::Active => Ok(enrollment),
        _ => Err(ServiceError::Forbidden("Not enrolled in this course")),
    }
}

pub(crate) fn require_instructor(course: &Course, user: &User) -> ServiceResult<()> {
    if course.instructor_id == user.id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Only the course instructor can do this"))
    }
}
