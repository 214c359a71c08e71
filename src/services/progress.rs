use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProgressSnapshot {
    pub(crate) progress: i32,
    pub(crate) completed_content: Vec<String>,
    pub(crate) total_content: usize,
}

impl ProgressSnapshot {
    pub(crate) fn compute(completed: &[String], content_ids: &[String]) -> Self {
        Self {
            progress: percentage(completed, content_ids),
            completed_content: completed.to_vec(),
            total_content: content_ids.len(),
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.progress == 100
    }
}

/// Share of the course's current content the learner has completed, rounded
/// half up. Stays at 99 until every unit is done; an empty course is 0.
pub(crate) fn percentage(completed: &[String], content_ids: &[String]) -> i32 {
    let total = content_ids.len();
    if total == 0 {
        return 0;
    }

    let done = content_ids.iter().filter(|id| completed.contains(id)).count();
    if done == total {
        return 100;
    }

    let rounded = (done * 200 + total) / (total * 2);
    rounded.min(99) as i32
}

pub(crate) async fn mark_complete(
    state: &AppState,
    learner: &User,
    course_id: &str,
    content_id: &str,
) -> ServiceResult<ProgressSnapshot> {
    access::load_course(state.db(), course_id).await?;
    let exists = repositories::courses::content_exists(state.db(), course_id, content_id)
        .await
        .map_err(ServiceError::db("Failed to fetch content"))?;
    if !exists {
        return Err(ServiceError::NotFound("Content not found".to_string()));
    }
    let enrollment = access::require_active_enrollment(state.db(), course_id, &learner.id).await?;

    let mut tx = state.db().begin().await.map_err(ServiceError::db("Failed to start transaction"))?;
    let before = repositories::enrollments::lock_by_id(&mut *tx, &enrollment.id)
        .await
        .map_err(ServiceError::db("Failed to lock enrollment"))?;

    let now = primitive_now_utc();
    let updated =
        repositories::enrollments::add_completed_content(&mut *tx, &enrollment.id, content_id, now)
            .await
            .map_err(ServiceError::db("Failed to record completed content"))?;

    let content_ids = repositories::courses::list_content_ids(&mut *tx, course_id)
        .await
        .map_err(ServiceError::db("Failed to list course content"))?;
    let snapshot = ProgressSnapshot::compute(&updated.completed_content, &content_ids);

    repositories::enrollments::store_progress(&mut *tx, &enrollment.id, snapshot.progress, now)
        .await
        .map_err(ServiceError::db("Failed to store progress"))?;
    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;

    let newly_completed = !before.completed_content.iter().any(|id| id == content_id);
    if newly_completed {
        metrics::counter!("content_completions_total").increment(1);
        tracing::info!(
            learner_id = %learner.id,
            course_id,
            content_id,
            progress = snapshot.progress,
            "Content completed"
        );
    }

    Ok(snapshot)
}

pub(crate) async fn get_progress(
    state: &AppState,
    learner: &User,
    course_id: &str,
) -> ServiceResult<ProgressSnapshot> {
    access::load_course(state.db(), course_id).await?;
    let enrollment = access::require_active_enrollment(state.db(), course_id, &learner.id).await?;
    let content_ids = repositories::courses::list_content_ids(state.db(), course_id)
        .await
        .map_err(ServiceError::db("Failed to list course content"))?;

    Ok(ProgressSnapshot::compute(&enrollment.completed_content, &content_ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn four_units_progress_in_quarters() {
        let content = ids(&["a", "b", "c", "d"]);

        assert_eq!(percentage(&ids(&[]), &content), 0);
        assert_eq!(percentage(&ids(&["a"]), &content), 25);
        assert_eq!(percentage(&ids(&["a", "b"]), &content), 50);
        assert_eq!(percentage(&ids(&["a", "b", "c", "d"]), &content), 100);
    }

    #[test]
    fn rounds_half_up() {
        let three = ids(&["a", "b", "c"]);
        let eight = ids(&["1", "2", "3", "4", "5", "6", "7", "8"]);

        assert_eq!(percentage(&ids(&["a"]), &three), 33);
        assert_eq!(percentage(&ids(&["a", "b"]), &three), 67);
        assert_eq!(percentage(&ids(&["1"]), &eight), 13);
    }

    #[test]
    fn caps_at_99_until_everything_is_done() {
        let content: Vec<String> = (0..200).map(|index| index.to_string()).collect();
        let completed: Vec<String> = content[..199].to_vec();

        assert_eq!(percentage(&completed, &content), 99);
    }

    #[test]
    fn ignores_ids_no_longer_in_course() {
        let content = ids(&["a", "b"]);

        assert_eq!(percentage(&ids(&["a", "removed"]), &content), 50);
    }

    #[test]
    fn empty_course_reports_zero() {
        let snapshot = ProgressSnapshot::compute(&ids(&[]), &ids(&[]));

        assert_eq!(snapshot.progress, 0);
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn progress_never_drops_while_marking() {
        let content = ids(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut completed = Vec::new();
        let mut last = 0;

        for id in ["c", "c", "a", "g", "a", "b", "d", "e", "f"] {
            if !completed.iter().any(|existing: &String| existing == id) {
                completed.push(id.to_string());
            }
            let current = percentage(&completed, &content);
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, 100);
    }
}
