use std::collections::HashMap;

use time::PrimitiveDateTime;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizAttempt, User};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::services::access;
use crate::services::attempt_lifecycle;
use crate::services::error::{ServiceError, ServiceResult};

/// One quiz of the course with the learner's most recent attempt, if any.
#[derive(Debug, Clone)]
pub(crate) struct QuizHistoryEntry {
    pub(crate) quiz: Quiz,
    pub(crate) latest: Option<QuizAttempt>,
    /// Status as shown to the learner. An in-progress attempt past its
    /// deadline reads as expired before anything closes it.
    pub(crate) status: Option<AttemptStatus>,
    pub(crate) score: Option<i32>,
}

impl QuizHistoryEntry {
    fn new(quiz: Quiz, latest: Option<QuizAttempt>, now: PrimitiveDateTime) -> Self {
        let (status, score) = match &latest {
            None => (None, None),
            Some(attempt) if attempt.status.is_terminal() => (Some(attempt.status), attempt.score),
            Some(attempt) if attempt_lifecycle::is_overdue(attempt, now) => {
                let answers =
                    attempt_lifecycle::pad_answers(&attempt.answers, quiz.questions.len());
                (
                    Some(AttemptStatus::Expired),
                    Some(attempt_lifecycle::score(&quiz.questions, &answers)),
                )
            }
            Some(attempt) => (Some(attempt.status), None),
        };
        Self { quiz, latest, status, score }
    }

    /// Question text and options are shown only once the latest attempt is
    /// closed. The correct option is never shown here.
    pub(crate) fn reveals_content(&self) -> bool {
        self.status.is_some_and(AttemptStatus::is_terminal)
    }
}

/// Keeps course quiz order; the latest attempt per quiz is the one with the
/// highest attempt number. Reads only.
pub(crate) fn project(
    quizzes: Vec<Quiz>,
    attempts: Vec<QuizAttempt>,
    now: PrimitiveDateTime,
) -> Vec<QuizHistoryEntry> {
    let mut latest: HashMap<String, QuizAttempt> = HashMap::new();
    for attempt in attempts {
        match latest.get(&attempt.quiz_id) {
            Some(current) if current.attempt_number >= attempt.attempt_number => {}
            _ => {
                latest.insert(attempt.quiz_id.clone(), attempt);
            }
        }
    }

    quizzes
        .into_iter()
        .map(|quiz| {
            let latest = latest.remove(&quiz.id);
            QuizHistoryEntry::new(quiz, latest, now)
        })
        .collect()
}

pub(crate) async fn load_history(
    state: &AppState,
    learner: &User,
    course_id: &str,
) -> ServiceResult<Vec<QuizHistoryEntry>> {
    access::load_course(state.db(), course_id).await?;
    access::require_active_enrollment(state.db(), course_id, &learner.id).await?;

    let quizzes = repositories::quizzes::list_by_course(state.db(), course_id)
        .await
        .map_err(ServiceError::db("Failed to list quizzes"))?;
    let attempts =
        repositories::attempts::list_by_learner_course(state.db(), &learner.id, course_id)
            .await
            .map_err(ServiceError::db("Failed to list attempts"))?;

    Ok(project(quizzes, attempts, primitive_now_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::QuizQuestion;
    use sqlx::types::Json;
    use time::{Date, Duration, Month, Time};

    fn t0() -> PrimitiveDateTime {
        PrimitiveDateTime::new(
            Date::from_calendar_date(2025, Month::April, 7).unwrap(),
            Time::from_hms(9, 0, 0).unwrap(),
        )
    }

    fn quiz(id: &str, order_index: i32) -> Quiz {
        Quiz {
            id: id.to_string(),
            course_id: "course".to_string(),
            title: format!("Quiz {id}"),
            order_index,
            questions: Json(vec![QuizQuestion {
                text: "2 + 2?".to_string(),
                options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
                correct_index: 1,
            }]),
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn attempt(quiz_id: &str, number: i32, status: AttemptStatus, score: Option<i32>) -> QuizAttempt {
        let created_at = t0() + Duration::minutes(number as i64);
        QuizAttempt {
            id: format!("{quiz_id}-{number}"),
            course_id: "course".to_string(),
            quiz_id: quiz_id.to_string(),
            learner_id: "learner".to_string(),
            attempt_number: number,
            status,
            answers: Json(vec![None]),
            score,
            max_score: 1,
            deadline_at: created_at + Duration::seconds(50),
            last_answer_at: None,
            submitted_at: score.map(|_| created_at + Duration::seconds(20)),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn picks_highest_attempt_number_per_quiz() {
        let entries = project(
            vec![quiz("q1", 0), quiz("q2", 1), quiz("q3", 2)],
            vec![
                attempt("q1", 2, AttemptStatus::Submitted, Some(1)),
                attempt("q1", 1, AttemptStatus::Expired, Some(0)),
                attempt("q1", 3, AttemptStatus::InProgress, None),
                attempt("q2", 1, AttemptStatus::Submitted, Some(0)),
            ],
            t0() + Duration::minutes(3),
        );

        assert_eq!(entries.len(), 3);
        let q1 = entries[0].latest.as_ref().expect("q1 attempt");
        assert_eq!(q1.attempt_number, 3);
        assert_eq!(q1.status, AttemptStatus::InProgress);
        assert!(!entries[0].reveals_content());

        let q2 = entries[1].latest.as_ref().expect("q2 attempt");
        assert_eq!(q2.score, Some(0));
        assert!(entries[1].reveals_content());

        assert!(entries[2].latest.is_none());
        assert!(!entries[2].reveals_content());
    }

    #[test]
    fn keeps_quiz_order_and_ignores_foreign_attempts() {
        let entries = project(
            vec![quiz("b", 0), quiz("a", 1)],
            vec![attempt("elsewhere", 1, AttemptStatus::Submitted, Some(1))],
            t0(),
        );

        let order: Vec<&str> = entries.iter().map(|entry| entry.quiz.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert!(entries.iter().all(|entry| entry.latest.is_none()));
    }

    #[test]
    fn overdue_open_attempt_reads_as_expired_without_closing() {
        let mut open = attempt("q1", 1, AttemptStatus::InProgress, None);
        open.answers = Json(vec![Some(1)]);
        let deadline = open.deadline_at;

        let before = project(vec![quiz("q1", 0)], vec![open.clone()], deadline - Duration::seconds(1));
        assert_eq!(before[0].status, Some(AttemptStatus::InProgress));
        assert_eq!(before[0].score, None);
        assert!(!before[0].reveals_content());

        let after = project(vec![quiz("q1", 0)], vec![open], deadline);
        assert_eq!(after[0].status, Some(AttemptStatus::Expired));
        assert_eq!(after[0].score, Some(1));
        assert!(after[0].reveals_content());
        let stored = after[0].latest.as_ref().expect("attempt");
        assert_eq!(stored.status, AttemptStatus::InProgress);
        assert_eq!(stored.score, None);
    }
}
