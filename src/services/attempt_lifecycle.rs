//! Pure decisions of the attempt state machine. Nothing here touches the
//! database; the callers in `attempts` apply the outcome under the
//! per-(quiz, learner) lock.

use time::PrimitiveDateTime;

use crate::core::time::seconds_until;
use crate::db::models::{QuizAttempt, QuizQuestion};
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartDecision {
    /// The latest attempt is open and inside its deadline.
    Resume,
    Create {
        attempt_number: i32,
        /// The latest attempt is still marked in progress but overdue; it
        /// has to be expired before the new one is inserted.
        expire_stale: bool,
    },
}

pub(crate) fn decide_start(latest: Option<&QuizAttempt>, now: PrimitiveDateTime) -> StartDecision {
    let Some(latest) = latest else {
        return StartDecision::Create { attempt_number: 1, expire_stale: false };
    };

    let next = latest.attempt_number + 1;
    if latest.status.is_terminal() {
        return StartDecision::Create { attempt_number: next, expire_stale: false };
    }
    if is_overdue(latest, now) {
        return StartDecision::Create { attempt_number: next, expire_stale: true };
    }
    StartDecision::Resume
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseTrigger {
    /// The learner pressed submit.
    Learner,
    /// A timeout report from the client or the sweeper.
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClosePlan {
    NoAttempt,
    AlreadyClosed,
    Submit,
    Expire,
    NotYetDue { remaining_seconds: i64 },
}

pub(crate) fn plan_close(
    latest: Option<&QuizAttempt>,
    trigger: CloseTrigger,
    now: PrimitiveDateTime,
) -> ClosePlan {
    let Some(latest) = latest else {
        return ClosePlan::NoAttempt;
    };
    if latest.status.is_terminal() {
        return ClosePlan::AlreadyClosed;
    }
    if is_overdue(latest, now) {
        return ClosePlan::Expire;
    }
    match trigger {
        CloseTrigger::Learner => ClosePlan::Submit,
        CloseTrigger::Deadline => {
            ClosePlan::NotYetDue { remaining_seconds: seconds_until(now, latest.deadline_at) }
        }
    }
}

/// The deadline instant itself already counts as overdue.
pub(crate) fn is_overdue(attempt: &QuizAttempt, now: PrimitiveDateTime) -> bool {
    now >= attempt.deadline_at
}

/// One point per question whose selection matches the correct option.
pub(crate) fn score(questions: &[QuizQuestion], answers: &[Option<i32>]) -> i32 {
    questions
        .iter()
        .zip(answers.iter())
        .filter(|(question, answer)| **answer == Some(question.correct_index))
        .count() as i32
}

/// Sizes an answer list to the quiz: missing positions are unanswered and
/// extra positions are dropped.
pub(crate) fn pad_answers(answers: &[Option<i32>], question_count: usize) -> Vec<Option<i32>> {
    (0..question_count).map(|index| answers.get(index).copied().flatten()).collect()
}

/// Lays `incoming` over `recorded` position by position. Positions left
/// unanswered in `incoming` keep the recorded selection.
pub(crate) fn merge_answers(
    recorded: &[Option<i32>],
    incoming: &[Option<i32>],
    question_count: usize,
) -> Vec<Option<i32>> {
    (0..question_count)
        .map(|index| {
            incoming
                .get(index)
                .copied()
                .flatten()
                .or_else(|| recorded.get(index).copied().flatten())
        })
        .collect()
}

/// Accepts either the single-question shorthand or a full answer list.
pub(crate) fn normalize_selection(
    selected_index: Option<i32>,
    answers: Option<Vec<Option<i32>>>,
) -> ServiceResult<Vec<Option<i32>>> {
    match (selected_index, answers) {
        (Some(_), Some(_)) => Err(ServiceError::Validation(
            "Provide either selected_index or answers, not both".to_string(),
        )),
        (Some(index), None) => Ok(vec![Some(index)]),
        (None, Some(answers)) => Ok(answers),
        (None, None) => Ok(Vec::new()),
    }
}

pub(crate) fn validate_selection(
    questions: &[QuizQuestion],
    answers: &[Option<i32>],
) -> ServiceResult<()> {
    if answers.len() > questions.len() {
        return Err(ServiceError::Validation(format!(
            "Quiz has {} questions but {} answers were given",
            questions.len(),
            answers.len()
        )));
    }

    for (position, (question, answer)) in questions.iter().zip(answers.iter()).enumerate() {
        let Some(index) = answer else { continue };
        if *index < 0 || *index as usize >= question.options.len() {
            return Err(ServiceError::Validation(format!(
                "Answer {index} for question {} is out of range",
                position + 1
            )));
        }
    }

    Ok(())
}
