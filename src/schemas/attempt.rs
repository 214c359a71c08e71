use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_primitive, seconds_until};
use crate::db::models::QuizAttempt;
use crate::db::types::AttemptStatus;
use crate::schemas::quiz::{QuestionView, QuizSummary};
use crate::services::attempt_history::QuizHistoryEntry;
use crate::services::attempts::{ClosedAttempt, StartedAttempt};

/// Identifies the quiz a start or expire call is about.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizTargetRequest {
    #[serde(alias = "courseId")]
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
    #[serde(alias = "quizId")]
    #[validate(length(min = 1, message = "quiz_id must not be empty"))]
    pub(crate) quiz_id: String,
}

/// Answer save or submit. `selected_index` is shorthand for a one-question
/// quiz; `answers` carries one entry per question.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptSelectionRequest {
    #[serde(alias = "courseId")]
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
    #[serde(alias = "quizId")]
    #[validate(length(min = 1, message = "quiz_id must not be empty"))]
    pub(crate) quiz_id: String,
    #[serde(default, alias = "selectedIndex")]
    #[validate(range(min = 0, message = "selected_index must be non-negative"))]
    pub(crate) selected_index: Option<i32>,
    #[serde(default)]
    pub(crate) answers: Option<Vec<Option<i32>>>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct HistoryQuery {
    #[serde(alias = "courseId")]
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStartResponse {
    pub(crate) attempt_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) deadline: String,
    pub(crate) attempt_number: i32,
    pub(crate) resumed: bool,
    pub(crate) time_remaining_seconds: i64,
    pub(crate) questions: Vec<QuestionView>,
}

impl AttemptStartResponse {
    pub(crate) fn from_started(started: StartedAttempt, now: time::PrimitiveDateTime) -> Self {
        let StartedAttempt { attempt, quiz, resumed } = started;
        Self {
            attempt_id: attempt.id,
            status: attempt.status,
            deadline: format_primitive(attempt.deadline_at),
            attempt_number: attempt.attempt_number,
            resumed,
            time_remaining_seconds: seconds_until(now, attempt.deadline_at),
            questions: QuestionView::list(&quiz.questions),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerSavedResponse {
    pub(crate) attempt_id: String,
    pub(crate) answers: Vec<Option<i32>>,
    pub(crate) last_answer_at: Option<String>,
    pub(crate) time_remaining_seconds: i64,
}

impl AnswerSavedResponse {
    pub(crate) fn from_db(attempt: QuizAttempt, now: time::PrimitiveDateTime) -> Self {
        Self {
            time_remaining_seconds: seconds_until(now, attempt.deadline_at),
            attempt_id: attempt.id,
            answers: attempt.answers.0,
            last_answer_at: attempt.last_answer_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) quiz_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) score: Option<i32>,
    pub(crate) max_score: i32,
    pub(crate) answers: Vec<Option<i32>>,
    pub(crate) deadline: String,
    pub(crate) created_at: String,
    pub(crate) submitted_at: Option<String>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: QuizAttempt) -> Self {
        Self {
            id: attempt.id,
            course_id: attempt.course_id,
            quiz_id: attempt.quiz_id,
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            score: attempt.score,
            max_score: attempt.max_score,
            answers: attempt.answers.0,
            deadline: format_primitive(attempt.deadline_at),
            created_at: format_primitive(attempt.created_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) already_recorded: bool,
}

impl AttemptResultResponse {
    pub(crate) fn from_closed(closed: ClosedAttempt) -> Self {
        Self {
            attempt: AttemptResponse::from_db(closed.attempt),
            already_recorded: closed.already_recorded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizHistoryItem {
    pub(crate) quiz: QuizSummary,
    pub(crate) status: Option<AttemptStatus>,
    pub(crate) score: Option<i32>,
    pub(crate) max_score: Option<i32>,
    pub(crate) attempt_number: Option<i32>,
    pub(crate) created_at: Option<String>,
}

impl QuizHistoryItem {
    pub(crate) fn from_entry(entry: QuizHistoryEntry) -> Self {
        let quiz = QuizSummary::from_db(&entry.quiz, entry.reveals_content());
        let latest = entry.latest;
        Self {
            quiz,
            status: entry.status,
            score: entry.score,
            max_score: latest.as_ref().map(|attempt| attempt.max_score),
            attempt_number: latest.as_ref().map(|attempt| attempt.attempt_number),
            created_at: latest.as_ref().map(|attempt| format_primitive(attempt.created_at)),
        }
    }
}
