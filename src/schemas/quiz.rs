use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Quiz, QuizQuestion};

/// A question as a learner sees it: no correct option.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
}

impl QuestionView {
    pub(crate) fn list(questions: &[QuizQuestion]) -> Vec<Self> {
        questions
            .iter()
            .map(|question| Self { text: question.text.clone(), options: question.options.clone() })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) questions: Option<Vec<QuestionView>>,
}

impl QuizSummary {
    pub(crate) fn from_db(quiz: &Quiz, reveal: bool) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            order_index: quiz.order_index,
            question_count: quiz.questions.len(),
            questions: reveal.then(|| QuestionView::list(&quiz.questions)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct QuestionInput {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[validate(length(equal = 4, message = "each question needs exactly 4 options"))]
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctIndex")]
    #[validate(range(min = 0, max = 3, message = "correct_index must be between 0 and 3"))]
    pub(crate) correct_index: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReplaceQuestionsRequest {
    #[validate(length(min = 1, message = "questions must not be empty"), nested)]
    pub(crate) questions: Vec<QuestionInput>,
}

impl ReplaceQuestionsRequest {
    pub(crate) fn into_questions(self) -> Vec<QuizQuestion> {
        self.questions
            .into_iter()
            .map(|question| QuizQuestion {
                text: question.text,
                options: question.options,
                correct_index: question.correct_index,
            })
            .collect()
    }
}

/// Instructor view of a quiz, answer key included.
#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) questions: Vec<QuestionInput>,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title,
            order_index: quiz.order_index,
            questions: quiz
                .questions
                .0
                .into_iter()
                .map(|question| QuestionInput {
                    text: question.text,
                    options: question.options,
                    correct_index: question.correct_index,
                })
                .collect(),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}
