use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizQuestion, User};
use crate::repositories;
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};

pub(crate) const OPTIONS_PER_QUESTION: usize = 4;

pub(crate) fn validate_questions(questions: &[QuizQuestion]) -> ServiceResult<()> {
    if questions.is_empty() {
        return Err(ServiceError::Validation("A quiz needs at least one question".to_string()));
    }

    for (position, question) in questions.iter().enumerate() {
        let number = position + 1;
        if question.text.trim().is_empty() {
            return Err(ServiceError::Validation(format!("Question {number} has no text")));
        }
        if question.options.len() != OPTIONS_PER_QUESTION {
            return Err(ServiceError::Validation(format!(
                "Question {number} must have exactly {OPTIONS_PER_QUESTION} options"
            )));
        }
        if question.options.iter().any(|option| option.trim().is_empty()) {
            return Err(ServiceError::Validation(format!("Question {number} has an empty option")));
        }
        if question.correct_index < 0 || question.correct_index as usize >= question.options.len()
        {
            return Err(ServiceError::Validation(format!(
                "Question {number} has an out-of-range correct_index"
            )));
        }
    }

    Ok(())
}

/// Swaps the question set of a quiz nobody has attempted yet. Once an
/// attempt exists the questions are frozen so recorded scores stay valid.
pub(crate) async fn replace_questions(
    state: &AppState,
    instructor: &User,
    course_id: &str,
    quiz_id: &str,
    questions: Vec<QuizQuestion>,
) -> ServiceResult<Quiz> {
    let course = access::load_course(state.db(), course_id).await?;
    access::require_instructor(&course, instructor)?;
    validate_questions(&questions)?;

    let mut tx = state.db().begin().await.map_err(ServiceError::db("Failed to start transaction"))?;

    repositories::quizzes::find_in_course_for_update(&mut *tx, course_id, quiz_id)
        .await
        .map_err(ServiceError::db("Failed to fetch quiz"))?
        .ok_or_else(|| ServiceError::NotFound("Quiz not found".to_string()))?;

    let attempted = repositories::quizzes::has_attempts(&mut *tx, quiz_id)
        .await
        .map_err(ServiceError::db("Failed to check quiz attempts"))?;
    if attempted {
        return Err(ServiceError::Conflict(
            "Quiz already has attempts; its questions can no longer change".to_string(),
        ));
    }

    let quiz = repositories::quizzes::replace_questions(
        &mut *tx,
        quiz_id,
        &questions,
        primitive_now_utc(),
    )
    .await
    .map_err(ServiceError::db("Failed to update quiz"))?;
    tx.commit().await.map_err(ServiceError::db("Failed to commit transaction"))?;

    tracing::info!(
        quiz_id,
        course_id,
        instructor_id = %instructor.id,
        questions = quiz.questions.len(),
        "Replaced quiz questions"
    );
    Ok(quiz)
}
