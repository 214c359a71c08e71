use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::test_support;

fn two_questions() -> serde_json::Value {
    json!({
        "questions": [
            { "text": "Ownership moves on", "options": ["let", "fn", "move", "ref"], "correct_index": 2 },
            { "text": "Borrow marker", "options": ["&", "*", "#", "$"], "correctIndex": 0 }
        ]
    })
}

#[tokio::test]
async fn instructor_replaces_questions_before_any_attempt() {
    let ctx = test_support::setup_test_context().await;
    let fixture = test_support::course_fixture(ctx.state.db(), 1).await;
    let quiz = test_support::insert_quiz(ctx.state.db(), &fixture.course.id, &[0]).await;
    let token = test_support::bearer_token(&fixture.instructor.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/quizzes/{}/questions", fixture.course.id, quiz.id);

    let (status, body) =
        test_support::send(&ctx, Method::PUT, &uri, Some(&token), Some(two_questions())).await;

    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert_eq!(body["questions"][0]["correct_index"], 2);
    assert_eq!(body["questions"][1]["text"], "Borrow marker");
}

#[tokio::test]
async fn questions_freeze_once_attempted() {
    let ctx = test_support::setup_test_context().await;
    let fixture = test_support::course_fixture(ctx.state.db(), 1).await;
    let quiz = test_support::insert_quiz(ctx.state.db(), &fixture.course.id, &[0]).await;
    let learner_token = test_support::bearer_token(&fixture.learner.id, ctx.state.settings());
    test_support::start_attempt(&ctx, &learner_token, &fixture.course.id, &quiz.id).await;

    let token = test_support::bearer_token(&fixture.instructor.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/quizzes/{}/questions", fixture.course.id, quiz.id);
    let (status, body) =
        test_support::send(&ctx, Method::PUT, &uri, Some(&token), Some(two_questions())).await;

    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn only_the_instructor_may_replace_questions() {
    let ctx = test_support::setup_test_context().await;
    let fixture = test_support::course_fixture(ctx.state.db(), 1).await;
    let quiz = test_support::insert_quiz(ctx.state.db(), &fixture.course.id, &[0]).await;
    let token = test_support::bearer_token(&fixture.learner.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/quizzes/{}/questions", fixture.course.id, quiz.id);

    let (status, body) =
        test_support::send(&ctx, Method::PUT, &uri, Some(&token), Some(two_questions())).await;

    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
}

#[tokio::test]
async fn malformed_questions_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let fixture = test_support::course_fixture(ctx.state.db(), 1).await;
    let quiz = test_support::insert_quiz(ctx.state.db(), &fixture.course.id, &[0]).await;
    let token = test_support::bearer_token(&fixture.instructor.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/quizzes/{}/questions", fixture.course.id, quiz.id);

    for payload in [
        json!({ "questions": [] }),
        json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correct_index": 0 }] }),
        json!({ "questions": [{ "text": "Q", "options": ["a", "b", "c", "d"], "correct_index": 4 }] }),
    ] {
        let (status, body) =
            test_support::send(&ctx, Method::PUT, &uri, Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    }

    let (status, _) = test_support::send(
        &ctx,
        Method::PUT,
        &format!("/api/v1/courses/{}/quizzes/missing/questions", fixture.course.id),
        Some(&token),
        Some(two_questions()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
