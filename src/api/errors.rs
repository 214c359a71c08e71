use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::error::ServiceError;

const RETRY_AFTER_SECONDS: &str = "1";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    InvalidState(String),
    Ineligible(String),
    Conflict(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message.to_string())
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            Self::InvalidState(message) => (StatusCode::CONFLICT, "invalid_state", message),
            Self::Ineligible(message) => (StatusCode::CONFLICT, "ineligible", message),
            Self::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            Self::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, "too_many_requests", message.to_string())
            }
            Self::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", message)
            }
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", message),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => Self::NotFound(message),
            ServiceError::Forbidden(message) => Self::Forbidden(message),
            ServiceError::InvalidState(message) => Self::InvalidState(message),
            ServiceError::Ineligible(message) => Self::Ineligible(message),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Validation(message) => Self::BadRequest(message),
            ServiceError::Database { context, source } if crate::db::is_unavailable(&source) => {
                tracing::warn!(error = %source, "{context}");
                Self::ServiceUnavailable("Database temporarily unavailable; retry".to_string())
            }
            ServiceError::Database { context, source } => Self::internal(source, context),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = matches!(self, Self::ServiceUnavailable(_) | Self::TooManyRequests(_));
        let www_authenticate = matches!(self, Self::Unauthorized(_));
        let (status, code, detail) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %detail, code, "Request failed");
        }

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), code, detail })).into_response();
        if www_authenticate {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: ApiError) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, headers, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn service_errors_map_to_codes() {
        let cases = [
            (ServiceError::NotFound("Quiz not found".into()), 404, "not_found"),
            (ServiceError::Forbidden("Not enrolled in this course"), 403, "forbidden"),
            (ServiceError::InvalidState("No attempt".into()), 409, "invalid_state"),
            (ServiceError::Ineligible("Course progress is 99%".into()), 409, "ineligible"),
            (ServiceError::Conflict("retry".into()), 409, "conflict"),
            (ServiceError::Validation("bad index".into()), 400, "bad_request"),
        ];

        for (error, status, code) in cases {
            let (actual, _, json) = body_json(ApiError::from(error)).await;
            assert_eq!(actual.as_u16(), status);
            assert_eq!(json["status"], status);
            assert_eq!(json["code"], code);
        }
    }

    #[tokio::test]
    async fn pool_timeout_is_retryable_503() {
        let error = ServiceError::Database {
            context: "Failed to start transaction",
            source: sqlx::Error::PoolTimedOut,
        };

        let (status, headers, json) = body_json(ApiError::from(error)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], "service_unavailable");
        assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "1");
    }

    #[tokio::test]
    async fn other_database_errors_hide_details() {
        let error = ServiceError::Database {
            context: "Failed to fetch quiz",
            source: sqlx::Error::Protocol("secret internals".into()),
        };

        let (status, _, json) = body_json(ApiError::from(error)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "internal");
        assert_eq!(json["detail"], "Failed to fetch quiz");
    }

    #[tokio::test]
    async fn unauthorized_sets_www_authenticate() {
        let (status, headers, json) = body_json(ApiError::Unauthorized("Invalid token")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert_eq!(json["code"], "unauthorized");
    }
}
