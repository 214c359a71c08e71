use thiserror::Error;

/// Domain failures shared by every service. The HTTP layer maps each variant
/// onto a status code; the worker only logs them.
#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Ineligible(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

pub(crate) type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Wraps a database error with the operation it interrupted. Lost races
    /// (serialization failures, deadlocks, unique violations) surface as
    /// `Conflict` so clients retry.
    pub(crate) fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            if crate::db::is_conflict(&source) {
                tracing::warn!(error = %source, "{context}");
                return Self::Conflict(format!("{context}; retry the request"));
            }
            Self::Database { context, source }
        }
    }
}
