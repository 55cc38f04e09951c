use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::fmt;
use thiserror::Error as ThisError;

/// Which constraint a write tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Check => "check",
        })
    }
}

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("{kind} constraint violated: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Cannot decode {table}.{column}: {reason}")]
    Decode {
        table: &'static str,
        column: &'static str,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl StoreError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::ConnectionFailed(_) => "DATABASE_CONNECTION_FAILED",
            StoreError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            } => "DUPLICATE_RESOURCE",
            StoreError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            StoreError::InvalidFilter(_) => "INVALID_FILTER",
            StoreError::InvalidSort(_) => "INVALID_SORT",
            StoreError::Decode { .. }
            | StoreError::Database(_)
            | StoreError::JsonError(_)
            | StoreError::IoError(_)
            | StoreError::UnexpectedError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            } => StatusCode::CONFLICT,
            StoreError::ConstraintViolation { .. }
            | StoreError::InvalidFilter(_)
            | StoreError::InvalidSort(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_constraint(&self, kind: ConstraintKind) -> bool {
        matches!(self, StoreError::ConstraintViolation { kind: k, .. } if *k == kind)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match e {
            sqlx::Error::Database(db) => {
                let kind = match db.kind() {
                    ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                    ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                    ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                    ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                    _ => None,
                };
                match kind {
                    Some(kind) => StoreError::ConstraintViolation {
                        kind,
                        message: db.message().to_string(),
                    },
                    None => StoreError::Database(sqlx::Error::Database(db)),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionFailed(e.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            StoreError::ConnectionFailed(_) => "Unable to connect to database".to_string(),
            StoreError::ConstraintViolation { kind, .. } => {
                format!("Request violates a {kind} constraint")
            }
            StoreError::InvalidFilter(m) | StoreError::InvalidSort(m) => m.clone(),
            _ => "An internal server error occurred.".to_string(),
        };
        let body = ApiErrorBody {
            success: false,
            error: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Error payload returned by the HTTP layer.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let err = StoreError::ConnectionFailed("refused".into());
        assert_eq!(err.code(), "DATABASE_CONNECTION_FAILED");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = StoreError::ConstraintViolation {
            kind: ConstraintKind::Unique,
            message: "UNIQUE constraint failed: users.email".into(),
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.is_constraint(ConstraintKind::Unique));

        let err = StoreError::ConstraintViolation {
            kind: ConstraintKind::ForeignKey,
            message: "FOREIGN KEY constraint failed".into(),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "CONSTRAINT_VIOLATION");
    }

    #[test]
    fn pool_timeouts_are_connection_failures() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::ConnectionFailed(_)));
    }

    #[test]
    fn response_body_shape() {
        let resp = StoreError::InvalidSort("cannot sort by \"x\"".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
