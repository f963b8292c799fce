//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while introspecting a schema or writing generated files.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("schema unavailable at {}: {reason}", .path.display())]
    SchemaUnavailable { path: PathBuf, reason: String },
    #[error("no models found matching '{0}'")]
    ModelNotFound(String),
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a [`RecordStore`](crate::store::RecordStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Status the store already knows for this failure. `None` means unclassified.
    pub fn status_hint(&self) -> Option<StatusCode> {
        match self {
            StoreError::RecordNotFound { .. } => Some(StatusCode::NOT_FOUND),
            StoreError::Conflict(_) => Some(StatusCode::CONFLICT),
            StoreError::Invalid(_) => Some(StatusCode::BAD_REQUEST),
            StoreError::Unavailable(_) => Some(StatusCode::SERVICE_UNAVAILABLE),
            StoreError::Db(sqlx::Error::RowNotFound) => Some(StatusCode::NOT_FOUND),
            StoreError::Db(sqlx::Error::Database(e)) if e.is_unique_violation() => Some(StatusCode::CONFLICT),
            StoreError::Db(_) | StoreError::Serialization(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage: {source}")]
    Storage {
        status: StatusCode,
        #[source]
        source: StoreError,
    },
    #[error("export: {0}")]
    Export(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::UnsupportedFormat(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage { status, .. } => *status,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::UnsupportedFormat(_) => "unsupported_format",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Storage { .. } => "storage_error",
            AppError::Export(_) => "export_error",
        }
    }

    /// Client-facing message, without the category prefix of `Display`.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(m) | AppError::Validation(m) | AppError::BadRequest(m) | AppError::Export(m) => {
                m.clone()
            }
            AppError::Storage { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Keeps the status a store already attached; unclassified failures become 500.
impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RecordNotFound { collection, id } => {
                AppError::NotFound(format!("{} '{}'", collection, id))
            }
            other => AppError::Storage {
                status: other.status_hint().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                source: other,
            },
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclassified_store_errors_default_to_500() {
        let err: AppError = StoreError::Serialization(serde_json::from_str::<u8>("x").unwrap_err()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_hints_are_preserved() {
        let err: AppError = StoreError::Conflict("duplicate id".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: AppError = StoreError::RecordNotFound {
            collection: "song".into(),
            id: "42".into(),
        }
        .into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsupported_format_is_a_client_error() {
        assert_eq!(AppError::UnsupportedFormat("xml".into()).status(), StatusCode::BAD_REQUEST);
    }
}
