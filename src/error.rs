use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the persistence layer, whichever driver is active.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error("{0}")]
    Mysql(#[from] mysql::Error),

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Unsupported database driver: {0}")]
    UnsupportedDriver(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// An extractor refused the request; keeps axum's status code.
    #[error("{1}")]
    Rejected(StatusCode, String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Report(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Rejected(status, _) => *status,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        match e {
            // A body without the expected fields, in any encoding.
            JsonRejection::MissingJsonContentType(_) | JsonRejection::JsonDataError(_) => {
                AppError::bad_request("All fields are required")
            }
            // Oversized bodies keep their 413.
            JsonRejection::BytesRejection(e) => AppError::Rejected(e.status(), e.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Rejected(e.status(), e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::bad_request("All fields are required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "All fields are required");

        let err = AppError::not_found("Record not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_errors_are_server_errors() {
        let err = AppError::from(StoreError::Poisoned);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Database lock poisoned");
    }
}
