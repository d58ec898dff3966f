// Error classification shared by every endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::storage::StorageError;

pub const FILE_READ_ERROR: &str = "file read error";
pub const DOWNLOAD_ERROR: &str = "download error";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Preview failed. The cause is logged where it happens, never returned.
    #[error("{}", FILE_READ_ERROR)]
    FileRead,

    /// Download failed while producing the response. Cause is logged only.
    #[error("{}", DOWNLOAD_ERROR)]
    Download,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(StorageError::NotFound(_))
            | AppError::Storage(StorageError::BucketNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Storage(StorageError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::FileRead | AppError::Download => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Storage(StorageError::NotFound("a".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Storage(StorageError::Io(std::io::Error::other("boom"))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(AppError::FileRead.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_generic_messages() {
        assert_eq!(AppError::FileRead.to_string(), "file read error");
        assert_eq!(AppError::Download.to_string(), "download error");
    }

    #[test]
    fn test_storage_message_is_passed_through() {
        let err = AppError::from(StorageError::NotFound("report####1.pdf".into()));
        assert_eq!(err.to_string(), "Object not found: report####1.pdf");
    }
}
