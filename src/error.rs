//! Error types for the inference API.

use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The multipart request carried no usable `file` field
    #[error("multipart field `file` is missing or empty")]
    MissingFile,

    /// The multipart stream itself was malformed
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The uploaded bytes could not be decoded as an image
    #[error("Invalid image file: {0}")]
    InvalidImage(String),

    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// Loading, optimizing or planning the model failed, or its output
    /// does not match the configured labels
    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::Upload(_) | AppError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ModelNotFound(_)
            | AppError::Model(_)
            | AppError::Inference(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(AppError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidImage("truncated".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_model_errors_map_to_server_error() {
        let err = AppError::ModelNotFound(PathBuf::from("/models/missing.onnx"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("missing.onnx"));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Inference("shape mismatch".to_string());
        assert_eq!(err.to_string(), "Inference error: shape mismatch");
    }
}
