//! Error types shared by the services and the HTTP layer
//!
//! Every failure a request can hit is an [`AssetError`]. The HTTP layer never
//! builds error responses by hand: the `ResponseError` impl below maps each
//! variant to its status code and a `{"status", "message"}` JSON body.

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use std::io;
use thiserror::Error;

use crate::auth::AuthRejection;

/// Rejections produced while checking an upload or a name against policy
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file size {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("file type .{0} is not allowed")]
    UnsupportedMediaType(String),

    #[error("file name has no extension")]
    MissingExtension,

    #[error("file extension is not valid: {0}")]
    InvalidExtension(String),

    #[error("no data was uploaded")]
    EmptyUpload,

    #[error("multipart field '{0}' is missing")]
    MissingField(&'static str),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("invalid image name: {0}")]
    InvalidName(String),
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthRejection),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("blocking task failed")]
    Blocking(#[from] BlockingError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AssetError {
    fn public_message(&self) -> String {
        match self {
            // I/O detail stays in the log; paths are not for clients.
            AssetError::Storage(_) => "image storage error".to_string(),
            AssetError::Blocking(_) | AssetError::Internal(_) => "internal server error".to_string(),
            AssetError::Unauthorized(rejection) => rejection.to_string(),
            AssetError::Validation(e) => e.to_string(),
        }
    }
}

impl ResponseError for AssetError {
    fn status_code(&self) -> StatusCode {
        match self {
            AssetError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AssetError::Validation(ValidationError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AssetError::Validation(_) => StatusCode::BAD_REQUEST,
            AssetError::Storage(_) | AssetError::Blocking(_) | AssetError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(serde_json::json!({
            "status": status.as_u16(),
            "message": self.public_message(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        let too_large = AssetError::from(ValidationError::PayloadTooLarge { size: 11, limit: 10 });
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let bad_type = AssetError::from(ValidationError::UnsupportedMediaType("exe".into()));
        assert_eq!(bad_type.status_code(), StatusCode::BAD_REQUEST);

        let unauthorized = AssetError::from(AuthRejection::MalformedHeader);
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);

        let io = AssetError::from(io::Error::new(io::ErrorKind::PermissionDenied, "/secret/path"));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_storage_error_hides_detail() {
        let err = AssetError::from(io::Error::new(io::ErrorKind::PermissionDenied, "/secret/path"));
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], 500);
        assert_eq!(json["message"], "image storage error");
    }
}
