//! Custom error types for the API service

use axum::{
    Json,
    extract::{multipart::MultipartError, multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::StoreError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// One or more fields failed validation
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Store(StoreError::Duplicate { .. }) => {
                StatusCode::CONFLICT
            }
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized request".to_string())
    }

    fn message_and_errors(&self) -> (String, Vec<Value>) {
        match self {
            ApiError::Validation(errors) => (
                "Received data is not valid".to_string(),
                errors
                    .iter()
                    .map(|e| json!({"field": e.field, "message": e.message}))
                    .collect(),
            ),
            ApiError::Store(StoreError::Duplicate { fields, .. }) => (
                format!("Duplicate value for {}", fields),
                Vec::new(),
            ),
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                ("Something went wrong".to_string(), Vec::new())
            }
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                ("Something went wrong".to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = self.message_and_errors();

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "data": null,
            "message": message,
            "errors": errors,
            "success": false,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

/// Collects field errors so every rule runs before the request is rejected
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.0.push(FieldError::new(field, message));
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.0))
        }
    }
}

/// Parse a path id
pub fn parse_id(field: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid(field, format!("Invalid {}", field)))
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = ApiError::from(StoreError::Duplicate {
            collection: "users".to_string(),
            fields: "email".to_string(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_field_errors_collects_all_failures() {
        let mut errors = FieldErrors::new();
        errors.check("title", Err("title is required".to_string()));
        errors.check("description", Ok(()));
        errors.push("thumbnail", "thumbnail is required");

        match errors.finish() {
            Err(ApiError::Validation(list)) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].field, "title");
                assert_eq!(list[1].field, "thumbnail");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("videoId", "not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id("videoId", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        let (message, errors) = err.message_and_errors();
        assert_eq!(message, "Something went wrong");
        assert!(errors.is_empty());
    }
}
