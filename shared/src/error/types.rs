//! Error value and its JSON body

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error returned by every API handler
///
/// Serialized as `{"code": <u16>, "message": "...", "details": {...}?}` with
/// the HTTP status derived from `code`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured context (offending field, current status, ...)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// `"<resource> not found"`, with the resource echoed in details
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{resource} not found"))
            .with_detail("resource", resource)
    }

    pub fn already_exists(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::with_message(ErrorCode::AlreadyExists, format!("{resource} already exists"))
            .with_detail("resource", resource)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn session_expired() -> Self {
        Self::new(ErrorCode::SessionExpired)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    pub fn too_many_requests() -> Self {
        Self::new(ErrorCode::TooManyRequests)
    }

    /// Wire body of this error
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code.code(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

/// JSON body of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl TryFrom<ErrorBody> for AppError {
    type Error = super::codes::InvalidErrorCode;

    /// Rebuild the error from a response body (client side)
    fn try_from(body: ErrorBody) -> Result<Self, Self::Error> {
        Ok(Self {
            code: ErrorCode::try_from(body.code)?,
            message: body.message,
            details: body.details,
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.code.category() == super::category::ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        }
        (self.http_status(), axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_comes_from_code() {
        let err = AppError::new(ErrorCode::ComplaintNotFound);
        assert_eq!(err.message, ErrorCode::ComplaintNotFound.message());
        assert!(err.details.is_none());
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn details_accumulate() {
        let err = AppError::new(ErrorCode::ComplaintInvalidTransition)
            .with_detail("from", "in_progress")
            .with_detail("to", "pending");
        let details = err.details.as_ref().unwrap();
        assert_eq!(details["from"], "in_progress");
        assert_eq!(details["to"], "pending");
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = AppError::not_found("Salary record");
        assert_eq!(err.to_string(), "Salary record not found");
        assert_eq!(err.details.unwrap()["resource"], "Salary record");
    }

    #[test]
    fn body_omits_empty_details() {
        let json = serde_json::to_value(AppError::not_authenticated().body()).unwrap();
        assert_eq!(json["code"], ErrorCode::NotAuthenticated.code());
        assert!(json["message"].is_string());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn body_round_trips_to_error() {
        let body = AppError::validation("Rate must be between 0 and 100")
            .with_detail("field", "cnssRate")
            .body();
        let json = serde_json::to_string(&body).unwrap();
        let parsed: ErrorBody = serde_json::from_str(&json).unwrap();
        let err = AppError::try_from(parsed).unwrap();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.unwrap()["field"], "cnssRate");
    }
}
