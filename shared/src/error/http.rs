//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::GradeRateNotFound
            | Self::SalaryRecordNotFound
            | Self::ComplaintNotFound
            | Self::EmployeeNotFound
            | Self::UserNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::GradeRateExists
            | Self::MatriculeExists
            | Self::ComplaintAlreadyResolved
            | Self::ComplaintInvalidTransition
            | Self::ConcurrentModification
            | Self::ResourceInUse => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::InvalidCredentials | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::AccountDisabled
            | Self::PermissionDenied
            | Self::RoleRequired
            | Self::SelfModificationDenied
            | Self::ComplaintNotOwned
            | Self::EmployeeNotLinked => StatusCode::FORBIDDEN,

            // 429 Too Many Requests
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
