//! Unified error codes for the payroll service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Payroll errors (grade rates, salary records)
//! - 4xxx: Complaint errors
//! - 8xxx: Employee errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the web client can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Too many requests
    TooManyRequests = 9,
    /// Row changed between read and write
    ConcurrentModification = 10,
    /// Row is still referenced by other records
    ResourceInUse = 11,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (matricule/password)
    InvalidCredentials = 1002,
    /// Session has expired
    SessionExpired = 1005,
    /// Account is disabled
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admins cannot delete or demote their own account
    SelfModificationDenied = 2004,

    // ==================== 3xxx: Payroll ====================
    /// No grade rate configured for the employee's grade
    GradeRateMissing = 3001,
    /// Grade rate not found
    GradeRateNotFound = 3002,
    /// Grade rate already configured for this grade
    GradeRateExists = 3003,
    /// Rate outside [0, 100]
    RateOutOfRange = 3004,
    /// Period end date before start date
    InvalidPeriod = 3005,
    /// Monetary amount is negative or overflows
    InvalidAmount = 3006,
    /// Salary record not found
    SalaryRecordNotFound = 3101,

    // ==================== 4xxx: Complaint ====================
    /// Complaint not found
    ComplaintNotFound = 4001,
    /// Complaint already resolved
    ComplaintAlreadyResolved = 4002,
    /// Complaint status transition not allowed
    ComplaintInvalidTransition = 4003,
    /// Complaint belongs to another employee
    ComplaintNotOwned = 4004,

    // ==================== 8xxx: Employee ====================
    /// Employee not found
    EmployeeNotFound = 8001,
    /// Matricule already used
    MatriculeExists = 8002,
    /// User account not linked to an employee record
    EmployeeNotLinked = 8003,
    /// User not found
    UserNotFound = 8101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::TooManyRequests => "Too many requests, try again later",
            ErrorCode::ConcurrentModification => "Resource was modified by another request",
            ErrorCode::ResourceInUse => "Resource is still referenced",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::InvalidCredentials => "Invalid matricule or password",
            ErrorCode::SessionExpired => "Session has expired",
            ErrorCode::AccountDisabled => "Account is disabled",

            // Permission
            ErrorCode::PermissionDenied => "Insufficient permissions",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::SelfModificationDenied => "Cannot delete or demote your own account",

            // Payroll
            ErrorCode::GradeRateMissing => "No contribution rate configured for this grade",
            ErrorCode::GradeRateNotFound => "Grade rate not found",
            ErrorCode::GradeRateExists => "A rate is already configured for this grade",
            ErrorCode::RateOutOfRange => "Rate must be between 0 and 100",
            ErrorCode::InvalidPeriod => "Period end date is before its start date",
            ErrorCode::InvalidAmount => "Invalid monetary amount",
            ErrorCode::SalaryRecordNotFound => "Salary record not found",

            // Complaint
            ErrorCode::ComplaintNotFound => "Complaint not found",
            ErrorCode::ComplaintAlreadyResolved => "Complaint has already been resolved",
            ErrorCode::ComplaintInvalidTransition => "Complaint status transition not allowed",
            ErrorCode::ComplaintNotOwned => "Complaint belongs to another employee",

            // Employee
            ErrorCode::EmployeeNotFound => "Employee not found",
            ErrorCode::MatriculeExists => "Matricule already exists",
            ErrorCode::EmployeeNotLinked => "User account is not linked to an employee",
            ErrorCode::UserNotFound => "User not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            9 => Ok(ErrorCode::TooManyRequests),
            10 => Ok(ErrorCode::ConcurrentModification),
            11 => Ok(ErrorCode::ResourceInUse),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1005 => Ok(ErrorCode::SessionExpired),
            1007 => Ok(ErrorCode::AccountDisabled),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2004 => Ok(ErrorCode::SelfModificationDenied),

            // Payroll
            3001 => Ok(ErrorCode::GradeRateMissing),
            3002 => Ok(ErrorCode::GradeRateNotFound),
            3003 => Ok(ErrorCode::GradeRateExists),
            3004 => Ok(ErrorCode::RateOutOfRange),
            3005 => Ok(ErrorCode::InvalidPeriod),
            3006 => Ok(ErrorCode::InvalidAmount),
            3101 => Ok(ErrorCode::SalaryRecordNotFound),

            // Complaint
            4001 => Ok(ErrorCode::ComplaintNotFound),
            4002 => Ok(ErrorCode::ComplaintAlreadyResolved),
            4003 => Ok(ErrorCode::ComplaintInvalidTransition),
            4004 => Ok(ErrorCode::ComplaintNotOwned),

            // Employee
            8001 => Ok(ErrorCode::EmployeeNotFound),
            8002 => Ok(ErrorCode::MatriculeExists),
            8003 => Ok(ErrorCode::EmployeeNotLinked),
            8101 => Ok(ErrorCode::UserNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::GradeRateMissing.code(), 3001);
        assert_eq!(ErrorCode::InvalidPeriod.code(), 3005);
        assert_eq!(ErrorCode::ComplaintNotFound.code(), 4001);
        assert_eq!(ErrorCode::EmployeeNotFound.code(), 8001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(3001), Ok(ErrorCode::GradeRateMissing));
        assert_eq!(ErrorCode::try_from(4002), Ok(ErrorCode::ComplaintAlreadyResolved));
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(1), Err(InvalidErrorCode(1)));
        assert_eq!(ErrorCode::try_from(6001), Err(InvalidErrorCode(6001)));
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&ErrorCode::NotFound).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&ErrorCode::GradeRateMissing).unwrap(),
            "3001"
        );
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("10000");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::ComplaintNotFound), "4001");
    }
}
