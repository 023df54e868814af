//! Error domains, derived from the code range

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Domain of an [`ErrorCode`], taken from its thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    /// Grade rates and salary records
    Payroll,
    Complaint,
    Employee,
    /// Logged server-side when returned
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::Payroll,
            4 => Self::Complaint,
            8 => Self::Employee,
            9.. => Self::System,
            _ => Self::General,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
