//! User account model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum Role {
    Admin,
    Accountant,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Accountant => "accountant",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "accountant" => Ok(Role::Accountant),
            "employee" => Ok(Role::Employee),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// User entity (includes the password hash, never serialized to clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub matricule: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            matricule: self.matricule.clone(),
            role: self.role,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Public view of a user (`/api/auth/me`, login response)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub matricule: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub matricule: String,
    pub password: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Partial account update (admin); a new password is re-hashed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Sortable columns of the account list
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UserSort {
    #[default]
    LastName,
    FirstName,
    Matricule,
    Role,
    CreatedAt,
}

/// Account list query: 1-based page, case-insensitive search over
/// matricule and names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
    pub sort_by: UserSort,
    pub sort_desc: bool,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: String::new(),
            sort_by: UserSort::default(),
            sort_desc: false,
        }
    }
}

impl UserQuery {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp page to >= 1 and limit to 1..=MAX_LIMIT
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, Self::MAX_LIMIT);
        self.search = self.search.trim().to_string();
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub items: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Response to an admin password reset; the clear password is shown once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub user: UserSummary,
    pub password: String,
}

/// Login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub matricule: String,
    pub password: String,
}
