//! Storage collaborators
//!
//! [`PayrollStore`] is the narrow read/write contract the service depends on.
//! [`MemoryStore`] backs development and tests, [`PgStore`] backs deployments.

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CareerEvent, Complaint, ComplaintStatus, Employee, EmployeeCreate, EmployeeUpdate, GradeRate,
    GradeRateCreate, GradeRateUpdate, PaymentStatus, Role, SalaryRecord, User, UserQuery,
};
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Conditional write found the row in another state than expected
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Delete refused by a foreign key
    #[error("Still referenced: {0}")]
    Referenced(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::Referenced(db.message().to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database(format!("migration failed: {err}"))
    }
}

impl StoreError {
    /// Map to an API error; `NotFound`/`Duplicate` carry the given codes
    pub fn into_app(self, not_found: ErrorCode, duplicate: ErrorCode) -> AppError {
        match self {
            StoreError::NotFound(what) => AppError::new(not_found).with_detail("resource", what),
            StoreError::Duplicate(what) => AppError::new(duplicate).with_detail("resource", what),
            StoreError::Conflict(what) => {
                AppError::new(ErrorCode::ConcurrentModification).with_detail("resource", what)
            }
            StoreError::Referenced(what) => {
                AppError::new(ErrorCode::ResourceInUse).with_detail("resource", what)
            }
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "Storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// New user row (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub matricule: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Account columns an admin may change (password already hashed)
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

/// New salary record with every derived field already computed
#[derive(Debug, Clone, PartialEq)]
pub struct NewSalaryRecord {
    pub employee_id: i64,
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i32,
    pub base_salary: i64,
    pub allowance: i64,
    pub cnss_amount: i64,
    pub ipts_amount: i64,
    pub net_salary: i64,
    pub recall_amount: i64,
    pub liquidated_amount: i64,
    pub payment_status: PaymentStatus,
    pub observations: Option<String>,
    pub created_by: Option<i64>,
}

/// Content columns an owner may edit; status columns are never touched
#[derive(Debug, Clone)]
pub struct ComplaintEdit {
    pub complaint_type: String,
    pub description: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub attachments: Vec<String>,
}

/// Status move applied only while the complaint is still in `from`
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub from: ComplaintStatus,
    pub to: ComplaintStatus,
    pub resolved_at: Option<i64>,
    pub resolved_by: Option<i64>,
}

/// New complaint row, always created `pending`
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub employee_id: i64,
    pub complaint_type: String,
    pub description: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub attachments: Vec<String>,
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    // ── Users ──
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_matricule(&self, matricule: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// One page of accounts and the total matching `query.search`
    async fn list_users(&self, query: &UserQuery) -> StoreResult<(Vec<User>, u64)>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User>;
    /// `Referenced` while salary records or complaint resolutions point at it
    async fn delete_user(&self, id: i64) -> StoreResult<()>;
    /// Ids of active admin accounts (the audience of admin notifications)
    async fn admin_user_ids(&self) -> StoreResult<Vec<i64>>;

    // ── Employees ──
    async fn get_employee(&self, id: i64) -> StoreResult<Option<Employee>>;
    async fn find_employee_by_matricule(&self, matricule: &str) -> StoreResult<Option<Employee>>;
    /// Also opens the first career event at `entry_date`
    async fn create_employee(&self, employee: EmployeeCreate) -> StoreResult<Employee>;
    /// A grade or service change closes the current career event on
    /// `effective` and opens a new one
    async fn update_employee(
        &self,
        id: i64,
        update: EmployeeUpdate,
        effective: NaiveDate,
    ) -> StoreResult<Employee>;
    /// `Referenced` while salary records or complaints exist for it
    async fn delete_employee(&self, id: i64) -> StoreResult<()>;
    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;
    /// Distinct departments, sorted
    async fn employee_departments(&self) -> StoreResult<Vec<String>>;
    /// Case-insensitive substring match on matricule and names
    async fn search_employees(&self, query: &str) -> StoreResult<Vec<Employee>>;
    /// Newest first
    async fn career_history(&self, employee_id: i64) -> StoreResult<Vec<CareerEvent>>;

    // ── Grade rates ──
    async fn list_grade_rates(&self) -> StoreResult<Vec<GradeRate>>;
    async fn get_grade_rate(&self, grade: &str) -> StoreResult<Option<GradeRate>>;
    async fn create_grade_rate(&self, rate: GradeRateCreate) -> StoreResult<GradeRate>;
    async fn update_grade_rate(&self, id: i64, update: GradeRateUpdate) -> StoreResult<GradeRate>;
    async fn delete_grade_rate(&self, id: i64) -> StoreResult<()>;

    // ── Salary records ──
    async fn create_salary_record(&self, record: NewSalaryRecord) -> StoreResult<SalaryRecord>;
    async fn get_salary_record(&self, id: i64) -> StoreResult<Option<SalaryRecord>>;
    /// Replace every mutable column if the stored version still equals
    /// `record.version`, bumping it; `Conflict` otherwise
    async fn update_salary_record(&self, record: SalaryRecord) -> StoreResult<SalaryRecord>;
    async fn list_salary_records(&self) -> StoreResult<Vec<SalaryRecord>>;
    async fn list_salary_records_for_employee(
        &self,
        employee_id: i64,
    ) -> StoreResult<Vec<SalaryRecord>>;

    // ── Complaints ──
    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<Complaint>;
    async fn get_complaint(&self, id: i64) -> StoreResult<Option<Complaint>>;
    /// Overwrite the content columns; `Conflict` once resolved
    async fn update_complaint(&self, id: i64, edit: ComplaintEdit) -> StoreResult<Complaint>;
    /// Compare-and-set on status; `Conflict` unless the stored status is
    /// still `change.from`
    async fn set_complaint_status(&self, id: i64, change: StatusChange)
    -> StoreResult<Complaint>;
    /// `Conflict` once resolved
    async fn delete_complaint(&self, id: i64) -> StoreResult<()>;
    async fn list_complaints(&self, status: Option<ComplaintStatus>) -> StoreResult<Vec<Complaint>>;
    async fn list_complaints_for_employee(&self, employee_id: i64) -> StoreResult<Vec<Complaint>>;
}
