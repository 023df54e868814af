//! Unified service-layer error type for payroll-server
//!
//! `ServiceError` bridges storage and payroll errors to the API-layer error
//! (`AppError`), so handlers can use `?` on store calls and engine results.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::StoreError;
use crate::payroll::PayrollError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// - `Db`: infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ServiceError::App(AppError::not_found(what)),
            StoreError::Duplicate(what) => ServiceError::App(AppError::already_exists(what)),
            StoreError::Conflict(what) => ServiceError::App(
                AppError::new(ErrorCode::ConcurrentModification).with_detail("resource", what),
            ),
            StoreError::Referenced(what) => ServiceError::App(
                AppError::new(ErrorCode::ResourceInUse).with_detail("resource", what),
            ),
            StoreError::Database(msg) => ServiceError::Db(msg.into()),
        }
    }
}

impl From<PayrollError> for ServiceError {
    fn from(e: PayrollError) -> Self {
        ServiceError::App(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn store_errors_map_to_codes() {
        let app: AppError = ServiceError::from(StoreError::NotFound("employee".into())).into();
        assert_eq!(app.code, ErrorCode::NotFound);

        let app: AppError = ServiceError::from(StoreError::Duplicate("grade".into())).into();
        assert_eq!(app.code, ErrorCode::AlreadyExists);

        let app: AppError = ServiceError::from(StoreError::Conflict("complaint 7".into())).into();
        assert_eq!(app.code, ErrorCode::ConcurrentModification);

        let app: AppError = ServiceError::from(StoreError::Referenced("user 2".into())).into();
        assert_eq!(app.code, ErrorCode::ResourceInUse);

        let app: AppError = ServiceError::from(StoreError::Database("boom".into())).into();
        assert_eq!(app.code, ErrorCode::InternalError);
    }

    #[test]
    fn payroll_errors_pass_through() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = PayrollError::InvalidPeriod {
            start: date,
            end: date,
        };
        let app: AppError = ServiceError::from(err).into();
        assert_eq!(app.code, ErrorCode::InvalidPeriod);
    }
}
