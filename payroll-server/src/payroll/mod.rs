//! Payroll computation engine
//!
//! Pure functions deriving a salary record's monetary fields from the
//! employee's grade rate. All amounts are integers in the smallest currency
//! unit; percentage products go through `Decimal` and are rounded half-up
//! (away from zero) so that
//! `net_salary == base_salary + allowance - cnss_amount - ipts_amount`
//! holds exactly.

pub mod report;


use chrono::NaiveDate;
use rust_decimal::prelude::*;
use shared::error::{AppError, ErrorCode};
use shared::models::{GradeRate, PaymentStatus, SalaryRecord, SalaryRecordCreate, SalaryRecordUpdate};
use thiserror::Error;

use crate::db::NewSalaryRecord;

/// Rates are percentages
const PERCENT: Decimal = Decimal::ONE_HUNDRED;
const MAX_RATE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayrollError {
    #[error("no contribution rate configured for grade '{grade}'")]
    MissingGradeRate { grade: String },

    #[error("period end {end} is before start {start}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("{field} must be a finite percentage in [0, 100], got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: i64 },

    #[error("{field} overflows the monetary range")]
    Overflow { field: &'static str },
}

impl From<PayrollError> for AppError {
    fn from(err: PayrollError) -> Self {
        let code = match &err {
            PayrollError::MissingGradeRate { .. } => ErrorCode::GradeRateMissing,
            PayrollError::InvalidPeriod { .. } => ErrorCode::InvalidPeriod,
            PayrollError::RateOutOfRange { .. } => ErrorCode::RateOutOfRange,
            PayrollError::NegativeAmount { .. } | PayrollError::Overflow { .. } => {
                ErrorCode::InvalidAmount
            }
        };
        let app = AppError::with_message(code, err.to_string());
        match err {
            PayrollError::MissingGradeRate { grade } => app.with_detail("grade", grade),
            PayrollError::RateOutOfRange { field, .. }
            | PayrollError::NegativeAmount { field, .. }
            | PayrollError::Overflow { field } => app.with_detail("field", field),
            PayrollError::InvalidPeriod { .. } => app,
        }
    }
}

/// Caller-supplied amounts of one payroll period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollInput {
    pub base_salary: i64,
    pub allowance: i64,
    pub liquidated_amount: i64,
}

/// Derived amounts, never accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollAmounts {
    pub cnss_amount: i64,
    pub ipts_amount: i64,
    pub net_salary: i64,
    pub recall_amount: i64,
}

/// Validate a percentage rate
pub fn validate_rate(field: &'static str, value: f64) -> Result<(), PayrollError> {
    if !value.is_finite() || !(0.0..=MAX_RATE).contains(&value) {
        return Err(PayrollError::RateOutOfRange { field, value });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: i64) -> Result<(), PayrollError> {
    if value < 0 {
        return Err(PayrollError::NegativeAmount { field, value });
    }
    Ok(())
}

/// A missing rate is a hard error: defaulting to 0% would misstate payroll
pub fn require_rate(grade: &str, rate: Option<GradeRate>) -> Result<GradeRate, PayrollError> {
    rate.ok_or_else(|| PayrollError::MissingGradeRate {
        grade: grade.to_string(),
    })
}

/// Inclusive day count of a period (a single-day period is 1 day)
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> Result<i32, PayrollError> {
    if end < start {
        return Err(PayrollError::InvalidPeriod { start, end });
    }
    let days = (end - start).num_days() + 1;
    i32::try_from(days).map_err(|_| PayrollError::Overflow {
        field: "durationDays",
    })
}

/// `round(amount * rate / 100)`, half-up
fn percentage_of(field: &'static str, amount: i64, rate: f64) -> Result<i64, PayrollError> {
    validate_rate(field, rate)?;
    let rate = Decimal::from_f64(rate).ok_or(PayrollError::RateOutOfRange { field, value: rate })?;
    (Decimal::from(amount) * rate / PERCENT)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PayrollError::Overflow { field })
}

/// Compute deductions, net pay and the recall delta
pub fn compute(input: &PayrollInput, rate: &GradeRate) -> Result<PayrollAmounts, PayrollError> {
    require_non_negative("baseSalary", input.base_salary)?;
    require_non_negative("allowance", input.allowance)?;
    require_non_negative("liquidatedAmount", input.liquidated_amount)?;

    let cnss_amount = percentage_of("cnssRate", input.base_salary, rate.cnss_rate)?;
    let ipts_amount = percentage_of("iptsRate", input.base_salary, rate.ipts_rate)?;

    let net_salary = input
        .base_salary
        .checked_add(input.allowance)
        .and_then(|gross| gross.checked_sub(cnss_amount))
        .and_then(|v| v.checked_sub(ipts_amount))
        .ok_or(PayrollError::Overflow { field: "netSalary" })?;
    let recall_amount = net_salary
        .checked_sub(input.liquidated_amount)
        .ok_or(PayrollError::Overflow {
            field: "recallAmount",
        })?;

    Ok(PayrollAmounts {
        cnss_amount,
        ipts_amount,
        net_salary,
        recall_amount,
    })
}

/// Settlement state implied by the disbursed amount
pub fn payment_status(liquidated_amount: i64, net_salary: i64) -> PaymentStatus {
    if liquidated_amount <= 0 {
        PaymentStatus::Unpaid
    } else if liquidated_amount >= net_salary {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    }
}

/// Build a new salary record from caller input and the employee's grade rate
pub fn prepare_record(
    input: SalaryRecordCreate,
    rate: &GradeRate,
    created_by: Option<i64>,
) -> Result<NewSalaryRecord, PayrollError> {
    let duration_days = duration_days(input.start_date, input.end_date)?;
    let amounts = compute(
        &PayrollInput {
            base_salary: input.base_salary,
            allowance: input.allowance,
            liquidated_amount: input.liquidated_amount,
        },
        rate,
    )?;
    let payment_status = input
        .payment_status
        .unwrap_or_else(|| payment_status(input.liquidated_amount, amounts.net_salary));

    Ok(NewSalaryRecord {
        employee_id: input.employee_id,
        period: input.period,
        start_date: input.start_date,
        end_date: input.end_date,
        duration_days,
        base_salary: input.base_salary,
        allowance: input.allowance,
        cnss_amount: amounts.cnss_amount,
        ipts_amount: amounts.ipts_amount,
        net_salary: amounts.net_salary,
        recall_amount: amounts.recall_amount,
        liquidated_amount: input.liquidated_amount,
        payment_status,
        observations: input.observations,
        created_by,
    })
}

/// Merge a partial update into an existing record and recompute derived fields
pub fn apply_update(
    mut record: SalaryRecord,
    update: SalaryRecordUpdate,
    rate: &GradeRate,
) -> Result<SalaryRecord, PayrollError> {
    if let Some(period) = update.period {
        record.period = period;
    }
    if let Some(start) = update.start_date {
        record.start_date = start;
    }
    if let Some(end) = update.end_date {
        record.end_date = end;
    }
    if let Some(base) = update.base_salary {
        record.base_salary = base;
    }
    if let Some(allowance) = update.allowance {
        record.allowance = allowance;
    }
    if let Some(liquidated) = update.liquidated_amount {
        record.liquidated_amount = liquidated;
    }
    if update.observations.is_some() {
        record.observations = update.observations;
    }

    record.duration_days = duration_days(record.start_date, record.end_date)?;
    let amounts = compute(
        &PayrollInput {
            base_salary: record.base_salary,
            allowance: record.allowance,
            liquidated_amount: record.liquidated_amount,
        },
        rate,
    )?;
    record.cnss_amount = amounts.cnss_amount;
    record.ipts_amount = amounts.ipts_amount;
    record.net_salary = amounts.net_salary;
    record.recall_amount = amounts.recall_amount;
    record.payment_status = update
        .payment_status
        .unwrap_or_else(|| payment_status(record.liquidated_amount, record.net_salary));

    Ok(record)
}
