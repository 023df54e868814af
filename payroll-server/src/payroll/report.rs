//! Payroll aggregation for dashboards
//!
//! Totals are plain integer sums accumulated in `i128`, so folding the same
//! records in any order or grouping yields identical results.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use chrono::Datelike;
use serde::Serialize;
use shared::models::SalaryRecord;

/// Summed monetary fields of a set of salary records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollTotals {
    pub record_count: u64,
    pub base_salary: i128,
    pub allowance: i128,
    pub cnss_amount: i128,
    pub ipts_amount: i128,
    pub net_salary: i128,
    pub recall_amount: i128,
    pub liquidated_amount: i128,
}

impl From<&SalaryRecord> for PayrollTotals {
    fn from(r: &SalaryRecord) -> Self {
        Self {
            record_count: 1,
            base_salary: r.base_salary.into(),
            allowance: r.allowance.into(),
            cnss_amount: r.cnss_amount.into(),
            ipts_amount: r.ipts_amount.into(),
            net_salary: r.net_salary.into(),
            recall_amount: r.recall_amount.into(),
            liquidated_amount: r.liquidated_amount.into(),
        }
    }
}

impl Add for PayrollTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            record_count: self.record_count + rhs.record_count,
            base_salary: self.base_salary + rhs.base_salary,
            allowance: self.allowance + rhs.allowance,
            cnss_amount: self.cnss_amount + rhs.cnss_amount,
            ipts_amount: self.ipts_amount + rhs.ipts_amount,
            net_salary: self.net_salary + rhs.net_salary,
            recall_amount: self.recall_amount + rhs.recall_amount,
            liquidated_amount: self.liquidated_amount + rhs.liquidated_amount,
        }
    }
}

impl AddAssign for PayrollTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for PayrollTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a SalaryRecord> for PayrollTotals {
    fn sum<I: Iterator<Item = &'a SalaryRecord>>(iter: I) -> Self {
        iter.map(PayrollTotals::from).sum()
    }
}

/// Calendar month of a record's start date, by department
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBucket {
    #[serde(flatten)]
    pub key: BucketKey,
    pub totals: PayrollTotals,
}

/// Consolidated payroll view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollReport {
    /// Sorted by (year, month, department)
    pub buckets: Vec<PayrollBucket>,
    pub total: PayrollTotals,
}

/// Consolidate records by month of `start_date` and employee department.
///
/// `departments` maps employee id to department; unknown employees land in
/// an empty-named department. `year` restricts buckets to one calendar year.
pub fn consolidate<'a, I>(
    records: I,
    departments: &HashMap<i64, String>,
    year: Option<i32>,
) -> PayrollReport
where
    I: IntoIterator<Item = &'a SalaryRecord>,
{
    let mut buckets: BTreeMap<BucketKey, PayrollTotals> = BTreeMap::new();
    for record in records {
        let start = record.start_date;
        if year.is_some_and(|y| start.year() != y) {
            continue;
        }
        let key = BucketKey {
            year: start.year(),
            month: start.month(),
            department: departments
                .get(&record.employee_id)
                .cloned()
                .unwrap_or_default(),
        };
        *buckets.entry(key).or_default() += PayrollTotals::from(record);
    }

    let total = buckets.values().copied().sum();
    PayrollReport {
        buckets: buckets
            .into_iter()
            .map(|(key, totals)| PayrollBucket { key, totals })
            .collect(),
        total,
    }
}

/// Accountant dashboard figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountantStats {
    pub created_files: u64,
    pub total_liquidated: i128,
    pub total_recalls: i128,
    pub treated_employees: u64,
}

pub fn accountant_stats<'a, I>(records: I) -> AccountantStats
where
    I: IntoIterator<Item = &'a SalaryRecord>,
{
    let mut employees = HashSet::new();
    let mut totals = PayrollTotals::default();
    for record in records {
        employees.insert(record.employee_id);
        totals += PayrollTotals::from(record);
    }
    AccountantStats {
        created_files: totals.record_count,
        total_liquidated: totals.liquidated_amount,
        total_recalls: totals.recall_amount,
        treated_employees: employees.len() as u64,
    }
}

/// Outstanding balance of an employee: sum of recall amounts
pub fn total_due<'a, I>(records: I) -> i64
where
    I: IntoIterator<Item = &'a SalaryRecord>,
{
    let total: PayrollTotals = records.into_iter().sum();
    total.recall_amount.clamp(i64::MIN.into(), i64::MAX.into()) as i64
}
