//! Grade rate model (CNSS/IPTS percentages per grade)

use serde::{Deserialize, Serialize};

/// Grade rate entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct GradeRate {
    pub id: i64,
    pub grade: String,
    /// Social contribution, percent of base salary
    pub cnss_rate: f64,
    /// Income tax, percent of base salary
    pub ipts_rate: f64,
    pub updated_at: i64,
}

/// Create grade rate payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRateCreate {
    pub grade: String,
    pub cnss_rate: f64,
    pub ipts_rate: f64,
}

/// Update grade rate payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRateUpdate {
    pub grade: Option<String>,
    pub cnss_rate: Option<f64>,
    pub ipts_rate: Option<f64>,
}
