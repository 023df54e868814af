//! Complaint Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::employee::EmployeeSummary;

/// Complaint status
///
/// `Resolved` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Resolved)
    }

    /// Allowed moves: pending -> in_progress, pending|in_progress -> resolved
    pub fn can_transition_to(&self, next: ComplaintStatus) -> bool {
        matches!(
            (self, next),
            (ComplaintStatus::Pending, ComplaintStatus::InProgress)
                | (ComplaintStatus::Pending, ComplaintStatus::Resolved)
                | (ComplaintStatus::InProgress, ComplaintStatus::Resolved)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }
}

/// Complaint entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: i64,
    pub employee_id: i64,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(rename = "type"))]
    pub complaint_type: String,
    pub description: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub attachments: Vec<String>,
    pub status: ComplaintStatus,
    pub resolved_at: Option<i64>,
    pub resolved_by: Option<i64>,
    pub created_at: i64,
}

/// Complaint snapshot pushed to admins and listed on the admin console
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintWithEmployee {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub employee: EmployeeSummary,
}

/// Create complaint payload (employee is taken from the session)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintCreate {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub description: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Update complaint payload (owner edits while not resolved)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintUpdate {
    #[serde(rename = "type")]
    pub complaint_type: Option<String>,
    pub description: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub attachments: Option<Vec<String>>,
}

/// Admin status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintStatusUpdate {
    pub status: ComplaintStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_is_terminal() {
        assert!(ComplaintStatus::Resolved.is_terminal());
        assert!(!ComplaintStatus::Resolved.can_transition_to(ComplaintStatus::Pending));
        assert!(!ComplaintStatus::Resolved.can_transition_to(ComplaintStatus::InProgress));
        assert!(!ComplaintStatus::Resolved.can_transition_to(ComplaintStatus::Resolved));
    }

    #[test]
    fn forward_transitions() {
        assert!(ComplaintStatus::Pending.can_transition_to(ComplaintStatus::InProgress));
        assert!(ComplaintStatus::Pending.can_transition_to(ComplaintStatus::Resolved));
        assert!(ComplaintStatus::InProgress.can_transition_to(ComplaintStatus::Resolved));
        assert!(!ComplaintStatus::InProgress.can_transition_to(ComplaintStatus::Pending));
    }

    #[test]
    fn snapshot_flattens_complaint_and_nests_employee() {
        let snapshot = ComplaintWithEmployee {
            complaint: Complaint {
                id: 7,
                employee_id: 3,
                complaint_type: "salary".into(),
                description: "Missing allowance".into(),
                period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                period_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                attachments: vec![],
                status: ComplaintStatus::InProgress,
                resolved_at: None,
                resolved_by: None,
                created_at: 1,
            },
            employee: EmployeeSummary {
                matricule: "E003".into(),
                first_name: "Koffi".into(),
                last_name: "Mensah".into(),
                department: "Finance".into(),
                service: "Paie".into(),
            },
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["type"], "salary");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["periodStart"], "2024-01-01");
        assert_eq!(json["employee"]["matricule"], "E003");
    }
}
