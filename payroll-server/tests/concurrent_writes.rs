//! Racing writes on one row: both requests read before either writes

mod common;

use std::sync::Arc;

use common::yielding::YieldingStore;
use common::{Harness, drain, harness_over};
use http::StatusCode;
use payroll_server::db::PayrollStore;
use payroll_server::live::WsAuthMode;
use serde_json::json;
use shared::models::ComplaintStatus;

async fn racing_harness() -> Harness {
    harness_over(WsAuthMode::Strict, |store| -> Arc<dyn PayrollStore> {
        Arc::new(YieldingStore(store))
    })
    .await
}

async fn file_complaint(h: &Harness, cookie: &str) -> i64 {
    let (status, created) = h
        .call(
            "POST",
            "/api/complaints",
            Some(cookie),
            Some(json!({
                "type": "salary",
                "description": "Allowance missing from the January payslip",
                "periodStart": "2024-01-01",
                "periodEnd": "2024-01-31"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn racing_resolutions_land_once() {
    let h = racing_harness().await;
    let admin_cookie = h.login("ADM001").await;
    let employee_cookie = h.login("EMP001").await;
    let id = file_complaint(&h, &employee_cookie).await;

    let mut admin_conn = h.connect(&h.admin);
    let uri = format!("/api/complaints/{id}/resolve");
    let ((first, a), (second, b)) = tokio::join!(
        h.call("PUT", &uri, Some(&admin_cookie), None),
        h.call("PUT", &uri, Some(&admin_cookie), None),
    );

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    let loser = if first == StatusCode::CONFLICT { a } else { b };
    assert_eq!(loser["code"], 4002);

    let events = drain(&mut admin_conn);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "COMPLAINT_UPDATED");
    assert_eq!(events[0]["complaint"]["status"], "resolved");
}

#[tokio::test]
async fn owner_edit_racing_a_resolution_keeps_it_resolved() {
    let h = racing_harness().await;
    let admin_cookie = h.login("ADM001").await;
    let employee_cookie = h.login("EMP001").await;
    let id = file_complaint(&h, &employee_cookie).await;

    let complaint_path = format!("/api/complaints/{id}");
    let resolve_path = format!("/api/complaints/{id}/resolve");
    let ((edit_status, edit), (resolve_status, _)) = tokio::join!(
        h.call(
            "PATCH",
            &complaint_path,
            Some(&employee_cookie),
            Some(json!({ "description": "Allowance and overtime missing" })),
        ),
        h.call("PUT", &resolve_path, Some(&admin_cookie), None),
    );

    assert_eq!(resolve_status, StatusCode::OK);
    if edit_status == StatusCode::CONFLICT {
        assert_eq!(edit["code"], 4002);
    } else {
        assert_eq!(edit_status, StatusCode::OK);
    }

    let stored = h.store.get_complaint(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ComplaintStatus::Resolved);
    assert_eq!(stored.resolved_by, Some(h.admin.id));
}

#[tokio::test]
async fn withdrawal_racing_a_resolution_is_refused() {
    let h = racing_harness().await;
    let admin_cookie = h.login("ADM001").await;
    let employee_cookie = h.login("EMP001").await;
    let id = file_complaint(&h, &employee_cookie).await;

    let resolve_path = format!("/api/complaints/{id}/resolve");
    let complaint_path = format!("/api/complaints/{id}");
    let ((resolve_status, _), (delete_status, _)) = tokio::join!(
        h.call("PUT", &resolve_path, Some(&admin_cookie), None),
        h.call("DELETE", &complaint_path, Some(&employee_cookie), None),
    );

    // Whichever lands first, the other sees it
    match (resolve_status, delete_status) {
        (StatusCode::OK, StatusCode::CONFLICT) => {
            assert!(h.store.get_complaint(id).await.unwrap().is_some());
        }
        (StatusCode::NOT_FOUND | StatusCode::CONFLICT, StatusCode::OK) => {
            assert!(h.store.get_complaint(id).await.unwrap().is_none());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn racing_salary_updates_keep_one_write() {
    let h = racing_harness().await;
    let cookie = h.login("CPT001").await;

    let (status, record) = h
        .call(
            "POST",
            "/api/salary-records",
            Some(&cookie),
            Some(json!({
                "employeeId": h.employee.id,
                "period": "Jan 2024",
                "startDate": "2024-01-01",
                "endDate": "2024-01-31",
                "baseSalary": 400000,
                "allowance": 0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["version"], 1);
    let uri = format!("/api/salary-records/{}", record["id"]);

    let ((first, a), (second, b)) = tokio::join!(
        h.call("PUT", &uri, Some(&cookie), Some(json!({ "liquidatedAmount": 100000 }))),
        h.call("PUT", &uri, Some(&cookie), Some(json!({ "liquidatedAmount": 200000 }))),
    );
    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    let (winner, loser) = if first == StatusCode::OK { (a, b) } else { (b, a) };
    assert_eq!(loser["code"], 10);
    assert_eq!(winner["version"], 2);

    // A caller holding version 1 is told the record moved on
    let (status, body) = h
        .call(
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "liquidatedAmount": 300000, "version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["version"], 2);

    let (status, body) = h
        .call(
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "liquidatedAmount": 300000, "version": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 3);
    assert_eq!(body["liquidatedAmount"], 300000);
}
