//! Shared fixtures: in-memory state with one account per role

#![allow(dead_code)]

pub mod yielding;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::NaiveDate;
use http::{Request, StatusCode, header};
use payroll_server::db::{MemoryStore, NewUser, PayrollStore};
use payroll_server::live::{Outbound, Registration, WsAuthMode};
use payroll_server::util::hash_password;
use payroll_server::{AppState, Config, api};
use serde_json::Value;
use shared::models::{Employee, EmployeeCreate, GradeRateCreate, Role, User};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub admin: User,
    pub accountant: User,
    pub employee_user: User,
    pub employee: Employee,
}

async fn user(store: &MemoryStore, matricule: &str, role: Role) -> User {
    store
        .create_user(NewUser {
            matricule: matricule.into(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role,
            first_name: "Test".into(),
            last_name: matricule.into(),
            phone: None,
            email: None,
        })
        .await
        .unwrap()
}

pub async fn add_employee(store: &MemoryStore, matricule: &str, grade: &str) -> Employee {
    store
        .create_employee(EmployeeCreate {
            matricule: matricule.into(),
            first_name: "Kossi".into(),
            last_name: "Mensah".into(),
            grade: grade.into(),
            grade_index: 2,
            service: "Comptabilité".into(),
            department: "Finance".into(),
            entry_date: NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
            phone: None,
            email: None,
        })
        .await
        .unwrap()
}

pub async fn harness_with(mode: WsAuthMode) -> Harness {
    harness_over(mode, |store| -> Arc<dyn PayrollStore> { store }).await
}

/// Fixtures seeded into a `MemoryStore`, served through whatever `wrap` returns
pub async fn harness_over<F>(mode: WsAuthMode, wrap: F) -> Harness
where
    F: FnOnce(Arc<MemoryStore>) -> Arc<dyn PayrollStore>,
{
    let store = Arc::new(MemoryStore::new());
    store
        .create_grade_rate(GradeRateCreate {
            grade: "B2".into(),
            cnss_rate: 3.2,
            ipts_rate: 8.0,
        })
        .await
        .unwrap();

    let admin = user(&store, "ADM001", Role::Admin).await;
    let accountant = user(&store, "CPT001", Role::Accountant).await;
    let employee_user = user(&store, "EMP001", Role::Employee).await;
    let employee = add_employee(&store, "EMP001", "B2").await;

    let config = Config {
        ws_auth_mode: mode,
        ..Config::default()
    };
    let state = AppState::with_store(config, wrap(store.clone()));
    let app = api::create_router(state.clone());

    Harness {
        app,
        state,
        store,
        admin,
        accountant,
        employee_user,
        employee,
    }
}

pub async fn harness() -> Harness {
    harness_with(WsAuthMode::Strict).await
}

impl Harness {
    /// Log in through the API and return the `Cookie` header value
    pub async fn login(&self, matricule: &str) -> String {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "matricule": matricule, "password": PASSWORD })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "login {matricule}");
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.call_with_headers(method, uri, cookie, &[], body).await
    }

    pub async fn call_with_headers(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Track a connection directly in the registry, as the WS task would
    pub fn connect(&self, user: &User) -> Registration {
        self.state.registry.register(Some(user.id), Some(user.role))
    }
}

/// Every event queued for a connection, decoded
pub fn drain(reg: &mut Registration) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(frame) = reg.rx.try_recv() {
        if let Outbound::Event(json) = frame {
            events.push(serde_json::from_str(&json).unwrap());
        }
    }
    events
}
