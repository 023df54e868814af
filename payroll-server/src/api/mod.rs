//! HTTP and WebSocket routes for payroll-server

pub mod auth;
pub mod complaint;
pub mod dashboard;
pub mod employee;
pub mod grade_rate;
pub mod health;
pub mod salary;
pub mod user;
pub mod ws;

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::login_rate_limit;
use crate::error::ServiceError;
use crate::live::gate::is_websocket_upgrade;
use crate::state::AppState;

pub(crate) type ApiResult<T> = Result<Json<T>, ServiceError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let login = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let accounts = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(user::list).post(user::create))
        .route("/api/users/{id}", put(user::update).delete(user::delete))
        .route(
            "/api/users/{id}/reset-password",
            post(user::reset_password),
        )
        .route(
            "/api/employees",
            get(employee::list).post(employee::create),
        )
        .route("/api/employees/me", get(employee::me))
        .route("/api/employees/me/salaries", get(salary::my_salaries))
        .route("/api/employees/departments", get(employee::departments))
        .route("/api/employees/search", get(employee::search))
        // GET takes a matricule, PUT and DELETE a numeric id
        .route(
            "/api/employees/{key}",
            get(employee::get)
                .put(employee::update)
                .delete(employee::delete),
        )
        .route(
            "/api/career-history/{matricule}",
            get(employee::career_history),
        );

    let complaints = Router::new()
        .route(
            "/api/complaints",
            get(complaint::list).post(complaint::create),
        )
        .route("/api/complaints/me", get(complaint::list_mine))
        .route(
            "/api/complaints/{id}",
            axum::routing::patch(complaint::update).delete(complaint::delete),
        )
        .route("/api/complaints/{id}/status", put(complaint::set_status))
        .route("/api/complaints/{id}/resolve", put(complaint::resolve));

    let payroll = Router::new()
        .route(
            "/api/grade-rates",
            get(grade_rate::list).post(grade_rate::create),
        )
        .route(
            "/api/grade-rates/{id}",
            put(grade_rate::update).delete(grade_rate::delete),
        )
        .route(
            "/api/salary-records",
            get(salary::list).post(salary::create),
        )
        .route("/api/salary-records/{id}", put(salary::update))
        .route(
            "/api/salary-records/employee/{matricule}",
            get(salary::list_for_matricule),
        );

    let dashboard = Router::new()
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route(
            "/api/dashboard/accountant-stats",
            get(dashboard::accountant_stats),
        )
        .route("/api/dashboard/payroll", get(dashboard::payroll))
        .route(
            "/api/dashboard/employee-growth/{year}",
            get(dashboard::employee_growth),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route(&state.config.ws_path, get(ws::handle_upgrade))
        .merge(login)
        .merge(accounts)
        .merge(complaints)
        .merge(payroll)
        .merge(dashboard)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            reject_stray_upgrades,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Refuse WebSocket upgrades off the endpoint path before routing and session lookup
async fn reject_stray_upgrades(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_websocket_upgrade(request.headers())
        && let Err(rejection) = state.gate.check_path(request.uri().path())
    {
        tracing::warn!(path = %request.uri().path(), expected = %state.gate.path(), "WebSocket upgrade on wrong path");
        return rejection.into_response();
    }
    next.run(request).await
}

async fn fallback(uri: Uri) -> Response {
    AppError::not_found(format!("route {}", uri.path())).into_response()
}
