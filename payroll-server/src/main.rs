//! payroll-server: payroll/HR management service
//!
//! Long-running service that:
//! - Serves the payroll, complaint and dashboard API (cookie sessions)
//! - Computes salary records from grade-based CNSS/IPTS rates
//! - Pushes complaint events to admin WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use payroll_server::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payroll_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "Starting payroll-server (env: {}, ws: {} [{}])",
        config.environment,
        config.ws_path,
        config.ws_auth_mode
    );

    let state = AppState::new(&config).await?;

    // Keepalive pings and dead-connection eviction
    state
        .registry
        .spawn_keepalive(config.ws_keepalive, config.ws_max_missed_pongs);

    // Periodic expired-session purge (every 10 minutes)
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions purged");
            }
        }
    });

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("payroll-server HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
