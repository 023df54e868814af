//! Application state for payroll-server

use std::sync::Arc;

use crate::auth::rate_limit::RateLimiter;
use crate::auth::{MemorySessionStore, SessionStore};
use crate::config::Config;
use crate::db::{MemoryStore, PayrollStore, PgStore, seed};
use crate::live::{ConnectionRegistry, Notifier, UpgradeGate};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Storage collaborator (PostgreSQL or in-memory)
    pub store: Arc<dyn PayrollStore>,
    pub sessions: Arc<dyn SessionStore>,
    /// Live WebSocket connections
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Notifier,
    pub gate: Arc<UpgradeGate>,
    /// Rate limiter for the login route
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect storage, seed defaults and assemble the live subsystem
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn PayrollStore> = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                tracing::info!("Connected to PostgreSQL, migrations applied");
                Arc::new(pg)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        seed::ensure_default_grade_rates(store.as_ref()).await?;
        if let Some(admin) = &config.bootstrap_admin {
            seed::ensure_admin(store.as_ref(), admin).await?;
        }

        Ok(Self::with_store(config.clone(), store))
    }

    /// State over an existing store, with in-memory sessions
    pub fn with_store(config: Config, store: Arc<dyn PayrollStore>) -> Self {
        let sessions: Arc<dyn SessionStore> =
            Arc::new(MemorySessionStore::new(config.session_ttl));
        let registry = Arc::new(ConnectionRegistry::new(config.ws_outbound_buffer));
        let notifier = Notifier::new(registry.clone(), store.clone());
        let gate = Arc::new(UpgradeGate::new(
            config.ws_path.clone(),
            config.ws_auth_mode,
            config.session_cookie.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            sessions,
            registry,
            notifier,
            gate,
            rate_limiter: RateLimiter::new(),
        }
    }
}
