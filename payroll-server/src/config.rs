//! Payroll server configuration

use std::time::Duration;

use shared::error::{AppError, ErrorCode};

use crate::live::WsAuthMode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

/// Payroll server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port (API + WebSocket)
    pub http_port: u16,
    /// PostgreSQL connection URL; `None` selects the in-memory store
    pub database_url: Option<String>,
    /// The single WebSocket endpoint
    pub ws_path: String,
    /// Upgrade policy for requests without an authenticated session
    pub ws_auth_mode: WsAuthMode,
    /// Keepalive ping cadence
    pub ws_keepalive: Duration,
    /// Ping cycles without a pong before eviction (0 disables eviction)
    pub ws_max_missed_pongs: u32,
    /// Per-connection outbound frame buffer
    pub ws_outbound_buffer: usize,
    /// Session cookie name
    pub session_cookie: String,
    /// Session lifetime
    pub session_ttl: Duration,
    /// Admin account created at startup when missing
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub matricule: String,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            http_port: 5000,
            database_url: None,
            ws_path: "/ws".into(),
            ws_auth_mode: WsAuthMode::Strict,
            ws_keepalive: Duration::from_secs(30),
            ws_max_missed_pongs: 2,
            ws_outbound_buffer: 64,
            session_cookie: "sid".into(),
            session_ttl: Duration::from_secs(24 * 3600),
            bootstrap_admin: None,
        }
    }
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let defaults = Self::default();
        let environment = match std::env::var("ENVIRONMENT") {
            Ok(raw) => parse_environment(&raw)?,
            Err(_) => defaults.environment.clone(),
        };

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(invalid(format!("DATABASE_URL must be set in {environment} environment")));
        }

        let ws_auth_mode = match std::env::var("WS_AUTH_MODE") {
            Ok(v) => v
                .parse::<WsAuthMode>()
                .map_err(|e| invalid(format!("invalid WS_AUTH_MODE={v}: {e}")))?,
            Err(_) => WsAuthMode::Strict,
        };
        if ws_auth_mode == WsAuthMode::Permissive {
            if environment == "production" {
                return Err(invalid("WS_AUTH_MODE=permissive is not allowed in production"));
            }
            tracing::warn!("WebSocket upgrades accept anonymous clients (WS_AUTH_MODE=permissive)");
        }

        let ws_path = std::env::var("WS_PATH").unwrap_or(defaults.ws_path);
        if !ws_path.starts_with('/') {
            return Err(invalid(format!("WS_PATH must start with '/': {ws_path}")));
        }

        let bootstrap_admin = match (
            std::env::var("BOOTSTRAP_ADMIN_MATRICULE").ok(),
            std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(matricule), Some(password)) if !matricule.is_empty() => {
                if password.len() < 8 {
                    return Err(invalid("BOOTSTRAP_ADMIN_PASSWORD must be at least 8 characters"));
                }
                Some(BootstrapAdmin {
                    matricule,
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            http_port: parse_var("HTTP_PORT", defaults.http_port)?,
            database_url,
            ws_path,
            ws_auth_mode,
            ws_keepalive: Duration::from_secs(parse_var("WS_KEEPALIVE_SECS", 30u64)?.max(1)),
            ws_max_missed_pongs: parse_var("WS_MAX_MISSED_PONGS", defaults.ws_max_missed_pongs)?,
            ws_outbound_buffer: parse_var("WS_OUTBOUND_BUFFER", defaults.ws_outbound_buffer)?
                .max(1),
            session_cookie: std::env::var("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            session_ttl: session_ttl(parse_var("SESSION_TTL_HOURS", 24u64)?)?,
            bootstrap_admin,
            environment,
        })
    }
}

fn invalid(message: impl Into<String>) -> BoxError {
    Box::new(AppError::with_message(ErrorCode::ConfigError, message))
}

fn parse_environment(raw: &str) -> Result<String, BoxError> {
    let environment = raw.trim().to_ascii_lowercase();
    if !ENVIRONMENTS.contains(&environment.as_str()) {
        return Err(invalid(format!(
            "invalid ENVIRONMENT={raw}: expected one of {}",
            ENVIRONMENTS.join(", ")
        )));
    }
    Ok(environment)
}

fn session_ttl(hours: u64) -> Result<Duration, BoxError> {
    if hours == 0 {
        return Err(invalid("SESSION_TTL_HOURS must be at least 1"));
    }
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(format!("SESSION_TTL_HOURS={hours} is out of range")))
}

/// Parse an optional env var, keeping the default when unset
fn parse_var<T>(name: &str, default: T) -> Result<T, BoxError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(format!("invalid {name}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let config = Config::default();
        assert_eq!(config.ws_auth_mode, WsAuthMode::Strict);
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.ws_keepalive, Duration::from_secs(30));
        assert!(!config.is_production());
    }

    #[test]
    fn parse_var_defaults_when_unset() {
        let port: u16 = parse_var("PAYROLL_TEST_SURELY_UNSET_VAR", 5000).unwrap();
        assert_eq!(port, 5000);
    }

    fn config_code(err: BoxError) -> ErrorCode {
        err.downcast_ref::<AppError>().map(|e| e.code).unwrap()
    }

    #[test]
    fn environment_must_be_known() {
        assert_eq!(parse_environment("staging").unwrap(), "staging");
        assert_eq!(parse_environment(" Production ").unwrap(), "production");
        let err = parse_environment("prod").unwrap_err();
        assert_eq!(config_code(err), ErrorCode::ConfigError);
        assert!(parse_environment("").is_err());
    }

    #[test]
    fn session_ttl_rejects_overflow_and_zero() {
        assert_eq!(session_ttl(24).unwrap(), Duration::from_secs(86_400));
        let err = session_ttl(u64::MAX / 1000).unwrap_err();
        assert_eq!(config_code(err), ErrorCode::ConfigError);
        assert!(session_ttl(0).is_err());
    }
}
