//! Configuration module for the polls backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

use crate::errors::AppError;

/// Default session lifetime: two weeks.
const DEFAULT_SESSION_TTL_SECS: i64 = 14 * 24 * 60 * 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the admin API (open when unset)
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Where unauthenticated voters are sent
    pub login_url: String,
    /// How long a session token stays valid after login
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let admin_psk = env::var("POLLS_ADMIN_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("POLLS_DB_PATH")
            .unwrap_or_else(|_| "./data/polls.sqlite".to_string())
            .into();

        let index_path = env::var("POLLS_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let raw_bind = env::var("POLLS_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_bind.parse().map_err(|e| {
            AppError::Internal(format!("Invalid POLLS_BIND_ADDR {:?}: {}", raw_bind, e))
        })?;

        let log_level = env::var("POLLS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("POLLS_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let login_url =
            env::var("POLLS_LOGIN_URL").unwrap_or_else(|_| "/accounts/login/".to_string());

        let session_ttl = match env::var("POLLS_SESSION_TTL") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .and_then(Duration::try_seconds)
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Invalid POLLS_SESSION_TTL {:?}: expected a positive number of seconds",
                        raw
                    ))
                })?,
            Err(_) => Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            admin_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_json,
            login_url,
            session_ttl,
        })
    }
}
