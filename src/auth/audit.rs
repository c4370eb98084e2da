//! Authentication events and their observers.
//!
//! Observers are registered explicitly on [`AuthEvents`] at startup and receive
//! every login, logout and failed login.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Something that happened to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn { username: String, ip: Option<String> },
    LoggedOut { username: String, ip: Option<String> },
    LoginFailed { username: String, ip: Option<String> },
}

pub trait AuthObserver: Send + Sync {
    fn on_event(&self, event: &AuthEvent);
}

/// Registry of observers, fanned out synchronously in registration order.
#[derive(Default, Clone)]
pub struct AuthEvents {
    observers: Vec<Arc<dyn AuthObserver>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn AuthObserver>) {
        self.observers.push(observer);
    }

    pub fn emit(&self, event: AuthEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingAuditObserver;

impl AuthObserver for TracingAuditObserver {
    fn on_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::LoggedIn { username, ip } => {
                tracing::info!(user = %username, ip = ip.as_deref().unwrap_or("-"), "Login");
            }
            AuthEvent::LoggedOut { username, ip } => {
                tracing::info!(user = %username, ip = ip.as_deref().unwrap_or("-"), "Logout");
            }
            AuthEvent::LoginFailed { username, ip } => {
                tracing::warn!(user = %username, ip = ip.as_deref().unwrap_or("-"), "Login failed");
            }
        }
    }
}

/// Best-effort client address: the last `X-Forwarded-For` hop, else the peer address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(Self(forwarded.or_else(peer)))
    }
}
