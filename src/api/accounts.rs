//! Account endpoints: session login and logout.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::auth::{verify_password, AuthEvent, ClientIp, MaybeSession};
use crate::errors::AppError;
use crate::models::{LoginRequest, LoginResponse};
use crate::AppState;

/// POST /accounts/login/ - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state.repo.get_user_by_username(&request.username).await?;

    let verified = match &user {
        Some(user) => verify_password(&request.password, &user.password_hash)?,
        None => false,
    };

    match user {
        Some(user) if verified => {
            let now = state.clock.now();
            let pruned = state
                .repo
                .delete_expired_sessions(now - state.config.session_ttl)
                .await?;
            if pruned > 0 {
                tracing::debug!(pruned, "Expired sessions removed");
            }

            let token = state.repo.create_session(user.id, now).await?;
            state.auth_events.emit(AuthEvent::LoggedIn {
                username: user.username.clone(),
                ip,
            });
            success(LoginResponse { token, user })
        }
        _ => {
            state.auth_events.emit(AuthEvent::LoginFailed {
                username: request.username,
                ip,
            });
            Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ))
        }
    }
}

/// POST /accounts/logout/ - End the current session.
pub async fn logout(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    MaybeSession(session): MaybeSession,
) -> ApiResult<()> {
    let session = session.ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

    state.repo.delete_session(&session.token).await?;
    state.auth_events.emit(AuthEvent::LoggedOut {
        username: session.user.username,
        ip,
    });

    success(())
}
