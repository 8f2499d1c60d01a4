use axum::{
    Extension, Json,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, SessionUserDto, record_activity};
use crate::db::generate_token;
use crate::services::{AuthContext, AuthError};

/// Session key holding the logged-in username.
const SESSION_USER_KEY: &str = "user";

/// Session key holding how the session was established.
const SESSION_AUTH_METHOD_KEY: &str = "auth_method";

/// Session key holding the in-flight OAuth CSRF nonce. Single use: removed
/// on the first callback check, match or not.
const SESSION_OAUTH_STATE_KEY: &str = "oauth_state";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub admin_key: String,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Session middleware for protected routes. Resolves the caller's identity
/// and current role (always re-read from the store, so demotions apply on
/// the very next request) into an `AuthContext` request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let username = match session.get::<String>(SESSION_USER_KEY).await {
        Ok(Some(username)) => username,
        Ok(None) => return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response()),
        Err(err) => return Err(ApiError::internal(format!("Session error: {err}"))),
    };

    let role = match state.auth().resolve_role(&username).await {
        Ok(role) => role,
        // The account behind the session is gone; the session is worthless.
        Err(AuthError::NotAuthorized) => {
            return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
        }
        Err(err) => return Err(err.into()),
    };

    tracing::Span::current().record("user_id", username.as_str());
    request.extensions_mut().insert(AuthContext { username, role });

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Redeem an admin key for a session. The failure message is deliberately
/// generic; it never says whether the key was malformed or unknown.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionUserDto>>, ApiError> {
    let outcome = state.auth().redeem_admin_key(&payload.admin_key).await?;

    establish_session(&session, &outcome.username, "admin_key").await?;

    record_activity(
        &state,
        &outcome.username,
        "logged in",
        Some("method: admin key".to_string()),
    )
    .await;

    tracing::info!(username = %outcome.username, "Admin key login");

    Ok(Json(ApiResponse::success(SessionUserDto {
        username: outcome.username,
        role: outcome.role.as_str().to_string(),
    })))
}

/// GET /auth/slack
/// Start the OAuth handshake: issue a fresh CSRF nonce (always overwriting a
/// stale one) and redirect to Slack's authorization endpoint.
pub async fn slack_start(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Redirect, ApiError> {
    if state.config().slack.client_id.is_empty() {
        return Err(ApiError::NotImplemented(
            "Slack login is not configured".to_string(),
        ));
    }

    let nonce = generate_token();
    session
        .insert(SESSION_OAUTH_STATE_KEY, &nonce)
        .await
        .map_err(|err| ApiError::internal(format!("Failed to store OAuth state: {err}")))?;

    Ok(Redirect::temporary(&state.slack().authorize_url(&nonce)))
}

/// GET /auth/slack/callback
/// Finish the OAuth handshake. Every terminal failure redirects back to the
/// login page with a human-readable reason; the nonce is cleared before any
/// other processing, whatever the outcome.
pub async fn slack_callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let stored_state: Option<String> = session
        .remove(SESSION_OAUTH_STATE_KEY)
        .await
        .map_err(|err| ApiError::internal(format!("Failed to clear OAuth state: {err}")))?;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Slack reported an OAuth error");
        return Ok(denied_redirect(&AuthError::OAuthProvider(format!(
            "Slack sign-in failed: {error}"
        ))));
    }

    // Exact-match state validation happens before any token exchange.
    match (stored_state.as_deref(), params.state.as_deref()) {
        (Some(stored), Some(echoed)) if stored == echoed => {}
        _ => {
            tracing::warn!("OAuth callback rejected: state nonce missing or mismatched");
            return Ok(denied_redirect(&AuthError::CsrfStateMismatch));
        }
    }

    let Some(code) = params.code.as_deref() else {
        return Ok(denied_redirect(&AuthError::OAuthProvider(
            "No authorization code received from Slack".to_string(),
        )));
    };

    let access_token = match state.slack().exchange_code(code).await {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(error = %err, "Slack token exchange failed");
            return Ok(denied_redirect(&AuthError::OAuthProvider(
                "Could not get an access token from Slack".to_string(),
            )));
        }
    };

    let identity = match state.slack().fetch_identity(&access_token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "Slack identity lookup failed");
            return Ok(denied_redirect(&AuthError::OAuthProvider(
                "Could not get your user info from Slack".to_string(),
            )));
        }
    };

    let allowed = &state.config().slack.allowed_workspaces;
    if !allowed.is_empty() && !allowed.iter().any(|team| team == &identity.team_id) {
        tracing::warn!(team_id = %identity.team_id, "Slack workspace not in allow-list");
        return Ok(denied_redirect(&AuthError::UnauthorizedWorkspace(
            identity.team_name.clone(),
        )));
    }

    let outcome = match state.auth().authorize_slack_identity(&identity).await {
        Ok(outcome) => outcome,
        Err(err @ (AuthError::RegistrationDenied(_) | AuthError::AlreadyUsed)) => {
            tracing::info!(slack_id = %identity.user_id, error = %err, "Slack registration denied");
            return Ok(denied_redirect(&err));
        }
        Err(err) => return Err(err.into()),
    };

    establish_session(&session, &outcome.username, "slack").await?;

    if outcome.registered {
        record_activity(
            &state,
            &outcome.username,
            "registered via invite",
            identity.email.as_ref().map(|email| format!("email: {email}")),
        )
        .await;
    } else {
        record_activity(
            &state,
            &outcome.username,
            "logged in",
            Some("method: slack".to_string()),
        )
        .await;
    }

    tracing::info!(username = %outcome.username, registered = outcome.registered, "Slack login");

    Ok(Redirect::temporary("/"))
}

/// POST /auth/logout
/// Clears the whole session unconditionally; always succeeds.
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn current_user(
    Extension(ctx): Extension<AuthContext>,
) -> Json<ApiResponse<SessionUserDto>> {
    Json(ApiResponse::success(SessionUserDto {
        username: ctx.username,
        role: ctx.role.as_str().to_string(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

async fn establish_session(
    session: &Session,
    username: &str,
    method: &str,
) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_KEY, username)
        .await
        .map_err(|err| ApiError::internal(format!("Failed to create session: {err}")))?;
    session
        .insert(SESSION_AUTH_METHOD_KEY, method)
        .await
        .map_err(|err| ApiError::internal(format!("Failed to create session: {err}")))?;

    Ok(())
}

/// Terminal OAuth failures land back on the login page with the reason in the
/// query string; rendering is the frontend's problem.
fn denied_redirect(err: &AuthError) -> Redirect {
    Redirect::temporary(&format!(
        "/login?error={}",
        urlencoding::encode(&err.to_string())
    ))
}
