use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::clients::slack::SlackClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::AuthService;
use crate::state::SharedState;

pub mod admin;
pub mod auth;
mod error;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.shared.slack
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState { shared }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

/// Append one audit entry. Log failures are reported, never fatal: the
/// operation that triggered the entry has already happened.
pub(crate) async fn record_activity(
    state: &AppState,
    username: &str,
    action: &str,
    details: Option<String>,
) {
    if let Err(err) = state.store().add_activity(username, action, details).await {
        tracing::warn!(error = %err, action, "Failed to write activity log entry");
    }
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();
    let secure_cookies = state.config().server.secure_cookies;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::current_user))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{username}/role", put(admin::set_user_role))
        .route(
            "/admin/keys",
            get(admin::list_keys)
                .post(admin::create_key)
                .delete(admin::revoke_key),
        )
        .route(
            "/admin/invites",
            get(admin::list_invites).post(admin::create_invite),
        )
        .route("/admin/invites/{email}", delete(admin::revoke_invite))
        .route("/admin/activity", get(admin::recent_activity))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/slack", get(auth::slack_start))
        .route("/auth/slack/callback", get(auth::slack_callback))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
