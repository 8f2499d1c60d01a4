//! Domain service for authentication and authorization decisions.
//!
//! Handles admin-key redemption, Slack identity authorization (including
//! invite-gated self-registration) and per-request role resolution.

use thiserror::Error;

use crate::clients::slack::SlackIdentity;
use crate::db::Role;

/// Errors specific to authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately generic: never reveals whether the secret was malformed
    /// or simply unknown.
    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("CSRF state verification failed")]
    CsrfStateMismatch,

    #[error("{0}")]
    OAuthProvider(String),

    #[error("Your Slack workspace '{0}' is not authorized to use this application")]
    UnauthorizedWorkspace(String),

    #[error("{0}")]
    RegistrationDenied(String),

    #[error("This invite has already been used")]
    AlreadyUsed,

    #[error("Access denied")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Resolved identity and role for the current request only. Built fresh by
/// the session middleware on every request; never cached across requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AuthError::NotAuthorized)
        }
    }

    pub fn require_superadmin(&self) -> Result<(), AuthError> {
        if self.role.is_superadmin() {
            Ok(())
        } else {
            Err(AuthError::NotAuthorized)
        }
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub username: String,
    pub role: Role,
    /// True when this login self-registered a new account via invite.
    pub registered: bool,
}

/// Domain service trait for authentication decisions.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Redeem an admin key for an identity, creating the user row on first
    /// redemption. The key is read-only here; it stays valid until revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredential`] when the secret is unknown.
    async fn redeem_admin_key(&self, secret: &str) -> Result<LoginOutcome, AuthError>;

    /// Decide whether a resolved Slack identity may log in, registering a
    /// new account when a pending invite authorizes it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RegistrationDenied`] when no account exists and
    /// no invite admits the email, and [`AuthError::AlreadyUsed`] for the
    /// loser of a concurrent registration race.
    async fn authorize_slack_identity(
        &self,
        identity: &SlackIdentity,
    ) -> Result<LoginOutcome, AuthError>;

    /// Current role for a username, read from the store. Sessions never
    /// cache the role, so demotions apply on the very next request.
    async fn resolve_role(&self, username: &str) -> Result<Role, AuthError>;
}
