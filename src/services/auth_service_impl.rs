//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;

use crate::clients::slack::SlackIdentity;
use crate::db::{Role, Store, User};
use crate::services::auth_service::{AuthError, AuthService, LoginOutcome};

pub struct SeaOrmAuthService {
    store: Store,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// First redemption of a key creates the user row. Losing the insert race
    /// to a concurrent redemption is fine: both resolve to the same row.
    async fn user_for_key_name(&self, username: &str) -> Result<User, AuthError> {
        if let Some(user) = self.store.find_user_by_name(username).await? {
            return Ok(user);
        }

        match self
            .store
            .create_user(username, None, None, Role::Regular)
            .await?
        {
            Some(user) => Ok(user),
            None => self
                .store
                .find_user_by_name(username)
                .await?
                .ok_or_else(|| {
                    AuthError::Internal(format!("user '{username}' vanished after insert conflict"))
                }),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn redeem_admin_key(&self, secret: &str) -> Result<LoginOutcome, AuthError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        let key = self
            .store
            .find_key_by_value(secret)
            .await?
            .ok_or(AuthError::InvalidCredential)?;

        let username = key.name.trim().to_lowercase();
        let user = self.user_for_key_name(&username).await?;

        Ok(LoginOutcome {
            username: user.username,
            role: user.role,
            registered: false,
        })
    }

    async fn authorize_slack_identity(
        &self,
        identity: &SlackIdentity,
    ) -> Result<LoginOutcome, AuthError> {
        // Known Slack identity: straight through.
        if let Some(user) = self.store.find_user_by_slack_id(&identity.user_id).await? {
            return Ok(LoginOutcome {
                username: user.username,
                role: user.role,
                registered: false,
            });
        }

        // Known username without a linked Slack identity: link it now.
        let username = identity.username.trim().to_lowercase();
        if let Some(user) = self.store.find_user_by_name(&username).await? {
            self.store
                .link_slack_identity(&user.username, &identity.user_id, identity.email.as_deref())
                .await?;

            return Ok(LoginOutcome {
                username: user.username,
                role: user.role,
                registered: false,
            });
        }

        // Unknown user: registration requires an email and a pending invite.
        let Some(email) = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
        else {
            return Err(AuthError::RegistrationDenied(
                "Slack did not share an email address; one is required for registration"
                    .to_string(),
            ));
        };

        if self.store.find_pending_invite(email).await?.is_none() {
            return Err(AuthError::RegistrationDenied(
                "This account is not authorized; ask an administrator for an invite".to_string(),
            ));
        }

        // Consume before creating the user: the conditional update picks
        // exactly one winner among concurrent callbacks for the same email.
        if !self.store.consume_invite(email, &username).await? {
            return Err(AuthError::AlreadyUsed);
        }

        let user = match self
            .store
            .create_user(&username, Some(&identity.user_id), Some(email), Role::Regular)
            .await?
        {
            Some(user) => user,
            None => {
                // The username got taken since the lookup above; treat it as
                // the existing account and link the Slack identity to it.
                let user = self
                    .store
                    .find_user_by_name(&username)
                    .await?
                    .ok_or_else(|| {
                        AuthError::Internal(format!(
                            "user '{username}' vanished after insert conflict"
                        ))
                    })?;

                self.store
                    .link_slack_identity(&user.username, &identity.user_id, Some(email))
                    .await?;

                user
            }
        };

        Ok(LoginOutcome {
            username: user.username,
            role: user.role,
            registered: true,
        })
    }

    async fn resolve_role(&self, username: &str) -> Result<Role, AuthError> {
        self.store
            .find_user_by_name(username)
            .await?
            .map(|user| user.role)
            .ok_or(AuthError::NotAuthorized)
    }
}
