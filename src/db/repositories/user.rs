use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use super::is_unique_violation;
use crate::entities::users;

/// Ordered role hierarchy: superadmin implies admin. Collapsing the role into
/// a single enum makes an "superadmin but not admin" state unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Regular,
    Admin,
    Superadmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "admin" => Some(Self::Admin),
            "superadmin" => Some(Self::Superadmin),
            _ => None,
        }
    }

    /// Stored role strings come from our own writes; anything unexpected
    /// degrades to the least-privileged role.
    fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Regular)
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self >= Self::Admin
    }

    #[must_use]
    pub fn is_superadmin(self) -> bool {
        self >= Self::Superadmin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User data returned from the repository.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub slack_id: Option<String>,
    pub slack_email: Option<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            slack_id: model.slack_id,
            slack_email: model.slack_email,
            role: Role::from_db(&model.role),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Usernames are compared case-insensitively everywhere; normalize once here.
pub(crate) fn fold_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get a user by username (case-folded).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(fold_username(username)))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get a user by their linked Slack id (exact match).
    pub async fn get_by_slack_id(&self, slack_id: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::SlackId.eq(slack_id))
            .one(&self.conn)
            .await
            .context("Failed to query user by Slack id")?;

        Ok(user.map(User::from))
    }

    /// Insert a new user. Returns `None` if the username (or Slack id) is
    /// already taken, so concurrent first-logins collapse onto one row.
    pub async fn create(
        &self,
        username: &str,
        slack_id: Option<&str>,
        slack_email: Option<&str>,
        role: Role,
    ) -> Result<Option<User>> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(fold_username(username)),
            slack_id: Set(slack_id.map(str::to_string)),
            slack_email: Set(slack_email.map(str::to_string)),
            role: Set(role.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(User::from(model))),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("Failed to insert user"),
        }
    }

    /// Attach a Slack identity to an existing account. Idempotent: only
    /// patches rows that have no Slack id yet.
    pub async fn link_slack_identity(
        &self,
        username: &str,
        slack_id: &str,
        slack_email: Option<&str>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = users::Entity::update_many()
            .col_expr(users::Column::SlackId, Expr::value(Some(slack_id.to_string())))
            .col_expr(
                users::Column::SlackEmail,
                Expr::value(slack_email.map(str::to_string)),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Username.eq(fold_username(username)))
            .filter(users::Column::SlackId.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to link Slack identity")?;

        Ok(result.rows_affected > 0)
    }

    /// Set a user's role in one atomic update. Returns whether a row changed.
    pub async fn set_role(&self, username: &str, role: Role) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(role.as_str().to_string()))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Username.eq(fold_username(username)))
            .exec(&self.conn)
            .await
            .context("Failed to update user role")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }
}
