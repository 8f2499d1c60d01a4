use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::{generate_token, is_unique_violation};
use crate::entities::invites;

#[derive(Debug, Clone)]
pub struct Invite {
    pub id: i32,
    pub email: String,
    pub invite_code: String,
    pub invited_by: String,
    pub created_at: String,
    pub is_used: bool,
    pub used_at: Option<String>,
    pub used_by: Option<String>,
}

impl From<invites::Model> for Invite {
    fn from(model: invites::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            invite_code: model.invite_code,
            invited_by: model.invited_by,
            created_at: model.created_at,
            is_used: model.is_used,
            used_at: model.used_at,
            used_by: model.used_by,
        }
    }
}

pub struct InviteRepository {
    conn: DatabaseConnection,
}

impl InviteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get the unused invite for an email, if one is pending.
    pub async fn get_pending(&self, email: &str) -> Result<Option<Invite>> {
        let invite = invites::Entity::find()
            .filter(invites::Column::Email.eq(email))
            .filter(invites::Column::IsUsed.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query pending invite")?;

        Ok(invite.map(Invite::from))
    }

    /// Create an invite with a fresh code. Returns `None` when an unused
    /// invite already exists for the email (the partial unique index rejects
    /// the insert).
    pub async fn create(&self, email: &str, invited_by: &str) -> Result<Option<Invite>> {
        let active = invites::ActiveModel {
            email: Set(email.to_string()),
            invite_code: Set(generate_token()),
            invited_by: Set(invited_by.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            is_used: Set(false),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Invite::from(model))),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("Failed to insert invite"),
        }
    }

    /// Mark the pending invite for `email` as used. A single conditional
    /// update, so exactly one of any concurrent consumers wins; the affected
    /// row count tells winners from losers.
    pub async fn consume(&self, email: &str, used_by: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = invites::Entity::update_many()
            .col_expr(invites::Column::IsUsed, Expr::value(true))
            .col_expr(invites::Column::UsedAt, Expr::value(Some(now)))
            .col_expr(invites::Column::UsedBy, Expr::value(Some(used_by.to_string())))
            .filter(invites::Column::Email.eq(email))
            .filter(invites::Column::IsUsed.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to consume invite")?;

        Ok(result.rows_affected == 1)
    }

    /// Delete the pending invite for `email`. Used invites are immutable and
    /// stay for the audit trail. Returns whether a row was removed.
    pub async fn revoke(&self, email: &str) -> Result<bool> {
        let result = invites::Entity::delete_many()
            .filter(invites::Column::Email.eq(email))
            .filter(invites::Column::IsUsed.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to revoke invite")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(&self) -> Result<Vec<Invite>> {
        let invites = invites::Entity::find()
            .order_by_desc(invites::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list invites")?;

        Ok(invites.into_iter().map(Invite::from).collect())
    }
}
