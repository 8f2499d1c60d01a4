use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::generate_token;
use crate::entities::admin_keys;

/// Admin key row as handed to callers.
#[derive(Debug, Clone)]
pub struct AdminKey {
    pub id: i32,
    pub key: String,
    pub name: String,
    pub generated_by: String,
    pub generated_at: String,
}

impl From<admin_keys::Model> for AdminKey {
    fn from(model: admin_keys::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            name: model.name,
            generated_by: model.generated_by,
            generated_at: model.generated_at,
        }
    }
}

pub struct AdminKeyRepository {
    conn: DatabaseConnection,
}

impl AdminKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Look up a key by its secret value, verbatim. Redemption never deletes
    /// the row; a key stays valid until explicitly revoked.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<AdminKey>> {
        let key = admin_keys::Entity::find()
            .filter(admin_keys::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query admin key")?;

        Ok(key.map(AdminKey::from))
    }

    /// Mint a new key bound to `name`. Several keys may share one name
    /// (multi-device issuance).
    pub async fn add(&self, name: &str, generated_by: &str) -> Result<AdminKey> {
        let active = admin_keys::ActiveModel {
            key: Set(generate_token()),
            name: Set(name.to_string()),
            generated_by: Set(generated_by.to_string()),
            generated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin key")?;

        Ok(AdminKey::from(model))
    }

    /// Destroy a key. Returns whether a row was removed.
    pub async fn revoke(&self, key: &str) -> Result<bool> {
        let result = admin_keys::Entity::delete_many()
            .filter(admin_keys::Column::Key.eq(key))
            .exec(&self.conn)
            .await
            .context("Failed to revoke admin key")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list(&self) -> Result<Vec<AdminKey>> {
        let keys = admin_keys::Entity::find()
            .order_by_desc(admin_keys::Column::GeneratedAt)
            .all(&self.conn)
            .await
            .context("Failed to list admin keys")?;

        Ok(keys.into_iter().map(AdminKey::from).collect())
    }
}
