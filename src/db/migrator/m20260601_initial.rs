use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Bootstrap credential seeded on a fresh install so the first superadmin can
/// log in at all. Rotate it immediately via the admin key endpoints.
pub const BOOTSTRAP_ADMIN_KEY: &str = "quarterdeck_bootstrap_key_please_rotate";

/// Username the bootstrap key resolves to.
pub const BOOTSTRAP_USERNAME: &str = "root";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AdminKeys)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Invites)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(ActivityLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // At most one unused invite per email; used invites stay around for
        // the audit view, so a plain unique index on email would be wrong.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_pending_email \
                 ON invites (email) WHERE is_used = 0",
            )
            .await?;

        let now = chrono::Utc::now().to_rfc3339();

        let seed_user = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Username,
                crate::entities::users::Column::SlackId,
                crate::entities::users::Column::SlackEmail,
                crate::entities::users::Column::Role,
                crate::entities::users::Column::CreatedAt,
                crate::entities::users::Column::UpdatedAt,
            ])
            .values_panic([
                BOOTSTRAP_USERNAME.into(),
                Option::<String>::None.into(),
                Option::<String>::None.into(),
                "superadmin".into(),
                now.clone().into(),
                now.clone().into(),
            ])
            .to_owned();

        manager.exec_stmt(seed_user).await?;

        let seed_key = sea_orm_migration::sea_query::Query::insert()
            .into_table(AdminKeys)
            .columns([
                crate::entities::admin_keys::Column::Key,
                crate::entities::admin_keys::Column::Name,
                crate::entities::admin_keys::Column::GeneratedBy,
                crate::entities::admin_keys::Column::GeneratedAt,
            ])
            .values_panic([
                BOOTSTRAP_ADMIN_KEY.into(),
                BOOTSTRAP_USERNAME.into(),
                "system".into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(seed_key).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invites).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminKeys).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
