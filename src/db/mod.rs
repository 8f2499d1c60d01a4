use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::activity_logs::Model as ActivityLogEntry;
pub use repositories::admin_key::AdminKey;
pub use repositories::generate_token;
pub use repositories::invite::Invite;
pub use repositories::user::{Role, User};

/// Facade over the credential store. "Not found" is always an empty result,
/// never an error; callers branch on presence.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn admin_key_repo(&self) -> repositories::admin_key::AdminKeyRepository {
        repositories::admin_key::AdminKeyRepository::new(self.conn.clone())
    }

    fn invite_repo(&self) -> repositories::invite::InviteRepository {
        repositories::invite::InviteRepository::new(self.conn.clone())
    }

    fn activity_repo(&self) -> repositories::activity::ActivityLogRepository {
        repositories::activity::ActivityLogRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn find_user_by_slack_id(&self, slack_id: &str) -> Result<Option<User>> {
        self.user_repo().get_by_slack_id(slack_id).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        slack_id: Option<&str>,
        slack_email: Option<&str>,
        role: Role,
    ) -> Result<Option<User>> {
        self.user_repo()
            .create(username, slack_id, slack_email, role)
            .await
    }

    pub async fn link_slack_identity(
        &self,
        username: &str,
        slack_id: &str,
        slack_email: Option<&str>,
    ) -> Result<bool> {
        self.user_repo()
            .link_slack_identity(username, slack_id, slack_email)
            .await
    }

    pub async fn set_user_role(&self, username: &str, role: Role) -> Result<bool> {
        self.user_repo().set_role(username, role).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    // ========== Admin keys ==========

    pub async fn find_key_by_value(&self, key: &str) -> Result<Option<AdminKey>> {
        self.admin_key_repo().get_by_key(key).await
    }

    pub async fn add_key(&self, name: &str, generated_by: &str) -> Result<AdminKey> {
        self.admin_key_repo().add(name, generated_by).await
    }

    pub async fn revoke_key(&self, key: &str) -> Result<bool> {
        self.admin_key_repo().revoke(key).await
    }

    pub async fn list_keys(&self) -> Result<Vec<AdminKey>> {
        self.admin_key_repo().list().await
    }

    // ========== Invites ==========

    pub async fn find_pending_invite(&self, email: &str) -> Result<Option<Invite>> {
        self.invite_repo().get_pending(email).await
    }

    pub async fn create_invite(&self, email: &str, invited_by: &str) -> Result<Option<Invite>> {
        self.invite_repo().create(email, invited_by).await
    }

    pub async fn consume_invite(&self, email: &str, used_by: &str) -> Result<bool> {
        self.invite_repo().consume(email, used_by).await
    }

    pub async fn revoke_invite(&self, email: &str) -> Result<bool> {
        self.invite_repo().revoke(email).await
    }

    pub async fn list_invites(&self) -> Result<Vec<Invite>> {
        self.invite_repo().list().await
    }

    // ========== Activity log ==========

    pub async fn add_activity(
        &self,
        username: &str,
        action: &str,
        details: Option<String>,
    ) -> Result<()> {
        self.activity_repo().add(username, action, details).await
    }

    pub async fn recent_activity(&self, limit: u64) -> Result<Vec<ActivityLogEntry>> {
        self.activity_repo().recent(limit).await
    }
}
