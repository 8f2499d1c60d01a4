use std::sync::Arc;

use crate::clients::slack::SlackClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

/// Build a shared HTTP client with bounded timeouts for outbound calls.
/// Reused across services to enable connection pooling; external calls fail
/// closed when the timeout fires.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Quarterdeck/0.1")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub slack: SlackClient,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.slack.request_timeout_seconds.into())?;
        let slack = SlackClient::with_shared_client(&config.slack, http_client);

        let auth_service =
            Arc::new(SeaOrmAuthService::new(store.clone())) as Arc<dyn AuthService>;

        Ok(Self {
            config,
            store,
            slack,
            auth_service,
        })
    }
}
