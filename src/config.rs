use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub slack: SlackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/quarterdeck.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local
    /// development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4170,
            cors_allowed_origins: vec![
                "http://localhost:4170".to_string(),
                "http://127.0.0.1:4170".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// OAuth app client id. Overridable via SLACK_CLIENT_ID.
    pub client_id: String,

    /// OAuth app client secret. Overridable via SLACK_CLIENT_SECRET; keep it
    /// out of config files that get committed.
    pub client_secret: String,

    /// Callback URL registered with the Slack app.
    pub redirect_url: String,

    /// Slack team ids allowed to log in. Empty disables the workspace check
    /// entirely.
    pub allowed_workspaces: Vec<String>,

    /// Request timeout in seconds for token exchange and identity lookup
    /// (default: 10). Timeouts fail the login, never pass it.
    pub request_timeout_seconds: u32,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: "http://localhost:4170/api/auth/slack/callback".to_string(),
            allowed_workspaces: vec![],
            request_timeout_seconds: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.slack.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.slack.apply_env_overrides();

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("quarterdeck").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".quarterdeck").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if !self.slack.client_id.is_empty() && self.slack.client_secret.is_empty() {
            anyhow::bail!("Slack client secret is required when a client id is configured");
        }

        if !self.slack.client_id.is_empty() && self.slack.redirect_url.is_empty() {
            anyhow::bail!("Slack redirect URL cannot be empty when Slack login is configured");
        }

        Ok(())
    }
}

impl SlackConfig {
    /// Secrets usually arrive via the environment (.env in development);
    /// environment values beat anything in the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("SLACK_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("SLACK_CLIENT_SECRET") {
            self.client_secret = client_secret;
        }
    }
}
