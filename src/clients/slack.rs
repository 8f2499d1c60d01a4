//! Slack OAuth v2 client: authorize URL construction, code-for-token
//! exchange, and identity lookup.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SlackConfig;

const SLACK_AUTHORIZE_URL: &str = "https://slack.com/oauth/v2/authorize";
const SLACK_API: &str = "https://slack.com/api";

/// User scopes needed to resolve id, name, email and workspace.
const USER_SCOPES: &str = "identity.basic,identity.email,identity.team";

/// The identity Slack reports for an authenticated user.
#[derive(Debug, Clone)]
pub struct SlackIdentity {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub team_id: String,
    pub team_name: String,
}

#[derive(Debug, Deserialize)]
struct OauthAccessResponse {
    ok: bool,
    error: Option<String>,
    authed_user: Option<AuthedUser>,
}

#[derive(Debug, Deserialize)]
struct AuthedUser {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    ok: bool,
    error: Option<String>,
    user: Option<IdentityUser>,
    team: Option<IdentityTeam>,
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: String,
    name: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityTeam {
    id: String,
    name: String,
}

#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl SlackClient {
    #[must_use]
    pub fn new(config: &SlackConfig) -> Self {
        Self::with_shared_client(config, Client::new())
    }

    #[must_use]
    pub fn with_shared_client(config: &SlackConfig, client: Client) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        }
    }

    /// Authorization endpoint URL carrying the CSRF state nonce.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&user_scope={}&redirect_uri={}&state={}",
            SLACK_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(USER_SCOPES),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a user access token
    /// (server-to-server, authenticated with the client secret).
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = self
            .client
            .post(format!("{SLACK_API}/oauth.v2.access"))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Slack token endpoint returned {}",
                response.status()
            ));
        }

        let token: OauthAccessResponse = response.json().await?;

        if !token.ok {
            return Err(anyhow::anyhow!(
                "Slack token exchange failed: {}",
                token.error.as_deref().unwrap_or("unknown error")
            ));
        }

        token
            .authed_user
            .and_then(|user| user.access_token)
            .ok_or_else(|| anyhow::anyhow!("Slack token response carried no user access token"))
    }

    /// Fetch the authenticated user's identity with the access token.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<SlackIdentity> {
        let response = self
            .client
            .get(format!("{SLACK_API}/users.identity"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Slack identity endpoint returned {}",
                response.status()
            ));
        }

        let identity: IdentityResponse = response.json().await?;

        if !identity.ok {
            return Err(anyhow::anyhow!(
                "Slack identity lookup failed: {}",
                identity.error.as_deref().unwrap_or("unknown error")
            ));
        }

        let (user, team) = match (identity.user, identity.team) {
            (Some(user), Some(team)) => (user, team),
            _ => return Err(anyhow::anyhow!("Slack identity response was incomplete")),
        };

        Ok(SlackIdentity {
            user_id: user.id,
            username: user.name,
            email: user.email,
            team_id: team.id,
            team_name: team.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SlackConfig {
        SlackConfig {
            client_id: "123.456".to_string(),
            client_secret: "shh".to_string(),
            redirect_url: "http://localhost:4170/api/auth/slack/callback".to_string(),
            ..SlackConfig::default()
        }
    }

    #[test]
    fn test_authorize_url_carries_state_and_scopes() {
        let client = SlackClient::new(&test_config());
        let url = client.authorize_url("nonce-123");

        assert!(url.starts_with("https://slack.com/oauth/v2/authorize?"));
        assert!(url.contains("client_id=123.456"));
        assert!(url.contains("state=nonce-123"));
        assert!(url.contains("user_scope=identity.basic%2Cidentity.email%2Cidentity.team"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A4170%2Fapi%2Fauth%2Fslack%2Fcallback"
        ));
    }
}
