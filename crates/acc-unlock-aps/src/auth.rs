use acc_unlock_core::{error::AuthError, model::Token, remote::TokenProvider};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::config::ApsConfig;

/// Two-legged (client credentials) token exchange.
pub struct ClientCredentials {
    cfg: ApsConfig,
    client: reqwest::Client,
}

impl ClientCredentials {
    pub fn new(cfg: ApsConfig) -> reqwest::Result<Self> {
        let client = cfg.http_client()?;
        Ok(Self { cfg, client })
    }

    fn basic_auth(&self) -> String {
        let basic = BASE64.encode(format!("{}:{}", self.cfg.client_id, self.cfg.client_secret));
        format!("Basic {basic}")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    #[instrument(skip_all, fields(client_id = %self.cfg.client_id))]
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let url = format!("{}/authentication/v2/token", self.cfg.base_url());
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.basic_auth())
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.cfg.scope()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        info!(expires_in = ?token.expires_in, "acquired access token");
        Ok(Token::new(token.access_token))
    }
}
