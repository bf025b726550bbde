use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";
pub const DEFAULT_SCOPE: &str = "data:read data:write account:read";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for an ACC project.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ApsConfig {
    pub client_id: String,
    pub client_secret: String,
    /// ACC account (hub) id; the `b.` prefix is added when missing.
    pub account_id: String,
    /// ACC project id; the `b.` prefix is added when missing.
    pub project_id: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ApsConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }

    pub fn hub_id(&self) -> String {
        with_acc_prefix(&self.account_id)
    }

    pub fn project(&self) -> String {
        with_acc_prefix(&self.project_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("acc-unlock/", env!("CARGO_PKG_VERSION")))
            .timeout(self.request_timeout())
            .build()
    }
}

impl fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// ACC ids are the BIM 360 GUIDs with a `b.` namespace prefix.
fn with_acc_prefix(id: &str) -> String {
    let id = id.trim();
    if id.starts_with("b.") {
        id.to_string()
    } else {
        format!("b.{id}")
    }
}
