use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::form_urlencoded;

use crate::provider::{ProviderError, ProviderResult};
use crate::tda::tda_config::TdaConfig;

const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    1_800
}

/// Hands out bearer tokens, refreshing them from the long-lived refresh token when needed.
#[derive(Debug)]
pub struct OAuthSession {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    refresh_token: String,
    token: Mutex<Option<AccessToken>>,
}

impl OAuthSession {
    pub fn new(http: reqwest::Client, config: &TdaConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id(),
            refresh_token: config.refresh_token.clone(),
            token: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref().filter(|t| t.is_valid_at(Utc::now())) {
            return Ok(current.value.clone());
        }

        let refreshed = self.refresh().await?;
        let value = refreshed.value.clone();
        *token = Some(refreshed);

        Ok(value)
    }

    /// Drops the cached token so the next call refreshes; used after a 401.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn refresh(&self) -> ProviderResult<AccessToken> {
        tracing::debug!(client_id = %self.client_id, "refreshing access token");

        let body = encode_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ]);

        let resp = self
            .http
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(ProviderError::Configuration(format!(
                "token refresh rejected ({status}): {text}"
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&text)?;

        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: expiry_from(Utc::now(), parsed.expires_in),
        })
    }
}

/// Absolute expiry of a token issued at `now`; lifetimes chrono cannot represent fall back to the default.
fn expiry_from(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| {
            tracing::warn!(expires_in, "token lifetime out of range, using default");
            now + TimeDelta::seconds(default_expires_in())
        })
}

fn encode_form(params: &[(&str, &str)]) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in params {
        ser.append_pair(k, v);
    }
    ser.finish()
}
