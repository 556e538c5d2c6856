use std::env;

use crate::config::entry_config::EntryConfig;

#[derive(Clone)]
pub struct TdaConfig {
    pub consumer_key: String,
    pub refresh_token: String,
    pub base_url: String,
    pub token_url: String,
}

impl TdaConfig {
    pub fn from_entry(entry: &EntryConfig) -> anyhow::Result<Self> {
        let refresh_token = env::var("TDA_REFRESH_TOKEN")
            .map_err(|_| anyhow::anyhow!("TDA_REFRESH_TOKEN not set"))?;

        Ok(Self {
            consumer_key: entry.consumer_key.clone(),
            refresh_token,
            base_url: entry.api.base_url.trim_end_matches('/').to_string(),
            token_url: entry.api.token_url.clone(),
        })
    }

    /// OAuth client id: the consumer key with the `@AMER.OAUTHAP` suffix the token endpoint expects.
    pub fn client_id(&self) -> String {
        if self.consumer_key.contains('@') {
            self.consumer_key.clone()
        } else {
            format!("{}@AMER.OAUTHAP", self.consumer_key)
        }
    }
}

impl std::fmt::Debug for TdaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdaConfig")
            .field("consumer_key", &self.consumer_key)
            .field("refresh_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}
