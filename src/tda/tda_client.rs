use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::America::New_York;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header::LOCATION};
use serde_json::Value;

use crate::provider::{BrokerageProvider, ProviderError, ProviderResult};
use crate::tda::{tda_auth::OAuthSession, tda_config::TdaConfig};
use crate::types::order::{OrderPlacement, OrderRequest};

#[derive(Debug)]
pub struct TdaClient {
    http: reqwest::Client,
    base_url: String,
    auth: OAuthSession,
}

impl TdaClient {
    pub fn new(config: TdaConfig) -> Self {
        let http = reqwest::Client::new();

        Self {
            auth: OAuthSession::new(http.clone(), &config),
            base_url: config.base_url,
            http,
        }
    }

    async fn get_json(&self, uri_path: &str, query: &[(&str, String)]) -> ProviderResult<Value> {
        let resp = self
            .send(|| {
                self.http
                    .request(Method::GET, format!("{}{}", self.base_url, uri_path))
                    .query(query)
            })
            .await?;

        let text = resp.text().await?;

        match serde_json::from_str(&text) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::error!(error = %e, %text, uri_path, "failed to parse JSON response");
                Err(ProviderError::Malformed(format!("{uri_path}: {e}")))
            }
        }
    }

    /// Sends an authenticated request, retrying once with a fresh token after a 401.
    async fn send<F>(&self, build: F) -> ProviderResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut refreshed = false;

        loop {
            let token = self.auth.access_token().await?;
            let resp = build().bearer_auth(token).send().await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                tracing::debug!("access token rejected, refreshing");
                self.auth.invalidate().await;
                refreshed = true;
                continue;
            }

            if status.is_success() {
                return Ok(resp);
            }

            let body = resp.text().await.unwrap_or_default();

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Configuration(format!("http {status}: {body}"))
                }
                _ => ProviderError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }
    }
}

#[async_trait]
impl BrokerageProvider for TdaClient {
    async fn get_market_hours(&self, asset_class: &str) -> ProviderResult<Value> {
        let today = Utc::now().with_timezone(&New_York).date_naive();
        let uri_path = format!("/marketdata/{}/hours", asset_class.to_uppercase());

        self.get_json(&uri_path, &[("date", today.format("%Y-%m-%d").to_string())])
            .await
    }

    async fn get_account(&self, account_id: &str) -> ProviderResult<Value> {
        self.get_json(&format!("/accounts/{account_id}"), &[]).await
    }

    async fn get_quote(&self, symbol: &str) -> ProviderResult<Value> {
        self.get_json(&format!("/marketdata/{}/quotes", symbol.to_uppercase()), &[])
            .await
    }

    async fn place_order(
        &self,
        account_id: &str,
        order: &OrderRequest,
    ) -> ProviderResult<OrderPlacement> {
        let uri_path = format!("/accounts/{account_id}/orders");

        let resp = self
            .send(|| {
                self.http
                    .request(Method::POST, format!("{}{}", self.base_url, uri_path))
                    .json(order)
            })
            .await?;

        let order_id = resp
            .headers()
            .get(LOCATION)
            .and_then(|location| location.to_str().ok())
            .and_then(order_id_from_location);

        tracing::info!(%account_id, ?order_id, "order accepted");

        Ok(OrderPlacement { order_id })
    }
}

fn order_id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_is_last_location_segment() {
        assert_eq!(
            order_id_from_location("https://api.tdameritrade.com/v1/accounts/123/orders/4567"),
            Some("4567".to_string())
        );
        assert_eq!(
            order_id_from_location("https://api.tdameritrade.com/v1/accounts/123/orders/"),
            None
        );
    }
}
