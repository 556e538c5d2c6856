pub mod error;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::order::{OrderPlacement, OrderRequest};

pub use error::{ErrorKind, ProviderError};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Read and trade operations of the brokerage API the sensors and services sit on.
///
/// Payloads are returned raw; each caller picks out the keys it needs so a
/// missing key only affects the field that reads it.
#[async_trait]
pub trait BrokerageProvider: Send + Sync {
    async fn get_market_hours(&self, asset_class: &str) -> ProviderResult<Value>;

    async fn get_account(&self, account_id: &str) -> ProviderResult<Value>;

    async fn get_quote(&self, symbol: &str) -> ProviderResult<Value>;

    async fn place_order(
        &self,
        account_id: &str,
        order: &OrderRequest,
    ) -> ProviderResult<OrderPlacement>;
}
