use serde_json::Value;

use crate::provider::{BrokerageProvider, ProviderResult};
use crate::runtime::entity::{Attributes, Availability};
use crate::runtime::state_store::StateStore;
use crate::types::quote::Quote;

/// Fetches a quote and publishes it as `get_quote_service.<SYMBOL>`.
pub async fn get_quote(
    provider: &dyn BrokerageProvider,
    store: &StateStore,
    symbol: &str,
) -> ProviderResult<Quote> {
    let payload = provider.get_quote(symbol).await?;
    let quote = Quote::from_payload(symbol, &payload)?;

    let attributes = match &quote.raw {
        Value::Object(raw) => raw.clone(),
        _ => Attributes::new(),
    };

    store.publish(
        &format!("get_quote_service.{}", quote.symbol),
        quote.last_price.into(),
        attributes,
        Availability::Available,
    );

    tracing::info!(symbol = %quote.symbol, last_price = ?quote.last_price, "quote published");

    Ok(quote)
}
