use serde_json::Value;

use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub raw: Value,
}

impl Quote {
    /// Picks `symbol` out of a quotes payload keyed by symbol.
    pub fn from_payload(symbol: &str, payload: &Value) -> Result<Self, ProviderError> {
        let symbol = symbol.to_uppercase();
        let raw = payload
            .get(&symbol)
            .filter(|quote| quote.is_object())
            .ok_or_else(|| ProviderError::Malformed(format!("no quote for {symbol} in response")))?;

        Ok(Self {
            last_price: raw.get("lastPrice").and_then(Value::as_f64),
            symbol,
            raw: raw.clone(),
        })
    }
}
