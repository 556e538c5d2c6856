use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::provider::BrokerageProvider;
use crate::types::order::{
    Instruction, OrderInstrument, OrderLeg, OrderPlacement, OrderRequest,
};

/// Fields of a `place_order` call, named as callers send them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceOrderCall {
    pub price: Option<f64>,
    pub instruction: Instruction,
    pub quantity: f64,
    pub symbol: String,
    pub account_id: String,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    #[serde(default = "default_session")]
    pub session: String,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(rename = "orderStrategyType", default = "default_strategy")]
    pub order_strategy_type: String,
    #[serde(rename = "assetType", default = "default_asset_type")]
    pub asset_type: String,
}

impl PlaceOrderCall {
    pub fn to_order(&self) -> OrderRequest {
        let order_type = self.order_type.to_uppercase();

        /* NOTE: market orders must not carry a price */
        let price = match order_type.as_str() {
            "MARKET" => None,
            _ => self.price,
        };

        OrderRequest {
            order_type,
            session: self.session.to_uppercase(),
            duration: self.duration.to_uppercase(),
            order_strategy_type: self.order_strategy_type.to_uppercase(),
            price,
            order_leg_collection: vec![OrderLeg {
                instruction: self.instruction,
                quantity: self.quantity,
                instrument: OrderInstrument {
                    symbol: self.symbol.to_uppercase(),
                    asset_type: self.asset_type.to_uppercase(),
                },
            }],
        }
    }
}

fn default_order_type() -> String {
    "LIMIT".to_string()
}

fn default_session() -> String {
    "NORMAL".to_string()
}

fn default_duration() -> String {
    "DAY".to_string()
}

fn default_strategy() -> String {
    "SINGLE".to_string()
}

fn default_asset_type() -> String {
    "EQUITY".to_string()
}

pub async fn place_order(
    provider: &dyn BrokerageProvider,
    call: &PlaceOrderCall,
) -> Result<OrderPlacement> {
    if call.quantity <= 0.0 || !call.quantity.is_finite() {
        anyhow::bail!("quantity must be > 0, got {}", call.quantity);
    }

    let order = call.to_order();
    info!(
        account_id = %call.account_id,
        symbol = %call.symbol,
        instruction = %call.instruction,
        quantity = call.quantity,
        price = ?order.price,
        "placing order"
    );

    provider
        .place_order(&call.account_id, &order)
        .await
        .with_context(|| format!("place order for {} on account {} failed", call.symbol, call.account_id))
}
