use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    Buy,
    Sell,
    BuyToCover,
    SellShort,
    BuyToOpen,
    BuyToClose,
    SellToOpen,
    SellToClose,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Instruction::Buy => "BUY",
            Instruction::Sell => "SELL",
            Instruction::BuyToCover => "BUY_TO_COVER",
            Instruction::SellShort => "SELL_SHORT",
            Instruction::BuyToOpen => "BUY_TO_OPEN",
            Instruction::BuyToClose => "BUY_TO_CLOSE",
            Instruction::SellToOpen => "SELL_TO_OPEN",
            Instruction::SellToClose => "SELL_TO_CLOSE",
        };

        write!(f, "{text}")
    }
}

impl FromStr for Instruction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "BUY_TO_COVER" => Ok(Self::BuyToCover),
            "SELL_SHORT" => Ok(Self::SellShort),
            "BUY_TO_OPEN" => Ok(Self::BuyToOpen),
            "BUY_TO_CLOSE" => Ok(Self::BuyToClose),
            "SELL_TO_OPEN" => Ok(Self::SellToOpen),
            "SELL_TO_CLOSE" => Ok(Self::SellToClose),
            other => Err(anyhow!("unknown instruction: {other}")),
        }
    }
}

/// Order body as accepted by the brokerage `orders` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_type: String,
    pub session: String,
    pub duration: String,
    pub order_strategy_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub order_leg_collection: Vec<OrderLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    pub instruction: Instruction,
    pub quantity: f64,
    pub instrument: OrderInstrument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInstrument {
    pub symbol: String,
    pub asset_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacement {
    /// Order id parsed from the `Location` header, when the provider returns one.
    pub order_id: Option<String>,
}
