pub mod available_funds;
pub mod market_open;
