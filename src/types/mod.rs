pub mod account;
pub mod market_hours;
pub mod order;
pub mod quote;
