pub mod fixed_interval_policy;
pub mod market_hours_policy;
