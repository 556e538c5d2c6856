pub mod tda_auth;
pub mod tda_client;
pub mod tda_config;
