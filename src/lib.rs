pub mod config;
pub mod market;
pub mod provider;
pub mod runtime;
pub mod scheduling;
pub mod sensors;
pub mod services;
pub mod tda;
pub mod types;

#[cfg(test)]
mod testing;
