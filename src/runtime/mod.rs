pub mod driver;
pub mod entity;
pub mod host;
pub mod state_store;
pub mod timer;
