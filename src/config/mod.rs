pub mod entry_config;
