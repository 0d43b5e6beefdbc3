//! Configuration Module
//!
//! Loads and validates configuration from defaults, TOML files and the
//! environment.

pub mod loader;

pub use loader::{
    Config, ConfigError, load_config, parse_config, expand_path,
};
