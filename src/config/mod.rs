//! Configuration module for Feedrelay
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use feedrelay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("feedrelay.toml")).unwrap();
//! println!("Sources configured: {}", config.sources.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatabaseConfig, DeliveryConfig, FetcherConfig, SchedulerConfig, SelectorConfig,
    SourceEntry, SourceSettings, TelegramConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
