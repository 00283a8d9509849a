//! Configuration module for Cloudsweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cloudsweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cloudsweep.toml")).unwrap();
//! println!("Checkpoint every {} entries", config.crawler.checkpoint_interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DeleterConfig, KeepStrategy, OutputConfig, RemoteConfig, TargetConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
