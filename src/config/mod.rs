//! Configuration module for Bookmatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use bookmatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("bookmatch.toml")).unwrap();
//! println!("Commit mode: {}", config.pipeline.commit_mode.as_str());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, OutputConfig, PipelineConfig, RendererConfig, SourceConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
