// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuroscaffold configuration system
//!
//! Type-safe loader for the declarative simulation description: global
//! simulation parameters, cell models, connection models and devices, all
//! read from `neuroscaffold.toml` with environment-variable overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use neuroscaffold_config::{load_config, validate_config};
//!
//! let config = load_config(None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid simulation description");
//! println!("Simulating '{}' for {} ms", config.simulation.name, config.simulation.duration);
//! ```
//!
//! Validation is eager and exhaustive: every malformed declaration in the
//! file is reported in one pass, before any preparation work starts.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
