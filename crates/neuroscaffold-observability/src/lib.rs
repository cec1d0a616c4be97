// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuroscaffold observability
//!
//! Logging initialization shared by every worker process. Console output is
//! always on; per-run file logging is available behind the `file-logging`
//! feature.
//!
//! In a multi-worker run each process initializes its own subscriber; the
//! worker rank is carried in the log messages themselves, not in the
//! subscriber configuration, so ranks can share a filter string.

pub mod init;

pub use init::{init_logging, LoggingGuard};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
