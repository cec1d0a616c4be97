// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Provides console logging with an env-filter, and optional per-run file
//! logging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging initialization result
///
/// Keep this guard alive for the lifetime of the process; dropping it
/// flushes and closes any file appenders.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Get the log directory path, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize logging with console output and optional file output
///
/// # Arguments
/// * `filter` - tracing filter string, e.g. `"info"` or
///   `"neuroscaffold_engine=debug"`. `RUST_LOG` takes precedence when set.
/// * `log_dir` - base directory for per-run log files (requires the
///   `file-logging` feature; ignored otherwise)
pub fn init_logging(filter: &str, log_dir: Option<PathBuf>) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .context("invalid tracing filter")?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter);

    #[cfg(feature = "file-logging")]
    {
        let mut layers = vec![console_layer.boxed()];
        let mut file_guards = Vec::new();
        let mut run_dir = None;

        if let Some(base_dir) = log_dir {
            // Timestamped run folder, one combined log file per process.
            let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
            let run_folder = base_dir.join(format!("run_{}", timestamp));
            std::fs::create_dir_all(&run_folder).with_context(|| {
                format!("Failed to create log directory: {}", run_folder.display())
            })?;

            let file_appender =
                tracing_appender::rolling::daily(&run_folder, "neuroscaffold.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(filter))
                .boxed();
            layers.push(file_layer);
            run_dir = Some(run_folder);
        }

        Registry::default().with(layers).try_init().ok();

        return Ok(LoggingGuard {
            _file_guards: file_guards,
            log_dir: run_dir,
        });
    }

    #[cfg(not(feature = "file-logging"))]
    {
        let _ = log_dir;
        Registry::default().with(console_layer).try_init().ok();
        Ok(LoggingGuard { log_dir: None })
    }
}
