// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Loading order:
//! 1. TOML file (base description)
//! 2. Environment variables (runtime overrides)

use crate::{ConfigError, ConfigResult, ScaffoldConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "neuroscaffold.toml";

/// Find the simulation configuration file
///
/// Search order:
/// 1. `NEUROSCAFFOLD_CONFIG_PATH` environment variable
/// 2. Current working directory: `./neuroscaffold.toml`
/// 3. Ancestor directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any
/// location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NEUROSCAFFOLD_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by NEUROSCAFFOLD_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Simulation description '{}' not found in any of these locations:\n{}\n\nSet NEUROSCAFFOLD_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search
///   for the config file.
///
/// # Errors
///
/// Returns an error if the config file is not found or contains invalid
/// TOML. Semantic validation is a separate pass
/// ([`crate::validate_config`]) so a caller can report parse and
/// validation problems distinctly.
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<ScaffoldConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ScaffoldConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROSCAFFOLD_DURATION` -> `simulation.duration`
/// - `NEUROSCAFFOLD_RESOLUTION` -> `simulation.resolution`
/// - `NEUROSCAFFOLD_RUN_NAME` -> `simulation.name`
/// - `NEUROSCAFFOLD_INTERRUPT_MARKER` -> `simulation.interrupt_marker`
/// - `NEUROSCAFFOLD_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut ScaffoldConfig) {
    if let Ok(value) = env::var("NEUROSCAFFOLD_DURATION") {
        if let Ok(duration) = value.parse::<f64>() {
            config.simulation.duration = duration;
        }
    }
    if let Ok(value) = env::var("NEUROSCAFFOLD_RESOLUTION") {
        if let Ok(resolution) = value.parse::<f64>() {
            config.simulation.resolution = resolution;
        }
    }
    if let Ok(value) = env::var("NEUROSCAFFOLD_RUN_NAME") {
        config.simulation.name = value;
    }
    if let Ok(value) = env::var("NEUROSCAFFOLD_INTERRUPT_MARKER") {
        config.simulation.interrupt_marker = PathBuf::from(value);
    }
    if let Ok(value) = env::var("NEUROSCAFFOLD_LOG_LEVEL") {
        config.logging.level = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("NEUROSCAFFOLD_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("NEUROSCAFFOLD_CONFIG_PATH");

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_duration = env::var("NEUROSCAFFOLD_DURATION").ok();
        env::remove_var("NEUROSCAFFOLD_DURATION");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "name = \"minimal\"").unwrap();
        writeln!(file, "duration = 250.0").unwrap();

        let config = load_config(Some(&config_path)).unwrap();

        assert_eq!(config.simulation.name, "minimal");
        assert_eq!(config.simulation.duration, 250.0);
        // Defaults fill the rest.
        assert_eq!(config.simulation.initial, -65.0);

        if let Some(value) = saved_duration {
            env::set_var("NEUROSCAFFOLD_DURATION", value);
        }
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ScaffoldConfig::default();

        env::set_var("NEUROSCAFFOLD_DURATION", "42.5");
        env::set_var("NEUROSCAFFOLD_LOG_LEVEL", "debug");

        apply_environment_overrides(&mut config);

        env::remove_var("NEUROSCAFFOLD_DURATION");
        env::remove_var("NEUROSCAFFOLD_LOG_LEVEL");

        assert_eq!(config.simulation.duration, 42.5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[devices.broken]").unwrap();
        writeln!(file, "device = \"laser_pointer\"").unwrap();

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
