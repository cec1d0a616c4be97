// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure the simulation
//! description is consistent before any preparation work begins. Device
//! capability requirements are enforced here, at configuration time, so a
//! device missing its pattern parameters or target specification is
//! reported up front rather than failing mid-preparation.

use crate::{ConfigError, ConfigResult, DeviceKind, ScaffoldConfig, TargettingConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue { field: String, reason: String },
    MissingRequired { field: String },
    MissingDeviceTargets { device: String },
    MissingDeviceParameter { device: String, parameter: String },
    MissingDeviceSynapses { device: String },
    UnknownCellType { device: String, cell_type: String },
    RelayEntityConflict { cell_model: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::MissingDeviceTargets { device } => {
                write!(
                    f,
                    "Device '{}' targets cells by cell type but does not list any cell types",
                    device
                )
            }
            Self::MissingDeviceParameter { device, parameter } => {
                write!(
                    f,
                    "Device '{}' is missing required parameter '{}'",
                    device, parameter
                )
            }
            Self::MissingDeviceSynapses { device } => {
                write!(
                    f,
                    "Device '{}' stimulates through synapses but lists none",
                    device
                )
            }
            Self::UnknownCellType { device, cell_type } => {
                write!(
                    f,
                    "Device '{}' targets unknown cell type '{}'",
                    device, cell_type
                )
            }
            Self::RelayEntityConflict { cell_model } => {
                write!(
                    f,
                    "Cell model '{}' is declared both relay and entity",
                    cell_model
                )
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive resolution and duration
/// - Relay/entity exclusivity per cell model
/// - Device capability requirements (pattern parameters, synapse lists)
/// - Device target specifications resolving against declared cell models
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &ScaffoldConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_simulation(config, &mut errors);
    validate_cell_models(config, &mut errors);
    validate_connection_models(config, &mut errors);
    validate_devices(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Simulation description validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_simulation(config: &ScaffoldConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.simulation.resolution <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.resolution".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if config.simulation.duration <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.duration".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if config.simulation.name.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "simulation.name".to_string(),
        });
    }
}

fn validate_cell_models(config: &ScaffoldConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, model) in &config.cell_models {
        if model.relay && model.entity {
            errors.push(ConfigValidationError::RelayEntityConflict {
                cell_model: name.clone(),
            });
        }
        if (model.relay || model.entity) && (model.record_soma || model.record_spikes) {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("cell_models.{}", name),
                reason: "relays and entities have no soma to record".to_string(),
            });
        }
    }
}

fn validate_connection_models(config: &ScaffoldConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, model) in &config.connection_models {
        if model.synapses.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("connection_models.{}.synapses", name),
            });
        }
    }
}

fn validate_devices(config: &ScaffoldConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, device) in &config.devices {
        // Capability requirements per device kind.
        for parameter in device.device.required_parameters() {
            if !device.parameters.contains_key(*parameter) {
                errors.push(ConfigValidationError::MissingDeviceParameter {
                    device: name.clone(),
                    parameter: parameter.to_string(),
                });
            }
        }
        if device.device.requires_synapses() && device.synapses.is_empty() {
            errors.push(ConfigValidationError::MissingDeviceSynapses {
                device: name.clone(),
            });
        }

        match &device.targetting {
            TargettingConfig::CellType { cell_types } => {
                if cell_types.is_empty() {
                    errors.push(ConfigValidationError::MissingDeviceTargets {
                        device: name.clone(),
                    });
                }
                for cell_type in cell_types {
                    if !config.cell_models.contains_key(cell_type) {
                        errors.push(ConfigValidationError::UnknownCellType {
                            device: name.clone(),
                            cell_type: cell_type.clone(),
                        });
                    }
                }
            }
            TargettingConfig::ByIds { ids } => {
                if ids.is_empty() {
                    errors.push(ConfigValidationError::MissingDeviceTargets {
                        device: name.clone(),
                    });
                }
            }
        }

        if matches!(device.device, DeviceKind::SpikeGenerator) {
            if let Some(interval) = device.parameters.get("interval") {
                if *interval <= 0.0 {
                    errors.push(ConfigValidationError::InvalidValue {
                        field: format!("devices.{}.parameters.interval", name),
                        reason: "must be positive".to_string(),
                    });
                }
            }
        }
    }
}
