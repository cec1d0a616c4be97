// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `neuroscaffold.toml`. Model tables are `BTreeMap`s on purpose: every
//! worker iterates them in the same order without coordination, which the
//! transmitter GID assignment depends on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
    /// Cell models keyed by cell type name.
    pub cell_models: BTreeMap<String, CellModelConfig>,
    /// Connection models keyed by connection model name.
    pub connection_models: BTreeMap<String, ConnectionModelConfig>,
    /// Devices keyed by device name.
    pub devices: BTreeMap<String, DeviceConfig>,
}

/// Global simulation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run name, used in the results file path.
    pub name: String,
    /// Integration timestep in ms.
    pub resolution: f64,
    /// Simulated duration in ms.
    pub duration: f64,
    /// Bath temperature in degrees Celsius.
    pub temperature: f64,
    /// Initial membrane potential in mV.
    pub initial: f64,
    /// Presence of this file in the working directory requests a graceful
    /// early stop, checked once per simulated increment.
    pub interrupt_marker: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "scaffold".to_string(),
            resolution: 0.1,
            duration: 1000.0,
            temperature: 32.0,
            initial: -65.0,
            interrupt_marker: PathBuf::from("interrupt_scaffold"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, e.g. "info" or "neuroscaffold_engine=debug".
    pub level: String,
    /// When set, logs are additionally written to per-run files here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// One cell model declaration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CellModelConfig {
    /// Pure pass-through cell type: forwards spikes, is never materially
    /// simulated and hosts no transmitter hardware.
    pub relay: bool,
    /// Entity without morphology (e.g. an external fiber bundle).
    pub entity: bool,
    /// Record the soma membrane potential of every instance.
    pub record_soma: bool,
    /// Record spike times of every instance.
    pub record_spikes: bool,
    /// Model parameters forwarded to the integration engine.
    pub parameters: BTreeMap<String, f64>,
    pub plotting: Option<PlottingConfig>,
}

/// Display metadata attached to recorded datasets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlottingConfig {
    pub color: String,
    pub label: String,
}

/// One connection model declaration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionModelConfig {
    /// Synapse kinds to instantiate per contact; one receiver is created
    /// per kind.
    pub synapses: Vec<String>,
}

impl ConnectionModelConfig {
    /// Declared synapse kinds, in declaration order.
    pub fn resolve_synapses(&self) -> &[String] {
        &self.synapses
    }
}

/// Closed enumeration of device kinds.
///
/// An unknown kind in the TOML file is rejected at parse time; capability
/// requirements per kind are enforced by [`crate::validate_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    SpikeGenerator,
    CurrentClamp,
    SpikeRecorder,
    VoltageRecorder,
}

impl DeviceKind {
    /// Does this kind generate stimulation patterns on the coordinating
    /// worker (to be broadcast before use)?
    pub fn generates_patterns(&self) -> bool {
        matches!(self, DeviceKind::SpikeGenerator)
    }

    /// Parameters the kind requires to be present in `parameters`.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            DeviceKind::SpikeGenerator => &["interval", "number", "start"],
            DeviceKind::CurrentClamp => &["amplitude"],
            DeviceKind::SpikeRecorder | DeviceKind::VoltageRecorder => &[],
        }
    }

    /// Does this kind stimulate through synapses (and therefore require a
    /// non-empty `synapses` list)?
    pub fn requires_synapses(&self) -> bool {
        matches!(self, DeviceKind::SpikeGenerator)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceKind::SpikeGenerator => "spike_generator",
            DeviceKind::CurrentClamp => "current_clamp",
            DeviceKind::SpikeRecorder => "spike_recorder",
            DeviceKind::VoltageRecorder => "voltage_recorder",
        };
        write!(f, "{}", name)
    }
}

/// How a device selects its target cells.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TargettingConfig {
    /// Every cell of the listed cell types.
    CellType {
        #[serde(default)]
        cell_types: Vec<String>,
    },
    /// An explicit list of cell IDs (which may be relay entry points).
    ByIds {
        #[serde(default)]
        ids: Vec<u64>,
    },
}

impl Default for TargettingConfig {
    fn default() -> Self {
        TargettingConfig::ByIds { ids: Vec::new() }
    }
}

/// One device declaration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub device: DeviceKind,
    #[serde(default)]
    pub targetting: TargettingConfig,
    /// Section index the device attaches to on each target cell.
    #[serde(default)]
    pub section: u32,
    /// Synapse kinds stimulated by the device (spike generator only).
    #[serde(default)]
    pub synapses: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}
