// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device scheduling: stimulation sources and recorders.
//!
//! Devices generate patterns and target lists that must be identical on
//! every worker (a shared random stimulation pattern, for instance). Rank
//! 0 computes both and broadcasts them before use; after the broadcast,
//! implementation is purely local. Target resolution consults the relay
//! scheme first (a device addressing a relay entry point fans out to the
//! relay's resolved terminal targets on this worker) and falls back to
//! direct ownership otherwise.
//!
//! Device kinds are a closed enumeration
//! ([`neuroscaffold_config::DeviceKind`]); each kind maps to a
//! [`DeviceBehavior`] implementation selected here, and capability
//! requirements were already checked at configuration validation.

mod current_clamp;
mod recorders;
mod spike_generator;

pub use spike_generator::poisson_train;

use ahash::AHashMap;
use neuroscaffold_config::{DeviceConfig, DeviceKind, ScaffoldConfig, TargettingConfig};
use neuroscaffold_structures::{CellId, SectionId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::backend::{NeuronBackend, RecorderBinding};
use crate::cells::CellInstance;
use crate::cluster::{broadcast_result, Communicator};
use crate::error::{EngineError, EngineResult};
use crate::partition::Partition;
use crate::relays::RelayScheme;
use crate::store::NetworkStore;

/// Spike-time patterns per addressed target.
pub type PatternMap = AHashMap<CellId, Vec<f64>>;

/// A configured device with its broadcast pattern state.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub name: String,
    pub config: DeviceConfig,
    /// Broadcast patterns, present only for pattern-generating kinds.
    pub patterns: Option<PatternMap>,
}

impl DeviceState {
    /// Pattern for one addressed target, when this device generates any.
    pub fn pattern_for(&self, target: CellId) -> Option<&[f64]> {
        self.patterns
            .as_ref()
            .and_then(|p| p.get(&target))
            .map(Vec::as_slice)
    }
}

/// Per-kind device implementation, dispatched from the closed kind
/// enumeration.
pub trait DeviceBehavior: Send + Sync {
    /// Compute per-target patterns on the coordinating worker. Only called
    /// for kinds where
    /// [`DeviceKind::generates_patterns`] is true.
    fn create_patterns(
        &self,
        device: &DeviceState,
        targets: &[CellId],
        rng: &mut StdRng,
    ) -> EngineResult<Vec<(CellId, Vec<f64>)>> {
        let _ = (device, targets, rng);
        Ok(Vec::new())
    }

    /// Implement the device at one resolved location.
    fn implement(
        &self,
        device: &DeviceState,
        target: CellId,
        cell: &CellInstance,
        section: SectionId,
        backend: &mut dyn NeuronBackend,
        recorders: &mut Vec<RecorderBinding>,
    ) -> EngineResult<()>;
}

/// Map a device kind to its implementation.
pub fn behavior_for(kind: DeviceKind) -> &'static dyn DeviceBehavior {
    match kind {
        DeviceKind::SpikeGenerator => &spike_generator::SpikeGenerator,
        DeviceKind::CurrentClamp => &current_clamp::CurrentClamp,
        DeviceKind::SpikeRecorder => &recorders::SpikeRecorder,
        DeviceKind::VoltageRecorder => &recorders::VoltageRecorder,
    }
}

/// Resolve a device's addressed targets from its targeting specification.
///
/// Pure over the repository contents, but still computed on rank 0 and
/// broadcast so future sampled/randomized strategies stay consistent.
fn resolve_targets(device: &DeviceState, store: &dyn NetworkStore) -> Vec<CellId> {
    match &device.config.targetting {
        TargettingConfig::CellType { cell_types } => {
            let mut targets = Vec::new();
            for cell_type in cell_types {
                targets.extend(store.cells_of_type(cell_type).into_iter().map(|s| s.id));
            }
            targets
        }
        TargettingConfig::ByIds { ids } => ids.iter().copied().map(CellId).collect(),
    }
}

/// Resolve one addressed target into local (cell, section) locations.
///
/// Relay entry points fan out to their resolved terminal list (already
/// filtered to locally owned cells); anything else implements directly on
/// the target when this worker owns it. Relays and entities have no
/// sections to implement on and resolve to nothing directly.
fn locations(
    target: CellId,
    device_section: SectionId,
    relay_scheme: &RelayScheme,
    partition: &Partition,
    cells: &AHashMap<CellId, CellInstance>,
) -> Vec<(CellId, SectionId)> {
    if let Some(terminals) = relay_scheme.get(&target) {
        return terminals.iter().map(|t| (t.cell, t.section)).collect();
    }
    if partition.owns(target) {
        if let Some(cell) = cells.get(&target) {
            if !cell.relay && !cell.entity {
                return vec![(target, device_section)];
            }
        }
    }
    Vec::new()
}

/// Phase: broadcast device patterns from the coordinating worker.
pub fn prepare_devices(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
    comm: &dyn Communicator,
) -> EngineResult<Vec<DeviceState>> {
    let mut devices = Vec::new();

    for (name, device_config) in &config.devices {
        let mut state = DeviceState {
            name: name.clone(),
            config: device_config.clone(),
            patterns: None,
        };

        if device_config.device.generates_patterns() {
            let root_patterns = if comm.rank() == 0 {
                let targets = resolve_targets(&state, store);
                let mut rng = StdRng::from_entropy();
                Some(
                    behavior_for(device_config.device).create_patterns(
                        &state,
                        &targets,
                        &mut rng,
                    ),
                )
            } else {
                None
            };
            // Broadcast so every worker holds the exact same (possibly
            // random) patterns.
            let patterns: Vec<(CellId, Vec<f64>)> = broadcast_result(comm, 0, root_patterns)?;
            debug!(
                "[DEVICE] '{}' patterns ready for {} targets",
                name,
                patterns.len()
            );
            state.patterns = Some(patterns.into_iter().collect());
        }

        devices.push(state);
    }
    Ok(devices)
}

/// Phase: broadcast device targets and implement every local location.
#[allow(clippy::too_many_arguments)]
pub fn create_devices(
    devices: &[DeviceState],
    store: &dyn NetworkStore,
    comm: &dyn Communicator,
    partition: &Partition,
    cells: &AHashMap<CellId, CellInstance>,
    relay_scheme: &RelayScheme,
    backend: &mut dyn NeuronBackend,
    recorders: &mut Vec<RecorderBinding>,
) -> EngineResult<()> {
    for device in devices {
        let root_targets = if comm.rank() == 0 {
            Some(Ok(resolve_targets(device, store)))
        } else {
            None
        };
        let targets: Vec<CellId> = broadcast_result(comm, 0, root_targets)?;

        let behavior = behavior_for(device.config.device);
        let mut implemented = 0usize;
        for target in targets {
            for (cell_id, section) in locations(
                target,
                SectionId(device.config.section),
                relay_scheme,
                partition,
                cells,
            ) {
                let cell = cells
                    .get(&cell_id)
                    .ok_or(EngineError::CellNotInstantiated {
                        cell: cell_id,
                        rank: partition.rank(),
                    })?;
                let section = cell.section(section)?;
                behavior.implement(device, target, cell, section, backend, recorders)?;
                implemented += 1;
            }
        }
        info!(
            "[DEVICE] '{}' ({}) implemented at {} locations on worker {}",
            device.name, device.config.device, implemented, partition.rank()
        );
    }
    Ok(())
}
