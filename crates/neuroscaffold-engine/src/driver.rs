// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The simulation driver.
//!
//! One driver runs per worker and walks the lifecycle
//! `Unprepared -> Prepared -> Running -> Completed | Stopped`. Preparation
//! composes the pipeline in dependency order (cells, transmitters, relay
//! indexing, receivers, device patterns, device implementation) with a
//! health-checked barrier closing every phase. The run loop advances the
//! shared virtual clock in unit increments, synchronizing and polling the
//! interrupt marker after each one. Collection appends every worker's
//! recorders to the shared archive in a barrier-serialized round-robin.
//!
//! All mutable preparation state (GID counter, transmitter map, relay
//! scheme, recorder list) is built by exactly one phase and read-only
//! afterwards; the driver owns it and threads it explicitly through the
//! pipeline.

use ahash::AHashMap;
use neuroscaffold_config::ScaffoldConfig;
use neuroscaffold_structures::CellId;
use tracing::{debug, info};

use crate::backend::{NeuronBackend, RecorderBinding};
use crate::cells::{create_cells, CellInstance};
use crate::cluster::Communicator;
use crate::devices::{create_devices, prepare_devices, DeviceState};
use crate::error::{EngineError, EngineResult};
use crate::output::SignalArchive;
use crate::partition::Partition;
use crate::phases::PhaseRunner;
use crate::receivers::create_receivers;
use crate::relays::{index_relays, RelayScheme};
use crate::store::NetworkStore;
use crate::transmitters::{create_transmitters, TransmitterMap};

/// Lifecycle of one worker's simulation.
///
/// `Completed` and `Stopped` are terminal; there is no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Unprepared,
    Prepared,
    Running,
    /// Ran to the configured duration.
    Completed,
    /// Gracefully stopped early by the interrupt marker.
    Stopped,
}

impl SimulationState {
    pub fn name(&self) -> &'static str {
        match self {
            SimulationState::Unprepared => "unprepared",
            SimulationState::Prepared => "prepared",
            SimulationState::Running => "running",
            SimulationState::Completed => "completed",
            SimulationState::Stopped => "stopped",
        }
    }

    /// Has the simulation reached a terminal state?
    pub fn is_finished(&self) -> bool {
        matches!(self, SimulationState::Completed | SimulationState::Stopped)
    }
}

/// Drives preparation, simulation and collection for one worker.
pub struct SimulationDriver<'a, B: NeuronBackend> {
    config: &'a ScaffoldConfig,
    store: &'a dyn NetworkStore,
    comm: &'a dyn Communicator,
    backend: B,
    state: SimulationState,
    partition: Partition,
    cells: AHashMap<CellId, CellInstance>,
    transmitter_map: TransmitterMap,
    relay_scheme: RelayScheme,
    devices: Vec<DeviceState>,
    recorders: Vec<RecorderBinding>,
    increments_run: u64,
}

impl<'a, B: NeuronBackend> SimulationDriver<'a, B> {
    pub fn new(
        config: &'a ScaffoldConfig,
        store: &'a dyn NetworkStore,
        comm: &'a dyn Communicator,
        backend: B,
    ) -> Self {
        // Lazy round robin; every worker derives its own set locally.
        let partition = Partition::new(store.cell_total(), comm.nhost(), comm.rank());
        Self {
            config,
            store,
            comm,
            backend,
            state: SimulationState::Unprepared,
            partition,
            cells: AHashMap::new(),
            transmitter_map: TransmitterMap::new(),
            relay_scheme: RelayScheme::new(),
            devices: Vec::new(),
            recorders: Vec::new(),
            increments_run: 0,
        }
    }

    fn expect_state(&self, expected: SimulationState) -> EngineResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                state: self.state.name(),
                expected: expected.name(),
            })
        }
    }

    /// Fail fast on missing upstream data, before any phase barrier.
    ///
    /// A connectivity set required by a non-relay, non-entity model but
    /// absent from the store would otherwise fail deep inside the
    /// barrier-synchronized preparation sequence.
    fn validate_prepare(&self) -> EngineResult<()> {
        for (model_name, _connection) in &self.config.connection_models {
            let set = self.store.connectivity_set(model_name)?;
            let from_model = self.config.cell_models.get(&set.from_type).ok_or_else(|| {
                EngineError::UnknownCellModel {
                    set: model_name.clone(),
                    model: set.from_type.clone(),
                }
            })?;
            let to_model = self.config.cell_models.get(&set.to_type).ok_or_else(|| {
                EngineError::UnknownCellModel {
                    set: model_name.clone(),
                    model: set.to_type.clone(),
                }
            })?;
            if from_model.relay || from_model.entity || to_model.relay || to_model.entity {
                continue;
            }
            if !self.store.has_intersections(model_name) {
                return Err(EngineError::IntersectionDataNotFound {
                    model: model_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Run the full preparation pipeline.
    pub fn prepare(&mut self) -> EngineResult<()> {
        self.expect_state(SimulationState::Unprepared)?;
        info!(
            "[SIM] Preparing simulation '{}' on worker {}/{}",
            self.config.simulation.name,
            self.comm.rank(),
            self.comm.nhost()
        );
        let started = std::time::Instant::now();

        self.validate_prepare()?;

        let simulation = &self.config.simulation;
        self.backend.set_resolution(simulation.resolution);
        self.backend.set_temperature(simulation.temperature);
        self.backend.set_duration(simulation.duration);

        let phases = PhaseRunner::new(self.comm);
        let mut recorders = Vec::new();

        let cells = phases.run("cell creation", || {
            create_cells(
                self.config,
                self.store,
                &self.partition,
                &mut self.backend,
                &mut recorders,
            )
        })?;
        self.cells = cells;

        let transmitter_map = phases.run("transmitter creation", || {
            create_transmitters(
                self.config,
                self.store,
                &self.partition,
                &self.cells,
                &mut self.backend,
            )
        })?;
        self.transmitter_map = transmitter_map;

        let relay_scheme = phases.run("relay indexing", || {
            index_relays(self.config, self.store, &self.partition)
        })?;
        self.relay_scheme = relay_scheme;

        phases.run("receiver creation", || {
            create_receivers(
                self.config,
                self.store,
                &self.partition,
                &self.cells,
                &self.transmitter_map,
                &mut self.backend,
            )
        })?;

        let devices = phases.run("device preparation", || {
            prepare_devices(self.config, self.store, self.comm)
        })?;
        self.devices = devices;

        phases.run("device creation", || {
            create_devices(
                &self.devices,
                self.store,
                self.comm,
                &self.partition,
                &self.cells,
                &self.relay_scheme,
                &mut self.backend,
                &mut recorders,
            )
        })?;

        self.recorders = recorders;
        self.state = SimulationState::Prepared;
        info!(
            "[SIM] Simulator preparation took {:.2?} on worker {}",
            started.elapsed(),
            self.comm.rank()
        );
        Ok(())
    }

    /// Run the barrier-synchronized stepping loop.
    ///
    /// Advances the virtual clock in unit increments to the configured
    /// duration. After every increment all workers synchronize, then each
    /// polls the interrupt marker; its presence requests a graceful early
    /// stop. The loop's barrier keeps the workers in lockstep at increment
    /// granularity, so independent marker checks drift by at most one
    /// increment.
    pub fn run(&mut self) -> EngineResult<()> {
        self.expect_state(SimulationState::Prepared)?;
        self.state = SimulationState::Running;

        self.backend.initialize(self.config.simulation.initial);
        self.comm.barrier()?;
        info!("[SIM] Simulating...");

        let duration = self.config.simulation.duration;
        let marker = &self.config.simulation.interrupt_marker;
        let mut progression = 0.0f64;
        let mut interrupted = false;

        while progression < duration {
            progression += 1.0;
            let advanced = self.backend.advance_to(progression);
            let barrier = self.comm.checked_barrier(advanced.is_ok());
            advanced?;
            barrier?;
            self.increments_run += 1;
            debug!(
                "[SIM] Worker {} at {} / {} ms",
                self.comm.rank(),
                progression,
                duration
            );
            if marker.exists() {
                info!("[SIM] Interrupt requested; stopping simulation");
                interrupted = true;
                break;
            }
        }

        self.state = if interrupted {
            SimulationState::Stopped
        } else {
            SimulationState::Completed
        };
        info!(
            "[SIM] Finished simulation ({}) after {} increments",
            self.state.name(),
            self.increments_run
        );
        Ok(())
    }

    /// Append every worker's recorders to the shared archive.
    ///
    /// One worker writes while all others wait: a barrier-serialized
    /// round robin. Zero write parallelism, but also zero concurrent-write
    /// corruption; collection happens once per run and is not a hot path.
    pub fn collect_output(&mut self, archive: &dyn SignalArchive) -> EngineResult<()> {
        if !self.state.is_finished() {
            return Err(EngineError::InvalidState {
                state: self.state.name(),
                expected: "completed or stopped",
            });
        }

        for node in 0..self.comm.nhost() {
            if node == self.comm.rank() {
                debug!(
                    "[OUTPUT] Worker {} writing {} recorders",
                    node,
                    self.recorders.len()
                );
                if let Err(e) = self.write_recorders(archive) {
                    let _ = self.comm.checked_barrier(false);
                    return Err(e);
                }
            }
            self.comm.checked_barrier(true)?;
        }
        Ok(())
    }

    fn write_recorders(&mut self, archive: &dyn SignalArchive) -> EngineResult<()> {
        let resolution = self.config.simulation.resolution;
        for binding in std::mem::take(&mut self.recorders) {
            let recorder = binding.into_recorder(&mut self.backend);
            let data = recorder.column_data(resolution);
            archive.append(&recorder.path(), data, &recorder.meta)?;
        }
        Ok(())
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn cells(&self) -> &AHashMap<CellId, CellInstance> {
        &self.cells
    }

    pub fn transmitter_map(&self) -> &TransmitterMap {
        &self.transmitter_map
    }

    pub fn relay_scheme(&self) -> &RelayScheme {
        &self.relay_scheme
    }

    pub fn increments_run(&self) -> u64 {
        self.increments_run
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
