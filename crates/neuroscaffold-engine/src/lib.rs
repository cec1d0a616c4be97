// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuroscaffold simulation engine
//!
//! The distributed preparation and execution layer: takes an abstract
//! network model (placement, morphology, realized connectivity) and
//! materializes a concrete per-worker simulation.
//!
//! ## Pipeline
//!
//! ```text
//! partition -> cells -> transmitters -> relay indexing -> receivers
//!           -> device patterns -> device implementation
//!           -> run loop -> output collection
//! ```
//!
//! Workers are SPMD: the same program runs on every rank over its own
//! partition of the cell population, single-threaded within itself.
//! Cross-worker state (transmitter GIDs, relay routing, device patterns)
//! is either recomputed identically everywhere from shared inputs or
//! broadcast from rank 0; phase barriers guarantee nobody reads a
//! partially built table.
//!
//! External collaborators stay behind traits: the numerical integration
//! engine ([`NeuronBackend`]), the network repository ([`NetworkStore`]),
//! the persisted output resource ([`SignalArchive`]) and the cluster
//! transport ([`Communicator`]).

pub mod backend;
pub mod cells;
pub mod cluster;
pub mod devices;
pub mod driver;
pub mod error;
pub mod output;
pub mod partition;
pub mod phases;
pub mod receivers;
pub mod relays;
pub mod store;
pub mod transmitters;

pub use backend::{NeuronBackend, RecorderBinding, RecorderKind, RecordingBackend, SignalHandle};
pub use cells::{create_cells, CellInstance};
pub use cluster::{broadcast_result, broadcast_value, Communicator, LocalCluster};
pub use devices::{behavior_for, create_devices, prepare_devices, DeviceBehavior, DeviceState};
pub use driver::{SimulationDriver, SimulationState};
pub use error::{ArchiveError, ClusterError, EngineError, EngineResult};
pub use output::{JsonArchive, MemoryArchive, SignalArchive};
pub use partition::Partition;
pub use phases::PhaseRunner;
pub use receivers::create_receivers;
pub use relays::{index_relays, resolve_relay_chains, RelayScheme};
pub use store::{CellSeed, InMemoryStore, NetworkStore};
pub use transmitters::{create_transmitters, TransmitterMap};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
