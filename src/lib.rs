// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuroscaffold
//!
//! Distributed simulation preparation and execution for scaffold
//! brain-tissue network models: partitions a previously generated network
//! across SPMD workers, wires cross-worker spike transmission, collapses
//! relay chains into direct routing tables, drives the barrier-synchronized
//! stepping loop and collects recorded signals.
//!
//! This umbrella crate re-exports the workspace members:
//!
//! - [`structures`]: core data model (typed IDs, connectivity records,
//!   recorder buffers)
//! - [`config`]: the declarative simulation description
//!   (`neuroscaffold.toml`)
//! - [`engine`]: partitioning, wiring, relay resolution, the loop driver
//! - [`observability`]: logging setup (feature `observability`, default
//!   on)
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use neuroscaffold::prelude::*;
//!
//! let config = neuroscaffold::config::load_config(None).unwrap();
//! neuroscaffold::config::validate_config(&config).unwrap();
//!
//! // One communicator handle per worker; a single-host run uses the
//! // in-process cluster.
//! let workers = LocalCluster::new(1);
//! let store = InMemoryStore::new(); // or any NetworkStore implementation
//! let archive = JsonArchive::new("results_scaffold.json");
//!
//! let mut driver = SimulationDriver::new(
//!     &config,
//!     &store,
//!     &workers[0],
//!     RecordingBackend::new(), // or a real integration-engine binding
//! );
//! driver.prepare().unwrap();
//! driver.run().unwrap();
//! driver.collect_output(&archive).unwrap();
//! ```

pub use neuroscaffold_config as config;
pub use neuroscaffold_engine as engine;
#[cfg(feature = "observability")]
pub use neuroscaffold_observability as observability;
pub use neuroscaffold_structures as structures;

/// The most commonly used types, re-exported flat.
pub mod prelude {
    pub use neuroscaffold_config::{validate_config, ScaffoldConfig};
    pub use neuroscaffold_engine::{
        Communicator, EngineError, EngineResult, InMemoryStore, JsonArchive, LocalCluster,
        MemoryArchive, NetworkStore, NeuronBackend, Partition, RecordingBackend, SignalArchive,
        SimulationDriver, SimulationState,
    };
    pub use neuroscaffold_structures::{CellId, ConnectivitySet, Gid, Recorder, SectionId};
}

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
