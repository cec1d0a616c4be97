// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for simulation preparation and execution.
//!
//! Everything here is fatal for the local worker. Because preparation is
//! barrier-synchronized, a local failure is also surfaced to every peer
//! through the health-checked barrier (see [`crate::cluster`]) so no worker
//! is left blocking on a phase boundary that will never be reached.

use neuroscaffold_structures::{CellId, SectionId};

/// Errors raised by the cluster communicator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterError {
    /// A peer worker reported a failure at a phase boundary; the local
    /// worker must abort instead of waiting on collective calls that will
    /// never complete.
    #[error("A peer worker aborted; tearing down before the next phase")]
    PeerAborted,

    #[error("Broadcast root {root} produced no payload")]
    MissingPayload { root: usize },

    #[error("Broadcast payload codec failure: {0}")]
    Codec(String),
}

/// Errors raised by the signal archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Failed to persist dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset '{path}' append shape mismatch: existing data has {existing} columns, new data has {new}")]
    ShapeMismatch {
        path: String,
        existing: usize,
        new: usize,
    },

    #[error("Archive codec failure: {0}")]
    Codec(String),
}

/// Errors raised during preparation, simulation and collection.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // --- Missing upstream data (pre-flight) ---
    #[error("No connectivity data found for '{model}'")]
    ConnectivitySetMissing { model: String },

    #[error("No intersection data found for '{model}'")]
    IntersectionDataNotFound { model: String },

    // --- Configuration errors ---
    #[error("Connectivity set '{set}' references unknown cell model '{model}'")]
    UnknownCellModel { set: String, model: String },

    #[error("Receiver wiring onto relay destinations is not supported (connection model '{model}')")]
    RelayReceiversUnsupported { model: String },

    #[error("Relay graph does not converge; cyclic relay chain among cells {cells:?}")]
    CyclicRelayGraph { cells: Vec<CellId> },

    // --- Data consistency errors ---
    #[error("Cell {cell} has no section {section} ({available} sections available)")]
    MissingSection {
        cell: CellId,
        section: SectionId,
        available: usize,
    },

    #[error(
        "Transmitter lookup failed for cell {cell} section {section} in '{model}': \
         the transmitter map is incomplete"
    )]
    TransmitterLookup {
        model: String,
        cell: CellId,
        section: SectionId,
    },

    #[error("Cell {cell} was addressed on worker {rank} but is not instantiated there")]
    CellNotInstantiated { cell: CellId, rank: usize },

    // --- Lifecycle ---
    #[error("Simulation is in state '{state}'; expected '{expected}'")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    // --- External collaborators ---
    #[error("Integration engine failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl EngineError {
    /// Convenience constructor for transmitter-map misses.
    pub fn transmitter_lookup(model: &str, cell: CellId, section: SectionId) -> Self {
        EngineError::TransmitterLookup {
            model: model.to_string(),
            cell,
            section,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
