// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuroscaffold core data structures
//!
//! Shared data model for the distributed scaffold simulation layer: typed
//! identifiers, connectivity records as read from the network repository,
//! and recorder buffers collected after a simulation run.
//!
//! This crate holds plain data only: no I/O, no cluster communication.

pub mod connectivity;
pub mod ids;
pub mod recorder;

pub use connectivity::{Connection, ConnectivitySet, Intersection, TerminalTarget};
pub use ids::{CellId, Gid, SectionId};
pub use recorder::Recorder;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
