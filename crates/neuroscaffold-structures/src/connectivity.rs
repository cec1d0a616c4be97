// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connectivity records as exposed by the network repository.
//!
//! A [`ConnectivitySet`] is the realized output of one connection model:
//! the full list of synaptic contacts ([`Intersection`]) where compartment
//! data exists, and the plain cell-to-cell [`Connection`] list where it does
//! not (relay-to-relay wiring has no morphology on either side).

use crate::ids::{CellId, SectionId};
use serde::{Deserialize, Serialize};

/// A realized synaptic contact: source cell and compartment, destination
/// cell and compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intersection {
    pub from_id: CellId,
    pub from_section: SectionId,
    pub to_id: CellId,
    pub to_section: SectionId,
}

/// A plain cell-to-cell connection without compartment data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from_id: CellId,
    pub to_id: CellId,
}

/// A non-relay destination at the end of a resolved relay chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalTarget {
    pub cell: CellId,
    pub section: SectionId,
}

impl TerminalTarget {
    pub fn new(cell: CellId, section: SectionId) -> Self {
        Self { cell, section }
    }
}

/// The realized connectivity of one named connection model.
///
/// Read-only once loaded; the `from_type`/`to_type` names resolve against
/// the configured cell models to decide relay/entity classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySet {
    /// Connection model name this set was realized for.
    pub name: String,
    /// Source cell type name.
    pub from_type: String,
    /// Destination cell type name.
    pub to_type: String,
    /// Compartment-level contacts. Empty when no intersection data exists.
    pub intersections: Vec<Intersection>,
    /// Cell-level connections, always present.
    pub connections: Vec<Connection>,
}

impl ConnectivitySet {
    /// Number of realized connections in this set.
    pub fn len(&self) -> usize {
        if self.intersections.is_empty() {
            self.connections.len()
        } else {
            self.intersections.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
