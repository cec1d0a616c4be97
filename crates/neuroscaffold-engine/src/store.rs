// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Access to the persisted network model.
//!
//! The network repository (placement, morphology, realized connectivity) is
//! an external collaborator; the engine consumes it through the
//! [`NetworkStore`] trait and never writes to it. [`InMemoryStore`] is the
//! in-process implementation used by the test suites.

use ahash::{AHashMap, AHashSet};
use neuroscaffold_structures::{CellId, ConnectivitySet};

use crate::error::{EngineError, EngineResult};

/// A placed cell as read from the repository: identity and position only.
#[derive(Debug, Clone, Copy)]
pub struct CellSeed {
    pub id: CellId,
    pub position: [f64; 3],
}

impl CellSeed {
    pub fn new(id: u64, position: [f64; 3]) -> Self {
        Self {
            id: CellId(id),
            position,
        }
    }
}

/// Read-only view of the persisted network model.
///
/// Queries may be called repeatedly per connection model; implementations
/// are expected to make them cheap (or cache).
pub trait NetworkStore: Send + Sync {
    /// Total number of placed cells (entities included).
    fn cell_total(&self) -> u64;

    /// All placed cells of one cell type, in repository order.
    fn cells_of_type(&self, cell_type: &str) -> Vec<CellSeed>;

    /// Number of morphological sections instances of `cell_type` carry.
    /// Zero for relays and entities.
    fn section_count(&self, cell_type: &str) -> usize;

    /// The realized connectivity of a connection model.
    fn connectivity_set(&self, model: &str) -> EngineResult<ConnectivitySet>;

    /// Does compartment-level intersection data exist for this model?
    fn has_intersections(&self, model: &str) -> bool;
}

/// In-memory network model for tests and programmatic construction.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    cells: AHashMap<String, Vec<CellSeed>>,
    section_counts: AHashMap<String, usize>,
    sets: AHashMap<String, ConnectivitySet>,
    with_intersections: AHashSet<String>,
    cell_total: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register placed cells of one type with a shared section count.
    pub fn add_cells(
        &mut self,
        cell_type: &str,
        sections: usize,
        seeds: impl IntoIterator<Item = CellSeed>,
    ) -> &mut Self {
        let seeds: Vec<CellSeed> = seeds.into_iter().collect();
        self.cell_total += seeds.len() as u64;
        self.section_counts.insert(cell_type.to_string(), sections);
        self.cells
            .entry(cell_type.to_string())
            .or_default()
            .extend(seeds);
        self
    }

    /// Register the realized connectivity of one model, replacing any
    /// previous set under the same name.
    pub fn add_set(&mut self, set: ConnectivitySet) -> &mut Self {
        if set.intersections.is_empty() {
            self.with_intersections.remove(&set.name);
        } else {
            self.with_intersections.insert(set.name.clone());
        }
        self.sets.insert(set.name.clone(), set);
        self
    }
}

impl NetworkStore for InMemoryStore {
    fn cell_total(&self) -> u64 {
        self.cell_total
    }

    fn cells_of_type(&self, cell_type: &str) -> Vec<CellSeed> {
        self.cells.get(cell_type).cloned().unwrap_or_default()
    }

    fn section_count(&self, cell_type: &str) -> usize {
        self.section_counts.get(cell_type).copied().unwrap_or(0)
    }

    fn connectivity_set(&self, model: &str) -> EngineResult<ConnectivitySet> {
        self.sets
            .get(model)
            .cloned()
            .ok_or_else(|| EngineError::ConnectivitySetMissing {
                model: model.to_string(),
            })
    }

    fn has_intersections(&self, model: &str) -> bool {
        self.with_intersections.contains(model)
    }
}
