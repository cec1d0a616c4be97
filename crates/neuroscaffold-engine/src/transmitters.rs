// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transmitter creation: the sending half of every cross-worker spike
//! channel.
//!
//! Every worker recomputes the full transmitter map from the same model
//! list and the same connectivity data, so the maps are identical across
//! the cluster without any communication. The dedup pass runs over sorted
//! pairs, which makes GID assignment deterministic across runs as well,
//! stronger than the within-run consistency the wiring needs, and free.

use std::collections::BTreeSet;

use ahash::AHashMap;
use neuroscaffold_config::ScaffoldConfig;
use neuroscaffold_structures::{CellId, Gid, SectionId};
use tracing::{debug, info};

use crate::backend::NeuronBackend;
use crate::cells::CellInstance;
use crate::error::{EngineError, EngineResult};
use crate::partition::Partition;
use crate::store::NetworkStore;

/// Mapping from a presynaptic release site to its transmitter GID.
pub type TransmitterMap = AHashMap<(CellId, SectionId), Gid>;

/// Build the global transmitter map and materialize the locally owned
/// transmitters.
///
/// Relay-sourced connection models are skipped: relays never host physical
/// transmitter hardware, their wiring is collapsed by the relay resolver.
pub fn create_transmitters(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
    partition: &Partition,
    cells: &AHashMap<CellId, CellInstance>,
    backend: &mut dyn NeuronBackend,
) -> EngineResult<TransmitterMap> {
    let mut map = TransmitterMap::new();
    // Single GID counter across all models: GIDs are globally unique and
    // never reused within a run.
    let mut next_gid = 0u64;
    let mut created = 0usize;

    for (model_name, _connection) in &config.connection_models {
        let set = store.connectivity_set(model_name)?;
        let from_model = config.cell_models.get(&set.from_type).ok_or_else(|| {
            EngineError::UnknownCellModel {
                set: model_name.clone(),
                model: set.from_type.clone(),
            }
        })?;
        if from_model.relay {
            debug!(
                "[WIRING] Source is a relay; skipping '{}' transmitters",
                model_name
            );
            continue;
        }

        // Many postsynaptic targets share one presynaptic release site;
        // reduce to the distinct (cell, section) pairs.
        let unique_transmitters: BTreeSet<(CellId, SectionId)> = set
            .intersections
            .iter()
            .map(|i| (i.from_id, i.from_section))
            .collect();

        for pair in unique_transmitters {
            let gid = Gid(next_gid);
            next_gid += 1;
            map.insert(pair, gid);

            let (cell_id, section) = pair;
            if !partition.owns(cell_id) {
                continue;
            }
            let cell = cells
                .get(&cell_id)
                .ok_or(EngineError::CellNotInstantiated {
                    cell: cell_id,
                    rank: partition.rank(),
                })?;
            backend.create_transmitter(cell.id, cell.section(section)?, gid)?;
            created += 1;
        }
    }

    info!(
        "[WIRING] Worker {} created {} transmitters ({} GIDs assigned)",
        partition.rank(),
        created,
        next_gid
    );
    Ok(map)
}
