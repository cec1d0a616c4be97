// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Receiver creation: the receiving half of every cross-worker spike
//! channel.
//!
//! Receivers are created only on the worker that owns the destination
//! cell, one per synapse kind the connection model declares. The
//! transmitter GID is looked up in the map built by
//! [`crate::transmitters::create_transmitters`]; a miss means that build
//! ran incompletely and is fatal.

use ahash::AHashMap;
use neuroscaffold_config::ScaffoldConfig;
use neuroscaffold_structures::CellId;
use tracing::{debug, info};

use crate::backend::NeuronBackend;
use crate::cells::CellInstance;
use crate::error::{EngineError, EngineResult};
use crate::partition::Partition;
use crate::store::NetworkStore;
use crate::transmitters::TransmitterMap;

/// Wire every locally owned destination of every non-relay connection
/// model to its transmitter.
pub fn create_receivers(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
    partition: &Partition,
    cells: &AHashMap<CellId, CellInstance>,
    transmitter_map: &TransmitterMap,
    backend: &mut dyn NeuronBackend,
) -> EngineResult<()> {
    let mut created = 0usize;

    for (model_name, connection) in &config.connection_models {
        let set = store.connectivity_set(model_name)?;
        let from_model = config.cell_models.get(&set.from_type).ok_or_else(|| {
            EngineError::UnknownCellModel {
                set: model_name.clone(),
                model: set.from_type.clone(),
            }
        })?;
        if from_model.relay {
            // Relay-sourced wiring was collapsed by the relay resolver.
            continue;
        }
        let to_model = config.cell_models.get(&set.to_type).ok_or_else(|| {
            EngineError::UnknownCellModel {
                set: model_name.clone(),
                model: set.to_type.clone(),
            }
        })?;
        if to_model.relay {
            // Cell-to-relay receivers would need the relay scheme on the
            // sending side; only devices address relays today.
            return Err(EngineError::RelayReceiversUnsupported {
                model: model_name.clone(),
            });
        }

        let synapse_kinds = connection.resolve_synapses();
        let mut model_receivers = 0usize;
        for intersection in &set.intersections {
            if !partition.owns(intersection.to_id) {
                continue;
            }
            let cell =
                cells
                    .get(&intersection.to_id)
                    .ok_or(EngineError::CellNotInstantiated {
                        cell: intersection.to_id,
                        rank: partition.rank(),
                    })?;
            let section = cell.section(intersection.to_section)?;
            let gid = transmitter_map
                .get(&(intersection.from_id, intersection.from_section))
                .copied()
                .ok_or_else(|| {
                    EngineError::transmitter_lookup(
                        model_name,
                        intersection.from_id,
                        intersection.from_section,
                    )
                })?;
            for synapse in synapse_kinds {
                backend.create_receiver(cell.id, section, gid, synapse)?;
                model_receivers += 1;
            }
        }
        debug!(
            "[WIRING] '{}': {} receivers on worker {}",
            model_name,
            model_receivers,
            partition.rank()
        );
        created += model_receivers;
    }

    info!(
        "[WIRING] Worker {} created {} receivers",
        partition.rank(),
        created
    );
    Ok(())
}
