// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Relay-chain resolution.
//!
//! Relay cell types forward spikes without integrating membrane dynamics.
//! A chain `A -> B -> C` with `B` a relay must collapse so that `A`'s
//! transmitter drives hardware wired directly to `C`. This module indexes
//! every relay-sourced connection model and reduces the resulting graph to
//! a table of direct terminal targets per relay entry point.
//!
//! The reduction is an iterative fixed point over a worklist rather than a
//! recursion: chains can be long and the graph can hold several disjoint
//! relay sub-networks, and a pass-based loop handles both without bounded
//! call depth. Termination requires the graph to be acyclic; a full pass
//! that makes no progress means a relay cycle, which is a configuration
//! error, and the resolver fails instead of spinning.

use ahash::AHashMap;
use neuroscaffold_config::ScaffoldConfig;
use neuroscaffold_structures::{CellId, SectionId, TerminalTarget};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::partition::Partition;
use crate::store::NetworkStore;

/// Fully resolved relay routing, filtered to targets this worker owns.
pub type RelayScheme = AHashMap<CellId, Vec<TerminalTarget>>;

/// Edges out of relays whose destination is itself a relay, keyed by the
/// source relay cell.
pub type IntermediateTable = AHashMap<CellId, Vec<CellId>>;
/// Edges out of relays whose destination is real, keyed by the source
/// relay cell.
pub type TerminalTable = AHashMap<CellId, Vec<TerminalTarget>>;

/// Index every relay-sourced connection model and resolve relay chains
/// into this worker's [`RelayScheme`].
pub fn index_relays(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
    partition: &Partition,
) -> EngineResult<RelayScheme> {
    let (intermediate, terminal) = classify_relay_edges(config, store)?;
    let resolved = resolve_relay_chains(intermediate, terminal)?;

    // Keep only the entries with targets on this worker.
    let mut scheme = RelayScheme::new();
    for (relay, targets) in resolved {
        let mine: Vec<TerminalTarget> = targets
            .into_iter()
            .filter(|t| partition.owns(t.cell))
            .collect();
        if !mine.is_empty() {
            scheme.insert(relay, mine);
        }
    }
    info!(
        "[RELAY] Worker {} receives from {} relays",
        partition.rank(),
        scheme.len()
    );
    Ok(scheme)
}

/// Split relay-sourced connection models into intermediate and terminal
/// edge tables.
fn classify_relay_edges(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
) -> EngineResult<(IntermediateTable, TerminalTable)> {
    let mut intermediate = IntermediateTable::new();
    let mut terminal = TerminalTable::new();

    for (model_name, _connection) in &config.connection_models {
        let set = store.connectivity_set(model_name)?;
        let from_model = config.cell_models.get(&set.from_type).ok_or_else(|| {
            EngineError::UnknownCellModel {
                set: model_name.clone(),
                model: set.from_type.clone(),
            }
        })?;
        if !from_model.relay {
            continue;
        }
        let to_model = config.cell_models.get(&set.to_type).ok_or_else(|| {
            EngineError::UnknownCellModel {
                set: model_name.clone(),
                model: set.to_type.clone(),
            }
        })?;

        if to_model.relay {
            debug!(
                "[RELAY] Adding {} '{}' connections as intermediate",
                set.connections.len(),
                model_name
            );
            for connection in &set.connections {
                intermediate
                    .entry(connection.from_id)
                    .or_default()
                    .push(connection.to_id);
            }
        } else {
            debug!(
                "[RELAY] Adding {} '{}' intersections as terminal",
                set.intersections.len(),
                model_name
            );
            for intersection in &set.intersections {
                terminal
                    .entry(intersection.from_id)
                    .or_default()
                    .push(TerminalTarget::new(
                        intersection.to_id,
                        intersection.to_section,
                    ));
            }
        }
    }
    Ok((intermediate, terminal))
}

/// Collapse intermediate relay chains into the terminal table.
///
/// Public so the reduction can be exercised on raw tables; production code
/// goes through [`index_relays`].
pub fn resolve_relay_chains(
    mut intermediate: IntermediateTable,
    mut terminal: TerminalTable,
) -> EngineResult<TerminalTable> {
    debug!(
        "[RELAY] Resolving {} intermediates against {} terminals",
        intermediate.len(),
        terminal.len()
    );

    while !intermediate.is_empty() {
        let mut progressed = false;
        let pending: Vec<CellId> = intermediate.keys().copied().collect();

        for relay in pending {
            let Some(targets) = intermediate.remove(&relay) else {
                continue;
            };
            let mut unresolved = Vec::new();

            for target in targets {
                if target == relay || intermediate.contains_key(&target) {
                    // Still an unresolved intermediary (or a self loop);
                    // wait for a later pass.
                    unresolved.push(target);
                    continue;
                }
                if let Some(resolved) = terminal.get(&target) {
                    // The target is a resolved relay: splice its terminal
                    // targets into ours and drop the edge.
                    let resolved = resolved.clone();
                    terminal.entry(relay).or_default().extend(resolved);
                } else {
                    // Not a relay at all: a direct terminal target. Plain
                    // connections carry no compartment, so it lands on the
                    // soma-root section.
                    terminal
                        .entry(relay)
                        .or_default()
                        .push(TerminalTarget::new(target, SectionId(0)));
                }
                progressed = true;
            }

            if unresolved.is_empty() {
                progressed = true;
                debug!(
                    "[RELAY] Intermediate {} resolved to {} targets",
                    relay,
                    terminal.get(&relay).map_or(0, Vec::len)
                );
            } else {
                intermediate.insert(relay, unresolved);
            }
        }

        if !progressed {
            // A full pass without progress: every remaining intermediate
            // waits on another remaining intermediate.
            let mut cells: Vec<CellId> = intermediate.keys().copied().collect();
            cells.sort_unstable();
            return Err(EngineError::CyclicRelayGraph { cells });
        }
    }

    Ok(terminal)
}
