// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell instantiation.
//!
//! Every worker instantiates only the cells it owns. Relays and entities
//! become section-less instances; real cells get their ordered section list
//! from the repository's morphology lookup.

use ahash::AHashMap;
use neuroscaffold_config::ScaffoldConfig;
use neuroscaffold_structures::{CellId, SectionId};
use tracing::{debug, info};

use crate::backend::{NeuronBackend, RecorderBinding, RecorderKind};
use crate::error::{EngineError, EngineResult};
use crate::partition::Partition;
use crate::store::NetworkStore;

/// A locally instantiated cell.
#[derive(Debug, Clone)]
pub struct CellInstance {
    pub id: CellId,
    pub position: [f64; 3],
    /// Cell model name this instance was built from.
    pub model: String,
    pub relay: bool,
    pub entity: bool,
    /// Number of morphological sections; zero for relays and entities.
    pub section_count: usize,
}

impl CellInstance {
    /// Validate a section index against this cell's morphology.
    pub fn section(&self, section: SectionId) -> EngineResult<SectionId> {
        if (section.0 as usize) < self.section_count {
            Ok(section)
        } else {
            Err(EngineError::MissingSection {
                cell: self.id,
                section,
                available: self.section_count,
            })
        }
    }
}

/// Instantiate every locally owned cell and register the recorders its
/// model asks for.
pub fn create_cells(
    config: &ScaffoldConfig,
    store: &dyn NetworkStore,
    partition: &Partition,
    backend: &mut dyn NeuronBackend,
    recorders: &mut Vec<RecorderBinding>,
) -> EngineResult<AHashMap<CellId, CellInstance>> {
    let mut cells = AHashMap::new();

    for (model_name, model) in &config.cell_models {
        let seeds = store.cells_of_type(model_name);
        let section_count = if model.relay || model.entity {
            0
        } else {
            store.section_count(model_name)
        };
        debug!(
            "[CELLS] Placing {} '{}' cells ({} sections each)",
            seeds.len(),
            model_name,
            section_count
        );

        for seed in seeds {
            if !partition.owns(seed.id) {
                continue;
            }
            let instance = CellInstance {
                id: seed.id,
                position: seed.position,
                model: model_name.clone(),
                relay: model.relay,
                entity: model.entity,
                section_count,
            };

            if model.record_soma {
                let signal = backend.record_voltage(instance.id, instance.section(SectionId(0))?);
                recorders.push(recorder_binding(
                    "soma_voltages",
                    &instance,
                    model,
                    signal,
                    RecorderKind::Voltage,
                ));
            }
            if model.record_spikes {
                let signal = backend.record_spikes(instance.id);
                recorders.push(recorder_binding(
                    "soma_spikes",
                    &instance,
                    model,
                    signal,
                    RecorderKind::Spikes { cell: instance.id },
                ));
            }

            cells.insert(instance.id, instance);
        }
    }

    info!(
        "[CELLS] Worker {} created {} cells",
        partition.rank(),
        cells.len()
    );
    Ok(cells)
}

fn recorder_binding(
    group: &str,
    instance: &CellInstance,
    model: &neuroscaffold_config::CellModelConfig,
    signal: crate::backend::SignalHandle,
    kind: RecorderKind,
) -> RecorderBinding {
    let mut meta = AHashMap::new();
    meta.insert("label".to_string(), instance.model.clone());
    if let Some(plotting) = &model.plotting {
        meta.insert("color".to_string(), plotting.color.clone());
        meta.insert("display_label".to_string(), plotting.label.clone());
    }
    RecorderBinding {
        group: group.to_string(),
        tag: instance.id.to_string(),
        meta,
        signal,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::store::{CellSeed, InMemoryStore};
    use neuroscaffold_config::CellModelConfig;

    fn config_with(models: &[(&str, CellModelConfig)]) -> ScaffoldConfig {
        let mut config = ScaffoldConfig::default();
        for (name, model) in models {
            config.cell_models.insert(name.to_string(), model.clone());
        }
        config
    }

    #[test]
    fn only_owned_cells_are_instantiated() {
        let mut store = InMemoryStore::new();
        store.add_cells("granule", 2, (0..4).map(|i| CellSeed::new(i, [0.0; 3])));
        let config = config_with(&[("granule", CellModelConfig::default())]);
        let partition = Partition::new(4, 2, 1);
        let mut backend = RecordingBackend::new();
        let mut recorders = Vec::new();

        let cells =
            create_cells(&config, &store, &partition, &mut backend, &mut recorders).unwrap();

        assert_eq!(cells.len(), 2);
        assert!(cells.contains_key(&CellId(1)));
        assert!(cells.contains_key(&CellId(3)));
        assert!(recorders.is_empty());
    }

    #[test]
    fn recording_flags_register_recorders() {
        let mut store = InMemoryStore::new();
        store.add_cells("purkinje", 4, (0..2).map(|i| CellSeed::new(i, [0.0; 3])));
        let model = CellModelConfig {
            record_soma: true,
            record_spikes: true,
            ..Default::default()
        };
        let config = config_with(&[("purkinje", model)]);
        let partition = Partition::new(2, 1, 0);
        let mut backend = RecordingBackend::new();
        let mut recorders = Vec::new();

        create_cells(&config, &store, &partition, &mut backend, &mut recorders).unwrap();

        // Two cells, a voltage and a spike recorder each.
        assert_eq!(recorders.len(), 4);
        assert!(recorders.iter().any(|r| r.group == "soma_voltages"));
        assert!(recorders.iter().any(|r| r.group == "soma_spikes"));
        assert_eq!(recorders[0].meta.get("label").unwrap(), "purkinje");
    }

    #[test]
    fn relay_instances_have_no_sections() {
        let mut store = InMemoryStore::new();
        store.add_cells("mossy", 0, [CellSeed::new(0, [0.0; 3])]);
        let model = CellModelConfig {
            relay: true,
            ..Default::default()
        };
        let config = config_with(&[("mossy", model)]);
        let partition = Partition::new(1, 1, 0);
        let mut backend = RecordingBackend::new();
        let mut recorders = Vec::new();

        let cells =
            create_cells(&config, &store, &partition, &mut backend, &mut recorders).unwrap();
        let relay = &cells[&CellId(0)];
        assert!(relay.relay);
        assert!(relay.section(SectionId(0)).is_err());
    }
}
