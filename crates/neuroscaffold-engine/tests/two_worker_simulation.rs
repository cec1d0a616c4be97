// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end SPMD scenario: two workers, four cells, one relay fan-out.
//!
//! Cell 1 is a relay fed conceptually by cell 0; its outgoing edges land
//! on granule cells 2 and 3. Round-robin partitioning puts {0, 2} on
//! worker 0 and {1, 3} on worker 1, so each worker must wire exactly its
//! own share of the relay fan-out and of the direct granule-to-granule
//! connectivity.

use std::sync::Arc;

use neuroscaffold_config::{CellModelConfig, ConnectionModelConfig, PlottingConfig, ScaffoldConfig};
use neuroscaffold_engine::{
    Communicator, LocalCluster, MemoryArchive, RecordingBackend, SignalArchive, SimulationDriver,
    SimulationState,
};
use neuroscaffold_engine::store::{CellSeed, InMemoryStore};
use neuroscaffold_structures::{CellId, ConnectivitySet, Gid, Intersection, SectionId};

fn scenario_config() -> ScaffoldConfig {
    let mut config = ScaffoldConfig::default();
    config.simulation.name = "relay_scenario".to_string();
    config.simulation.duration = 5.0;
    config.simulation.resolution = 0.1;

    config.cell_models.insert(
        "granule".to_string(),
        CellModelConfig {
            record_soma: true,
            plotting: Some(PlottingConfig {
                color: "#e62314".to_string(),
                label: "Granule cell".to_string(),
            }),
            ..Default::default()
        },
    );
    config.cell_models.insert(
        "mossy".to_string(),
        CellModelConfig {
            relay: true,
            ..Default::default()
        },
    );

    config.connection_models.insert(
        "granule_to_granule".to_string(),
        ConnectionModelConfig {
            synapses: vec!["AMPA".to_string(), "NMDA".to_string()],
        },
    );
    config.connection_models.insert(
        "mossy_to_granule".to_string(),
        ConnectionModelConfig {
            synapses: vec!["AMPA".to_string()],
        },
    );

    let stim: neuroscaffold_config::DeviceConfig = toml::from_str(
        r#"
        device = "spike_generator"
        targetting = { strategy = "by_ids", ids = [1] }
        synapses = ["AMPA"]
        [parameters]
        interval = 2.5
        number = 4.0
        start = 1.0
        "#,
    )
    .unwrap();
    config.devices.insert("stim".to_string(), stim);

    let vm: neuroscaffold_config::DeviceConfig = toml::from_str(
        r#"
        device = "voltage_recorder"
        targetting = { strategy = "cell_type", cell_types = ["granule"] }
        "#,
    )
    .unwrap();
    config.devices.insert("vm".to_string(), vm);

    config
}

fn scenario_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.add_cells("granule", 2, [
        CellSeed::new(0, [10.0, 0.0, 0.0]),
        CellSeed::new(2, [30.0, 0.0, 0.0]),
        CellSeed::new(3, [40.0, 0.0, 0.0]),
    ]);
    store.add_cells("mossy", 0, [CellSeed::new(1, [20.0, 0.0, 0.0])]);

    // Direct granule wiring: one release site (0, s1) driving 2 and 3.
    store.add_set(ConnectivitySet {
        name: "granule_to_granule".into(),
        from_type: "granule".into(),
        to_type: "granule".into(),
        intersections: vec![
            Intersection {
                from_id: CellId(0),
                from_section: SectionId(1),
                to_id: CellId(2),
                to_section: SectionId(0),
            },
            Intersection {
                from_id: CellId(0),
                from_section: SectionId(1),
                to_id: CellId(3),
                to_section: SectionId(1),
            },
        ],
        connections: vec![],
    });
    // Relay fan-out: relay 1 lands on (2, s1) and (3, s0).
    store.add_set(ConnectivitySet {
        name: "mossy_to_granule".into(),
        from_type: "mossy".into(),
        to_type: "granule".into(),
        intersections: vec![
            Intersection {
                from_id: CellId(1),
                from_section: SectionId(0),
                to_id: CellId(2),
                to_section: SectionId(1),
            },
            Intersection {
                from_id: CellId(1),
                from_section: SectionId(0),
                to_id: CellId(3),
                to_section: SectionId(0),
            },
        ],
        connections: vec![],
    });
    store
}

#[test]
fn two_workers_prepare_run_and_collect() {
    let config = Arc::new(scenario_config());
    let store = Arc::new(scenario_store());
    let archive = Arc::new(MemoryArchive::new());

    let results = LocalCluster::run(2, |comm| {
        let rank = comm.rank();
        let mut driver = SimulationDriver::new(
            config.as_ref(),
            store.as_ref(),
            &comm,
            RecordingBackend::new(),
        );
        driver.prepare().unwrap();
        driver.run().unwrap();
        driver.collect_output(archive.as_ref()).unwrap();

        let backend_transmitters = driver.backend().transmitters.clone();
        let backend_receivers = driver.backend().receivers.clone();
        let backend_stimuli = driver.backend().stimuli.clone();
        (
            rank,
            driver.state(),
            driver.increments_run(),
            driver.cells().keys().copied().collect::<Vec<_>>(),
            driver.transmitter_map().clone(),
            driver.relay_scheme().clone(),
            backend_transmitters,
            backend_receivers,
            backend_stimuli,
        )
    });

    for (rank, state, increments, mut cells, map, scheme, transmitters, receivers, stimuli) in
        results
    {
        assert_eq!(state, SimulationState::Completed);
        assert_eq!(increments, 5);

        cells.sort_unstable();
        let gid = map[&(CellId(0), SectionId(1))];
        assert_eq!(map.len(), 1, "one distinct release site");
        assert_eq!(gid, Gid(0));

        if rank == 0 {
            // Worker 0 owns cells 0 and 2.
            assert_eq!(cells, vec![CellId(0), CellId(2)]);
            // The release site lives on cell 0, owned here.
            assert_eq!(transmitters, vec![(CellId(0), SectionId(1), gid)]);
            // Destination 2 is local: AMPA + NMDA receivers.
            assert_eq!(receivers.len(), 2);
            for (cell, section, receiver_gid, _) in &receivers {
                assert_eq!(*cell, CellId(2));
                assert_eq!(*section, SectionId(0));
                assert_eq!(*receiver_gid, gid);
            }
            // Relay 1 routes to (2, s1) here and never to cell 3.
            assert_eq!(scheme[&CellId(1)].len(), 1);
            assert_eq!(scheme[&CellId(1)][0].cell, CellId(2));
            assert_eq!(scheme[&CellId(1)][0].section, SectionId(1));
            // The generator addressed relay 1 and fanned out locally.
            assert_eq!(stimuli.len(), 1);
            assert_eq!(stimuli[0].0, CellId(2));
            assert_eq!(stimuli[0].1, SectionId(1));
        } else {
            // Worker 1 owns cells 1 (the relay) and 3.
            assert_eq!(cells, vec![CellId(1), CellId(3)]);
            assert!(transmitters.is_empty(), "relays host no transmitters");
            assert_eq!(receivers.len(), 2);
            for (cell, ..) in &receivers {
                assert_eq!(*cell, CellId(3));
            }
            assert_eq!(scheme[&CellId(1)].len(), 1);
            assert_eq!(scheme[&CellId(1)][0].cell, CellId(3));
            assert!(!scheme[&CellId(1)].iter().any(|t| t.cell == CellId(2)));
            assert_eq!(stimuli.len(), 1);
            assert_eq!(stimuli[0].0, CellId(3));
        }
    }

    // Both workers appended their recorders: soma voltages (model flag)
    // and the voltage-recorder device, for granules 0, 2 and 3.
    let paths = archive.paths();
    for cell in ["0", "2", "3"] {
        assert!(paths.contains(&format!("recorders/soma_voltages/{cell}")));
        assert!(paths.contains(&format!("recorders/vm/{cell}")));
    }
    assert!(!paths.iter().any(|p| p.contains("/1")), "no relay recorders");

    // Five increments, one sample each.
    let data = archive.read("recorders/soma_voltages/0").unwrap();
    assert_eq!(data.nrows(), 5);
    assert_eq!(data.ncols(), 2);

    // Plotting metadata was attached to the soma recorder.
    let attrs = archive.attrs("recorders/soma_voltages/2").unwrap();
    assert_eq!(attrs.get("label").unwrap(), "granule");
    assert_eq!(attrs.get("color").unwrap(), "#e62314");
    assert_eq!(attrs.get("display_label").unwrap(), "Granule cell");
}

#[test]
fn spike_patterns_match_across_workers() {
    let config = Arc::new(scenario_config());
    let store = Arc::new(scenario_store());

    let results = LocalCluster::run(2, |comm| {
        let mut driver = SimulationDriver::new(
            config.as_ref(),
            store.as_ref(),
            &comm,
            RecordingBackend::new(),
        );
        driver.prepare().unwrap();
        driver.backend().stimuli.clone()
    });

    // Each worker stimulated its own relay terminal with the exact same
    // broadcast pattern.
    let pattern0 = &results[0][0].3;
    let pattern1 = &results[1][0].3;
    assert_eq!(pattern0, pattern1);
}
