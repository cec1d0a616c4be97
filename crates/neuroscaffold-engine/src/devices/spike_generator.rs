// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Poisson spike-train stimulation.

use neuroscaffold_structures::{CellId, SectionId};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{trace, warn};

use crate::backend::{NeuronBackend, RecorderBinding};
use crate::cells::CellInstance;
use crate::devices::{DeviceBehavior, DeviceState};
use crate::error::EngineResult;

/// Stimulates target synapses with a Poisson-distributed spike train
/// shared by every worker.
pub struct SpikeGenerator;

/// Sample a Poisson spike train: events at `frequency` (1/ms) over
/// `duration` ms, offset by `start` ms. Times are strictly increasing.
pub fn poisson_train(frequency: f64, duration: f64, start: f64, rng: &mut StdRng) -> Vec<f64> {
    let mut spikes = Vec::new();
    let mut t = start;
    loop {
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        t += -u.ln() / frequency;
        if t >= start + duration {
            break;
        }
        spikes.push(t);
    }
    spikes
}

impl DeviceBehavior for SpikeGenerator {
    fn create_patterns(
        &self,
        device: &DeviceState,
        targets: &[CellId],
        rng: &mut StdRng,
    ) -> EngineResult<Vec<(CellId, Vec<f64>)>> {
        // Presence of these parameters was checked at config validation.
        let interval = device.config.parameters["interval"];
        let number = device.config.parameters["number"];
        let start = device.config.parameters["start"];
        let frequency = 1.0 / interval;
        let duration = interval * number;

        let mut patterns = Vec::with_capacity(targets.len());
        for &target in targets {
            let pattern = poisson_train(frequency, duration, start, rng);
            trace!(
                "[DEVICE] '{}' pattern of {} spikes for target {}",
                device.name,
                pattern.len(),
                target
            );
            patterns.push((target, pattern));
        }
        Ok(patterns)
    }

    fn implement(
        &self,
        device: &DeviceState,
        target: CellId,
        cell: &CellInstance,
        section: SectionId,
        backend: &mut dyn NeuronBackend,
        _recorders: &mut Vec<RecorderBinding>,
    ) -> EngineResult<()> {
        let Some(pattern) = device.pattern_for(target) else {
            warn!(
                "[DEVICE] '{}' has no pattern for target {}; skipping cell {}",
                device.name, target, cell.id
            );
            return Ok(());
        };
        for synapse in &device.config.synapses {
            backend.stimulate(cell.id, section, synapse, pattern, 1.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn trains_stay_inside_the_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let train = poisson_train(0.2, 100.0, 50.0, &mut rng);
        assert!(!train.is_empty());
        for &t in &train {
            assert!(t >= 50.0 && t < 150.0);
        }
        for pair in train.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn mean_rate_tracks_the_frequency() {
        let mut rng = StdRng::seed_from_u64(21);
        // 1 spike/ms over 10_000 ms: expect roughly 10_000 events.
        let train = poisson_train(1.0, 10_000.0, 0.0, &mut rng);
        let n = train.len() as f64;
        assert!((9_000.0..11_000.0).contains(&n), "got {n} events");
    }
}
