// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Square-pulse current injection.

use neuroscaffold_structures::{CellId, SectionId};

use crate::backend::{NeuronBackend, RecorderBinding};
use crate::cells::CellInstance;
use crate::devices::{DeviceBehavior, DeviceState};
use crate::error::EngineResult;

/// Injects a square current pulse at every resolved location.
pub struct CurrentClamp;

impl DeviceBehavior for CurrentClamp {
    fn implement(
        &self,
        device: &DeviceState,
        _target: CellId,
        cell: &CellInstance,
        section: SectionId,
        backend: &mut dyn NeuronBackend,
        _recorders: &mut Vec<RecorderBinding>,
    ) -> EngineResult<()> {
        // Presence of `amplitude` was checked at config validation; the
        // pulse window defaults to the whole run.
        let amplitude = device.config.parameters["amplitude"];
        let delay = device
            .config
            .parameters
            .get("delay")
            .copied()
            .unwrap_or(0.0);
        let duration = device
            .config
            .parameters
            .get("duration")
            .copied()
            .unwrap_or(f64::INFINITY);
        backend.inject_current(cell.id, section, amplitude, delay, duration)
    }
}
