// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Recording devices: spike rasters and membrane voltages.

use ahash::AHashMap;
use neuroscaffold_structures::{CellId, SectionId};

use crate::backend::{NeuronBackend, RecorderBinding, RecorderKind};
use crate::cells::CellInstance;
use crate::devices::{DeviceBehavior, DeviceState};
use crate::error::EngineResult;

/// Records spike times of every resolved target cell.
pub struct SpikeRecorder;

/// Records the membrane potential at every resolved location.
pub struct VoltageRecorder;

fn device_meta(device: &DeviceState, cell: &CellInstance) -> AHashMap<String, String> {
    let mut meta = AHashMap::new();
    meta.insert("label".to_string(), cell.model.clone());
    meta.insert("device".to_string(), device.config.device.to_string());
    meta
}

impl DeviceBehavior for SpikeRecorder {
    fn implement(
        &self,
        device: &DeviceState,
        _target: CellId,
        cell: &CellInstance,
        _section: SectionId,
        backend: &mut dyn NeuronBackend,
        recorders: &mut Vec<RecorderBinding>,
    ) -> EngineResult<()> {
        let signal = backend.record_spikes(cell.id);
        recorders.push(RecorderBinding {
            group: device.name.clone(),
            tag: cell.id.to_string(),
            meta: device_meta(device, cell),
            signal,
            kind: RecorderKind::Spikes { cell: cell.id },
        });
        Ok(())
    }
}

impl DeviceBehavior for VoltageRecorder {
    fn implement(
        &self,
        device: &DeviceState,
        _target: CellId,
        cell: &CellInstance,
        section: SectionId,
        backend: &mut dyn NeuronBackend,
        recorders: &mut Vec<RecorderBinding>,
    ) -> EngineResult<()> {
        let signal = backend.record_voltage(cell.id, section);
        recorders.push(RecorderBinding {
            group: device.name.clone(),
            tag: cell.id.to_string(),
            meta: device_meta(device, cell),
            signal,
            kind: RecorderKind::Voltage,
        });
        Ok(())
    }
}
