// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The integration-engine seam.
//!
//! Numerical integration is an external collaborator (a compartmental
//! neuron simulator); the engine drives it through [`NeuronBackend`]:
//! global clock setup, transmitter/receiver creation, stimulation,
//! recording and time advancement. [`RecordingBackend`] captures every
//! call and synthesizes signal buffers, standing in for the real engine in
//! the test suites.

use ahash::AHashMap;
use neuroscaffold_structures::{CellId, Gid, Recorder, SectionId};

use crate::error::EngineResult;

/// Handle to a signal buffer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandle(pub usize);

/// Operations the engine needs from the numerical integration engine.
pub trait NeuronBackend: Send {
    fn set_resolution(&mut self, dt: f64);
    fn set_temperature(&mut self, celsius: f64);
    fn set_duration(&mut self, tstop: f64);

    /// Set every membrane potential to `voltage` before the first step.
    fn initialize(&mut self, voltage: f64);

    /// Advance the shared virtual clock to `time` (ms).
    fn advance_to(&mut self, time: f64) -> EngineResult<()>;

    /// Materialize the sending half of a spike channel at a compartment.
    fn create_transmitter(&mut self, cell: CellId, section: SectionId, gid: Gid)
        -> EngineResult<()>;

    /// Materialize the receiving half: a synapse bound to a transmitter GID.
    fn create_receiver(
        &mut self,
        cell: CellId,
        section: SectionId,
        gid: Gid,
        synapse: &str,
    ) -> EngineResult<()>;

    /// Drive a synapse at a compartment with an explicit spike-time pattern.
    fn stimulate(
        &mut self,
        cell: CellId,
        section: SectionId,
        synapse: &str,
        pattern: &[f64],
        weight: f64,
    ) -> EngineResult<()>;

    /// Inject a square current pulse at a compartment.
    fn inject_current(
        &mut self,
        cell: CellId,
        section: SectionId,
        amplitude: f64,
        delay: f64,
        duration: f64,
    ) -> EngineResult<()>;

    /// Record the membrane potential at a compartment.
    fn record_voltage(&mut self, cell: CellId, section: SectionId) -> SignalHandle;

    /// Record spike times of a cell.
    fn record_spikes(&mut self, cell: CellId) -> SignalHandle;

    /// Drain a recorded buffer: `(values, optional explicit times)`.
    /// Called exactly once per handle, after the simulation finishes.
    fn take_signal(&mut self, handle: SignalHandle) -> (Vec<f64>, Option<Vec<f64>>);
}

/// What a recorded signal means, which decides how its buffers map onto
/// the persisted (time, value) columns.
#[derive(Debug, Clone, Copy)]
pub enum RecorderKind {
    /// Values are samples, times are the engine's time buffer (or a
    /// resolution ramp when absent).
    Voltage,
    /// The buffer holds spike times; the persisted value column is the
    /// cell ID repeated per spike so rasters can be grouped by cell.
    Spikes { cell: CellId },
}

/// A registered recorder waiting for collection.
#[derive(Debug)]
pub struct RecorderBinding {
    pub group: String,
    pub tag: String,
    pub meta: AHashMap<String, String>,
    pub signal: SignalHandle,
    pub kind: RecorderKind,
}

impl RecorderBinding {
    /// Drain the backend buffer into a persistable [`Recorder`].
    pub fn into_recorder(self, backend: &mut dyn NeuronBackend) -> Recorder {
        let (values, times) = backend.take_signal(self.signal);
        let mut recorder = match self.kind {
            RecorderKind::Voltage => {
                let mut r = Recorder::new(self.group, self.tag, values);
                if let Some(times) = times {
                    r = r.with_times(times);
                }
                r
            }
            RecorderKind::Spikes { cell } => {
                let spike_times = values;
                let ids = vec![cell.0 as f64; spike_times.len()];
                Recorder::new(self.group, self.tag, ids).with_times(spike_times)
            }
        };
        recorder.meta = self.meta;
        recorder
    }
}

/// Call-capturing backend used by the test suites.
///
/// Signals are synthesized: voltage buffers hold one sample per advance at
/// the initialization voltage, spike buffers hold one spike per advance.
#[derive(Default)]
pub struct RecordingBackend {
    pub resolution: f64,
    pub temperature: f64,
    pub duration: f64,
    pub initial_voltage: f64,
    pub advances: Vec<f64>,
    pub transmitters: Vec<(CellId, SectionId, Gid)>,
    pub receivers: Vec<(CellId, SectionId, Gid, String)>,
    pub stimuli: Vec<(CellId, SectionId, String, Vec<f64>, f64)>,
    pub clamps: Vec<(CellId, SectionId, f64, f64, f64)>,
    signals: Vec<SignalKind>,
    advance_hook: Option<Box<dyn FnMut(f64) + Send>>,
    fail_transmitters: bool,
}

enum SignalKind {
    Voltage,
    Spikes,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` after every clock advance (used to raise the interrupt
    /// marker mid-run in tests).
    pub fn with_advance_hook(mut self, hook: impl FnMut(f64) + Send + 'static) -> Self {
        self.advance_hook = Some(Box::new(hook));
        self
    }

    /// Make every `create_transmitter` call fail, for abort-path tests.
    pub fn with_failing_transmitters(mut self) -> Self {
        self.fail_transmitters = true;
        self
    }
}

impl NeuronBackend for RecordingBackend {
    fn set_resolution(&mut self, dt: f64) {
        self.resolution = dt;
    }

    fn set_temperature(&mut self, celsius: f64) {
        self.temperature = celsius;
    }

    fn set_duration(&mut self, tstop: f64) {
        self.duration = tstop;
    }

    fn initialize(&mut self, voltage: f64) {
        self.initial_voltage = voltage;
    }

    fn advance_to(&mut self, time: f64) -> EngineResult<()> {
        self.advances.push(time);
        if let Some(hook) = self.advance_hook.as_mut() {
            hook(time);
        }
        Ok(())
    }

    fn create_transmitter(
        &mut self,
        cell: CellId,
        section: SectionId,
        gid: Gid,
    ) -> EngineResult<()> {
        if self.fail_transmitters {
            return Err(crate::error::EngineError::Backend(format!(
                "transmitter rejected for cell {cell}"
            )));
        }
        self.transmitters.push((cell, section, gid));
        Ok(())
    }

    fn create_receiver(
        &mut self,
        cell: CellId,
        section: SectionId,
        gid: Gid,
        synapse: &str,
    ) -> EngineResult<()> {
        self.receivers.push((cell, section, gid, synapse.to_string()));
        Ok(())
    }

    fn stimulate(
        &mut self,
        cell: CellId,
        section: SectionId,
        synapse: &str,
        pattern: &[f64],
        weight: f64,
    ) -> EngineResult<()> {
        self.stimuli
            .push((cell, section, synapse.to_string(), pattern.to_vec(), weight));
        Ok(())
    }

    fn inject_current(
        &mut self,
        cell: CellId,
        section: SectionId,
        amplitude: f64,
        delay: f64,
        duration: f64,
    ) -> EngineResult<()> {
        self.clamps.push((cell, section, amplitude, delay, duration));
        Ok(())
    }

    fn record_voltage(&mut self, _cell: CellId, _section: SectionId) -> SignalHandle {
        self.signals.push(SignalKind::Voltage);
        SignalHandle(self.signals.len() - 1)
    }

    fn record_spikes(&mut self, _cell: CellId) -> SignalHandle {
        self.signals.push(SignalKind::Spikes);
        SignalHandle(self.signals.len() - 1)
    }

    fn take_signal(&mut self, handle: SignalHandle) -> (Vec<f64>, Option<Vec<f64>>) {
        match self.signals[handle.0] {
            SignalKind::Voltage => {
                let values = vec![self.initial_voltage; self.advances.len()];
                (values, Some(self.advances.clone()))
            }
            SignalKind::Spikes => (self.advances.clone(), None),
        }
    }
}
