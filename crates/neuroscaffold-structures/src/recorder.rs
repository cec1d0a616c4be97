// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Recorder buffers collected from a finished simulation.

use ahash::AHashMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One recorded signal: a value sequence, an optional explicit time
/// sequence, and free-form metadata attached to the persisted dataset.
///
/// Recorders are appended to a process-local list during preparation and
/// flushed to the signal archive exactly once, after the simulation loop
/// finishes. The dataset path is `recorders/<group>/<tag>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    pub group: String,
    pub tag: String,
    pub values: Vec<f64>,
    /// Explicit sample times. When absent, times are reconstructed from the
    /// simulation resolution at collection.
    pub times: Option<Vec<f64>>,
    pub meta: AHashMap<String, String>,
}

impl Recorder {
    pub fn new(group: impl Into<String>, tag: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            group: group.into(),
            tag: tag.into(),
            values,
            times: None,
            meta: AHashMap::new(),
        }
    }

    pub fn with_times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Dataset path under which this recorder is persisted.
    pub fn path(&self) -> String {
        format!("recorders/{}/{}", self.group, self.tag)
    }

    /// Build the 2-column (time, value) array for persistence.
    ///
    /// Time and value buffers are recorded independently by the integration
    /// engine and can disagree in length by a sample; both columns are
    /// trimmed to the shorter of the two. Missing times fall back to a ramp
    /// of `resolution` steps.
    pub fn column_data(&self, resolution: f64) -> Array2<f64> {
        let times: Vec<f64> = match &self.times {
            Some(t) => t.clone(),
            None => (0..self.values.len())
                .map(|i| i as f64 * resolution)
                .collect(),
        };
        let rows = times.len().min(self.values.len());
        let mut data = Array2::zeros((rows, 2));
        for i in 0..rows {
            data[[i, 0]] = times[i];
            data[[i, 1]] = self.values[i];
        }
        data
    }
}
