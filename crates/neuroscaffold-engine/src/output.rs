// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persisted signal output.
//!
//! Recorded signals are written as 2-column (time, value) datasets under
//! `recorders/<group>/<tag>`. Appending to an existing path stacks the new
//! rows below the old ones, so a re-run with the same tags accumulates data
//! instead of overwriting it. The actual resource format stays behind
//! [`SignalArchive`]; [`MemoryArchive`] backs the multi-worker test
//! suites and [`JsonArchive`] backs single-host runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ahash::AHashMap;
use ndarray::{concatenate, Array2, Axis};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ArchiveError;

/// Append-only storage for recorded datasets.
///
/// `append` is called by one worker at a time (the collection loop is
/// barrier-serialized), but implementations still guard their state so the
/// trait object can be shared across worker threads.
pub trait SignalArchive: Send + Sync {
    /// Append `data` under `path`, vertically stacking onto any existing
    /// dataset, and merge `attrs` into the dataset attributes.
    fn append(
        &self,
        path: &str,
        data: Array2<f64>,
        attrs: &AHashMap<String, String>,
    ) -> Result<(), ArchiveError>;

    /// Read a dataset back, when it exists.
    fn read(&self, path: &str) -> Option<Array2<f64>>;
}

fn stack(
    path: &str,
    existing: Array2<f64>,
    new: Array2<f64>,
) -> Result<Array2<f64>, ArchiveError> {
    if existing.ncols() != new.ncols() {
        return Err(ArchiveError::ShapeMismatch {
            path: path.to_string(),
            existing: existing.ncols(),
            new: new.ncols(),
        });
    }
    concatenate(Axis(0), &[existing.view(), new.view()]).map_err(|e| {
        ArchiveError::Codec(format!("failed to stack dataset '{path}': {e}"))
    })
}

/// In-memory archive.
#[derive(Default)]
pub struct MemoryArchive {
    datasets: Mutex<AHashMap<String, (Array2<f64>, AHashMap<String, String>)>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes stored for a dataset.
    pub fn attrs(&self, path: &str) -> Option<AHashMap<String, String>> {
        self.datasets.lock().get(path).map(|(_, a)| a.clone())
    }

    /// All stored dataset paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.datasets.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl SignalArchive for MemoryArchive {
    fn append(
        &self,
        path: &str,
        data: Array2<f64>,
        attrs: &AHashMap<String, String>,
    ) -> Result<(), ArchiveError> {
        let mut datasets = self.datasets.lock();
        let merged = match datasets.remove(path) {
            Some((existing, mut existing_attrs)) => {
                let stacked = stack(path, existing, data)?;
                existing_attrs.extend(attrs.clone());
                (stacked, existing_attrs)
            }
            None => (data, attrs.clone()),
        };
        debug!("[OUTPUT] '{}' now holds {} rows", path, merged.0.nrows());
        datasets.insert(path.to_string(), merged);
        Ok(())
    }

    fn read(&self, path: &str) -> Option<Array2<f64>> {
        self.datasets.lock().get(path).map(|(d, _)| d.clone())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArchiveFile {
    datasets: BTreeMap<String, StoredDataset>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDataset {
    rows: Vec<Vec<f64>>,
    attrs: BTreeMap<String, String>,
}

/// File-backed JSON archive for single-host runs.
///
/// Collection writes are infrequent (once per run per worker) so each
/// append re-reads and rewrites the whole file; simplicity over
/// throughput.
pub struct JsonArchive {
    file: PathBuf,
    lock: Mutex<()>,
}

impl JsonArchive {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<ArchiveFile, ArchiveError> {
        if !self.file.exists() {
            return Ok(ArchiveFile::default());
        }
        let content = std::fs::read_to_string(&self.file).map_err(|e| ArchiveError::Io {
            path: self.file.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ArchiveError::Codec(e.to_string()))
    }

    fn save(&self, archive: &ArchiveFile) -> Result<(), ArchiveError> {
        let content =
            serde_json::to_string(archive).map_err(|e| ArchiveError::Codec(e.to_string()))?;
        std::fs::write(&self.file, content).map_err(|e| ArchiveError::Io {
            path: self.file.display().to_string(),
            source: e,
        })
    }
}

impl SignalArchive for JsonArchive {
    fn append(
        &self,
        path: &str,
        data: Array2<f64>,
        attrs: &AHashMap<String, String>,
    ) -> Result<(), ArchiveError> {
        let _guard = self.lock.lock();
        let mut archive = self.load()?;
        let dataset = archive.datasets.entry(path.to_string()).or_default();
        if let Some(first) = dataset.rows.first() {
            if first.len() != data.ncols() {
                return Err(ArchiveError::ShapeMismatch {
                    path: path.to_string(),
                    existing: first.len(),
                    new: data.ncols(),
                });
            }
        }
        for row in data.outer_iter() {
            dataset.rows.push(row.to_vec());
        }
        for (k, v) in attrs {
            dataset.attrs.insert(k.clone(), v.clone());
        }
        self.save(&archive)
    }

    fn read(&self, path: &str) -> Option<Array2<f64>> {
        let _guard = self.lock.lock();
        let archive = self.load().ok()?;
        let dataset = archive.datasets.get(path)?;
        let ncols = dataset.rows.first()?.len();
        let mut data = Array2::zeros((dataset.rows.len(), ncols));
        for (i, row) in dataset.rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                data[[i, j]] = *value;
            }
        }
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use neuroscaffold_structures::Recorder;

    #[test]
    fn appending_stacks_rows_vertically() {
        let archive = MemoryArchive::new();
        let attrs = AHashMap::new();
        archive
            .append("recorders/g/1", array![[0.0, -65.0], [1.0, -64.0]], &attrs)
            .unwrap();
        archive
            .append("recorders/g/1", array![[0.0, -65.0]], &attrs)
            .unwrap();

        let data = archive.read("recorders/g/1").unwrap();
        assert_eq!(data.nrows(), 3);
        assert_eq!(data.ncols(), 2);
    }

    #[test]
    fn two_runs_sum_their_row_counts_after_trimming() {
        // First run: 3 values against 5 times (trimmed to 3 rows).
        // Second run: 4 values against 4 times.
        let archive = MemoryArchive::new();
        let first = Recorder::new("g", "7", vec![1.0, 2.0, 3.0])
            .with_times(vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        let second =
            Recorder::new("g", "7", vec![4.0, 5.0, 6.0, 7.0]).with_times(vec![0.0, 0.1, 0.2, 0.3]);

        archive
            .append(&first.path(), first.column_data(0.1), &first.meta)
            .unwrap();
        archive
            .append(&second.path(), second.column_data(0.1), &second.meta)
            .unwrap();

        let data = archive.read("recorders/g/7").unwrap();
        assert_eq!(data.nrows(), 3 + 4);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let archive = MemoryArchive::new();
        let attrs = AHashMap::new();
        archive
            .append("recorders/g/1", array![[0.0, 1.0]], &attrs)
            .unwrap();
        let result = archive.append("recorders/g/1", array![[0.0, 1.0, 2.0]], &attrs);
        assert!(matches!(result, Err(ArchiveError::ShapeMismatch { .. })));
    }

    #[test]
    fn attrs_are_merged_across_appends() {
        let archive = MemoryArchive::new();
        let mut attrs = AHashMap::new();
        attrs.insert("label".to_string(), "granule".to_string());
        archive
            .append("recorders/g/1", array![[0.0, 1.0]], &attrs)
            .unwrap();
        attrs.insert("color".to_string(), "#e62314".to_string());
        archive
            .append("recorders/g/1", array![[1.0, 2.0]], &attrs)
            .unwrap();

        let stored = archive.attrs("recorders/g/1").unwrap();
        assert_eq!(stored.get("label").unwrap(), "granule");
        assert_eq!(stored.get("color").unwrap(), "#e62314");
    }

    #[test]
    fn json_archive_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = JsonArchive::new(dir.path().join("results.json"));
        let mut attrs = AHashMap::new();
        attrs.insert("label".to_string(), "basket".to_string());

        archive
            .append("recorders/g/2", array![[0.0, -65.0]], &attrs)
            .unwrap();
        archive
            .append("recorders/g/2", array![[1.0, -63.5]], &attrs)
            .unwrap();

        let data = archive.read("recorders/g/2").unwrap();
        assert_eq!(data.nrows(), 2);
        assert_eq!(data[[1, 1]], -63.5);
    }
}
