// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed identifiers used across the simulation layer.
//!
//! All three are thin newtypes over integers so that a cell ID can never be
//! confused with a transmitter GID or a morphology section index at a call
//! site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Global cell identifier, unique and stable for the duration of a run.
///
/// Ownership is derived from the ID: under the round-robin partition a cell
/// belongs to worker `id % nhost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u64);

/// Index of a morphological section (compartment) within a cell's ordered
/// section list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u32);

/// Globally unique transmitter identifier.
///
/// Assigned from a single monotonically increasing counter shared by every
/// connection model, so GIDs never collide across models and are never
/// reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CellId {
    fn from(id: u64) -> Self {
        CellId(id)
    }
}

impl From<u32> for SectionId {
    fn from(id: u32) -> Self {
        SectionId(id)
    }
}
