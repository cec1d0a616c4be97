// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Phase sequencing.
//!
//! Preparation is a sequence of named phases, each closed by a
//! health-checked barrier: no worker proceeds past a phase boundary until
//! every peer has finished it, so nobody reads partially built
//! cross-worker state. The barrier also carries the local phase outcome:
//! one worker failing a phase aborts every peer at the boundary instead of
//! leaving them blocked on collectives that will never complete.

use std::time::Instant;

use tracing::{debug, error, info};

use crate::cluster::Communicator;
use crate::error::EngineResult;

/// Runs named phases with timing reports and a trailing health-checked
/// barrier.
pub struct PhaseRunner<'a> {
    comm: &'a dyn Communicator,
}

impl<'a> PhaseRunner<'a> {
    pub fn new(comm: &'a dyn Communicator) -> Self {
        Self { comm }
    }

    /// Run one phase and synchronize at its boundary.
    ///
    /// The local result takes precedence over a peer abort so the worker
    /// that actually failed reports its own error.
    pub fn run<T>(&self, name: &str, f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        let rank = self.comm.rank();
        debug!("[PHASE] {} starting on worker {}", name, rank);
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => info!("[PHASE] {} on worker {} took {:.2?}", name, rank, elapsed),
            Err(e) => error!("[PHASE] {} failed on worker {}: {}", name, rank, e),
        }

        let barrier = self.comm.checked_barrier(result.is_ok());
        match result {
            Err(e) => Err(e),
            Ok(value) => {
                barrier?;
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::LocalCluster;
    use crate::error::EngineError;

    #[test]
    fn successful_phases_pass_their_value_through() {
        let results = LocalCluster::run(2, |comm| {
            let phases = PhaseRunner::new(&comm);
            phases.run("counting", || Ok(comm.rank() * 10))
        });
        assert_eq!(results[0].as_ref().unwrap(), &0);
        assert_eq!(results[1].as_ref().unwrap(), &10);
    }

    #[test]
    fn one_failing_worker_aborts_the_phase_everywhere() {
        let results = LocalCluster::run(3, |comm| {
            let phases = PhaseRunner::new(&comm);
            phases.run("doomed", || {
                if comm.rank() == 2 {
                    Err(EngineError::Backend("boom".into()))
                } else {
                    Ok(())
                }
            })
        });
        // The failing worker keeps its own error; peers see the abort.
        assert!(matches!(results[2], Err(EngineError::Backend(_))));
        assert!(matches!(results[0], Err(EngineError::Cluster(_))));
        assert!(matches!(results[1], Err(EngineError::Cluster(_))));
    }
}
