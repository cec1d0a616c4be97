// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cluster communication for SPMD workers.
//!
//! Every worker runs the same program over its own partition of the cell
//! population; coordination happens only at explicit collective calls:
//!
//! - [`Communicator::checked_barrier`]: wait for all peers, carrying a
//!   local health flag. If any worker arrives unhealthy the whole
//!   generation is poisoned and every participant returns
//!   [`ClusterError::PeerAborted`] instead of blocking on peers that will
//!   never come. Once poisoned, all subsequent collective calls fail
//!   immediately; a fatal error anywhere tears down the whole run.
//! - [`Communicator::broadcast_bytes`]: root publishes a payload, every
//!   worker (root included) returns it.
//!
//! The in-process [`LocalCluster`] implementation runs workers as threads
//! and backs both calls with a generation-counted barrier. An MPI-style
//! transport stays behind the same trait.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{ClusterError, EngineError, EngineResult};

/// Collective communication between the workers of one simulation run.
pub trait Communicator: Send + Sync {
    /// This worker's rank, `0..nhost`.
    fn rank(&self) -> usize;

    /// Total number of workers.
    fn nhost(&self) -> usize;

    /// Block until every worker arrives, reporting local health.
    ///
    /// Returns an error if any participant (this worker included) arrived
    /// unhealthy, or if a previous collective call already failed.
    fn checked_barrier(&self, healthy: bool) -> Result<(), ClusterError>;

    /// Broadcast raw bytes from `root` to every worker.
    ///
    /// `payload` must be `Some` on the root and is ignored elsewhere.
    fn broadcast_bytes(
        &self,
        root: usize,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ClusterError>;

    /// Plain barrier with no local failure to report.
    fn barrier(&self) -> Result<(), ClusterError> {
        self.checked_barrier(true)
    }
}

/// Broadcast a serde value from `root` to every worker.
pub fn broadcast_value<T>(
    comm: &dyn Communicator,
    root: usize,
    value: Option<&T>,
) -> Result<T, ClusterError>
where
    T: Serialize + DeserializeOwned,
{
    let payload = match value {
        Some(v) => Some(serde_json::to_vec(v).map_err(|e| ClusterError::Codec(e.to_string()))?),
        None => None,
    };
    let bytes = comm.broadcast_bytes(root, payload)?;
    serde_json::from_slice(&bytes).map_err(|e| ClusterError::Codec(e.to_string()))
}

/// Broadcast the result of a root-only computation.
///
/// The root passes `Some(result)`; peers pass `None`. When the root
/// computation failed, the failure is propagated to every peer through the
/// poisoned barrier instead of stranding them inside the broadcast.
pub fn broadcast_result<T>(
    comm: &dyn Communicator,
    root: usize,
    value: Option<EngineResult<T>>,
) -> EngineResult<T>
where
    T: Serialize + DeserializeOwned,
{
    if comm.rank() == root {
        match value {
            Some(Ok(v)) => {
                let out = broadcast_value(comm, root, Some(&v))?;
                Ok(out)
            }
            Some(Err(e)) => {
                error!("[CLUSTER] Broadcast root {} failed: {}", root, e);
                let _ = comm.checked_barrier(false);
                Err(e)
            }
            None => {
                let _ = comm.checked_barrier(false);
                Err(ClusterError::MissingPayload { root }.into())
            }
        }
    } else {
        broadcast_value::<T>(comm, root, None).map_err(EngineError::from)
    }
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    poisoned: bool,
}

struct ClusterShared {
    size: usize,
    barrier: Mutex<BarrierState>,
    condvar: Condvar,
    slot: Mutex<Option<Vec<u8>>>,
}

/// In-process cluster: one worker per thread, shared-memory collectives.
///
/// Used by the test suites and by single-host multi-worker runs.
#[derive(Clone)]
pub struct LocalCluster {
    rank: usize,
    shared: Arc<ClusterShared>,
}

impl LocalCluster {
    /// Create communicator handles for `size` workers.
    pub fn new(size: usize) -> Vec<LocalCluster> {
        assert!(size > 0, "a cluster needs at least one worker");
        let shared = Arc::new(ClusterShared {
            size,
            barrier: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                poisoned: false,
            }),
            condvar: Condvar::new(),
            slot: Mutex::new(None),
        });
        (0..size)
            .map(|rank| LocalCluster {
                rank,
                shared: shared.clone(),
            })
            .collect()
    }

    /// Run the same closure on `size` worker threads and collect the
    /// per-rank results in rank order.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(LocalCluster) -> T + Send + Sync,
    {
        let handles = LocalCluster::new(size);
        std::thread::scope(|scope| {
            let mut joins = Vec::with_capacity(size);
            for comm in handles {
                let f = &f;
                joins.push(scope.spawn(move || f(comm)));
            }
            joins
                .into_iter()
                .map(|j| j.join().expect("worker thread panicked"))
                .collect()
        })
    }
}

impl Communicator for LocalCluster {
    fn rank(&self) -> usize {
        self.rank
    }

    fn nhost(&self) -> usize {
        self.shared.size
    }

    fn checked_barrier(&self, healthy: bool) -> Result<(), ClusterError> {
        let shared = &self.shared;
        let mut state = shared.barrier.lock();

        if !healthy && !state.poisoned {
            debug!("[CLUSTER] Worker {} poisons the barrier", self.rank);
            state.poisoned = true;
            shared.condvar.notify_all();
        }
        if state.poisoned {
            return Err(ClusterError::PeerAborted);
        }

        state.arrived += 1;
        if state.arrived == shared.size {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            shared.condvar.notify_all();
            Ok(())
        } else {
            let generation = state.generation;
            while state.generation == generation && !state.poisoned {
                shared.condvar.wait(&mut state);
            }
            if state.poisoned {
                // This arrival never completed; keep the count consistent
                // for any worker still spinning on collectives.
                state.arrived = state.arrived.saturating_sub(1);
                Err(ClusterError::PeerAborted)
            } else {
                Ok(())
            }
        }
    }

    fn broadcast_bytes(
        &self,
        root: usize,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ClusterError> {
        if self.rank == root {
            match payload {
                Some(bytes) => *self.shared.slot.lock() = Some(bytes),
                None => {
                    // A root with nothing to publish must still release its
                    // peers from the barrier below.
                    let _ = self.checked_barrier(false);
                    return Err(ClusterError::MissingPayload { root });
                }
            }
        }
        // Publish, read, then release the slot for the next broadcast.
        self.checked_barrier(true)?;
        let value = self
            .shared
            .slot
            .lock()
            .clone()
            .ok_or(ClusterError::MissingPayload { root })?;
        self.checked_barrier(true)?;
        if self.rank == root {
            *self.shared.slot.lock() = None;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn barrier_synchronizes_all_workers() {
        let counter = AtomicUsize::new(0);
        let results = LocalCluster::run(4, |comm| {
            counter.fetch_add(1, Ordering::SeqCst);
            comm.barrier().unwrap();
            // Every worker must observe all arrivals after the barrier.
            counter.load(Ordering::SeqCst)
        });
        assert_eq!(results, vec![4, 4, 4, 4]);
    }

    #[test]
    fn broadcast_reaches_every_worker() {
        let results = LocalCluster::run(3, |comm| {
            let value = if comm.rank() == 0 {
                Some(vec![1u64, 2, 3])
            } else {
                None
            };
            broadcast_value(&comm, 0, value.as_ref()).unwrap()
        });
        for value in results {
            assert_eq!(value, vec![1, 2, 3]);
        }
    }

    #[test]
    fn unhealthy_worker_aborts_every_peer() {
        let results = LocalCluster::run(3, |comm| comm.checked_barrier(comm.rank() != 1));
        for result in results {
            assert!(matches!(result, Err(ClusterError::PeerAborted)));
        }
    }

    #[test]
    fn poisoned_cluster_fails_fast_afterwards() {
        let results = LocalCluster::run(2, |comm| {
            let _ = comm.checked_barrier(comm.rank() != 0);
            // Any later collective must fail immediately instead of waiting.
            comm.barrier()
        });
        for result in results {
            assert!(matches!(result, Err(ClusterError::PeerAborted)));
        }
    }

    #[test]
    fn misaligned_collectives_do_not_deadlock_after_failure() {
        // Worker 0 fails before the broadcast; worker 1 is already inside
        // it. The poisoned barrier must release worker 1 with an error.
        let results = LocalCluster::run(2, |comm| -> EngineResult<Vec<u8>> {
            if comm.rank() == 0 {
                comm.checked_barrier(false)?;
                unreachable!("poisoned barrier returns an error");
            } else {
                let bytes = comm.broadcast_bytes(0, None)?;
                Ok(bytes)
            }
        });
        for result in results {
            assert!(result.is_err());
        }
    }

    #[test]
    fn single_worker_cluster_is_trivial() {
        let results = LocalCluster::run(1, |comm| {
            comm.barrier().unwrap();
            broadcast_value(&comm, 0, Some(&42u32)).unwrap()
        });
        assert_eq!(results, vec![42]);
    }
}
