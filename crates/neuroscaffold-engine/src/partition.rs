// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell-to-worker partitioning.

use neuroscaffold_structures::CellId;

/// Round-robin ownership of the global cell population.
///
/// Worker `r` of `N` owns cell IDs `{r, r+N, r+2N, ...}` below the total.
/// This is a lazy, deterministic strategy, a placeholder for a smarter,
/// load-aware balancer. Any replacement must keep two properties:
///
/// - every cell is owned by exactly one worker, and
/// - every worker can compute its own set (and test any cell's owner)
///   without communicating.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    rank: usize,
    nhost: usize,
    cell_total: u64,
}

impl Partition {
    pub fn new(cell_total: u64, nhost: usize, rank: usize) -> Self {
        debug_assert!(nhost > 0, "partition over zero workers");
        debug_assert!(rank < nhost, "rank {rank} out of range for {nhost} workers");
        Self {
            rank,
            nhost,
            cell_total,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn nhost(&self) -> usize {
        self.nhost
    }

    pub fn cell_total(&self) -> u64 {
        self.cell_total
    }

    /// Does this worker own `cell`?
    pub fn owns(&self, cell: CellId) -> bool {
        cell.0 < self.cell_total && cell.0 % self.nhost as u64 == self.rank as u64
    }

    /// All cell IDs owned by this worker, ascending.
    pub fn owned_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        (self.rank as u64..self.cell_total)
            .step_by(self.nhost)
            .map(CellId)
    }

    /// Number of cells owned by this worker.
    pub fn owned_count(&self) -> u64 {
        if self.cell_total <= self.rank as u64 {
            0
        } else {
            (self.cell_total - self.rank as u64).div_ceil(self.nhost as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn ownership_sets_are_disjoint_and_cover_everything() {
        for &(cell_total, nhost) in &[(0u64, 1usize), (1, 1), (4, 2), (10, 3), (17, 5), (5, 8)] {
            let mut seen: AHashSet<CellId> = AHashSet::new();
            for rank in 0..nhost {
                let partition = Partition::new(cell_total, nhost, rank);
                for cell in partition.owned_cells() {
                    assert!(
                        seen.insert(cell),
                        "cell {cell} owned twice (C={cell_total}, N={nhost})"
                    );
                    assert!(partition.owns(cell));
                }
                assert_eq!(partition.owned_count(), partition.owned_cells().count() as u64);
            }
            assert_eq!(seen.len() as u64, cell_total);
            for id in 0..cell_total {
                assert!(seen.contains(&CellId(id)));
            }
        }
    }

    #[test]
    fn two_workers_four_cells_round_robin() {
        let worker0 = Partition::new(4, 2, 0);
        let worker1 = Partition::new(4, 2, 1);
        assert_eq!(
            worker0.owned_cells().collect::<Vec<_>>(),
            vec![CellId(0), CellId(2)]
        );
        assert_eq!(
            worker1.owned_cells().collect::<Vec<_>>(),
            vec![CellId(1), CellId(3)]
        );
    }

    #[test]
    fn out_of_range_cells_are_owned_by_no_one() {
        let partition = Partition::new(4, 2, 0);
        assert!(!partition.owns(CellId(4)));
        assert!(!partition.owns(CellId(100)));
    }
}
