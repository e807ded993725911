// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partitioning physical cores into disjoint per-worker blocks.

use crate::{CpuTopology, TopologyError};

/// Disjoint, equally sized logical-core blocks, one per worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Schedule {
    assignments: Vec<Vec<usize>>,
    cores_per_worker: usize,
}

impl Schedule {
    pub fn num_workers(&self) -> usize {
        self.assignments.len()
    }

    pub fn cores_per_worker(&self) -> usize {
        self.cores_per_worker
    }

    /// Per-worker logical core ids, in worker order.
    pub fn assignments(&self) -> &[Vec<usize>] {
        &self.assignments
    }

    /// Cores assigned to worker `index`.
    pub fn worker(&self, index: usize) -> Option<&[usize]> {
        self.assignments.get(index).map(Vec::as_slice)
    }

    /// Returns `true` when no worker received any core.
    pub fn is_empty(&self) -> bool {
        self.assignments.first().map_or(true, Vec::is_empty)
    }

    /// Every scheduled core, worker by worker.
    pub fn all_cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.assignments.iter().flatten().copied()
    }
}

/// Splits the topology's usable physical cores into `num_workers` blocks.
///
/// Each physical core in the restricting set is represented by its first
/// logical id; physical cores are taken in ascending id order and handed out
/// in contiguous runs of `cores_per_worker` (default `P / num_workers`).
///
/// # Errors
/// - [`TopologyError::InvalidRequest`] when `num_workers` is zero.
/// - [`TopologyError::OverAllocation`] when
///   `num_workers * cores_per_worker` exceeds the usable physical cores.
///
/// # Examples
/// ```
/// use cpu_topology::{schedule_workers, CpuTopology};
/// let topo = CpuTopology::from_entries((0..4).map(|i| (i, i, 0)));
/// let s = schedule_workers(&topo, 2, None).unwrap();
/// assert_eq!(s.assignments(), &[vec![0, 1], vec![2, 3]]);
/// ```
pub fn schedule_workers(
    topology: &CpuTopology,
    num_workers: usize,
    cores_per_worker: Option<usize>,
) -> Result<Schedule, TopologyError> {
    if num_workers == 0 {
        return Err(TopologyError::InvalidRequest(
            "num_workers must be at least 1".to_string(),
        ));
    }

    let cores = topology.usable_physical_cores();
    let available = cores.len();
    let cores_per_worker = cores_per_worker.unwrap_or(available / num_workers);

    let requested = cores_per_worker.checked_mul(num_workers).ok_or_else(|| {
        TopologyError::InvalidRequest(format!(
            "{num_workers} workers × {cores_per_worker} cores overflows"
        ))
    })?;
    if requested > available {
        return Err(TopologyError::OverAllocation {
            num_workers,
            cores_per_worker,
            requested,
            available,
        });
    }

    let assignments: Vec<Vec<usize>> = (0..num_workers)
        .map(|i| cores[i * cores_per_worker..(i + 1) * cores_per_worker].to_vec())
        .collect();

    tracing::debug!(
        "scheduled {num_workers} workers × {cores_per_worker} cores: {assignments:?}"
    );
    Ok(Schedule {
        assignments,
        cores_per_worker,
    })
}

/// Discovers the host topology once and schedules against it.
#[derive(Debug, Clone)]
pub struct Scheduler {
    topology: CpuTopology,
}

impl Scheduler {
    pub fn new(topology: CpuTopology) -> Self {
        Self { topology }
    }

    /// Builds a scheduler over the running host's topology.
    pub fn discover() -> Result<Self, TopologyError> {
        Ok(Self::new(CpuTopology::discover()?))
    }

    pub fn topology(&self) -> &CpuTopology {
        &self.topology
    }

    pub fn schedule(
        &self,
        num_workers: usize,
        cores_per_worker: Option<usize>,
    ) -> Result<Schedule, TopologyError> {
        schedule_workers(&self.topology, num_workers, cores_per_worker)
    }
}
