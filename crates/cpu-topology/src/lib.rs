// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cpu-topology
//!
//! Physical-core topology discovery and disjoint per-worker core scheduling.
//!
//! ## Pipeline
//!
//! 1. [`CpuTopology::discover`] maps every logical core to its physical core
//!    and socket (`lscpu`, falling back to sysfs) and reads the cgroup
//!    cpuset that restricts this process.
//! 2. [`schedule_workers`] hands each worker a contiguous block of physical
//!    cores, represented by one logical id each, so hyperthread siblings are
//!    never split across workers.
//! 3. [`AffinityDirective::for_schedule`] turns the schedule into the
//!    environment a worker process is launched with.
//!
//! ## Example
//!
//! ```
//! use cpu_topology::{schedule_workers, AffinityDirective, CpuTopology};
//!
//! // 4 physical cores, each with a hyperthread sibling at +4.
//! let topo = CpuTopology::from_entries((0..8).map(|l| (l, l % 4, 0)));
//! let schedule = schedule_workers(&topo, 2, None).unwrap();
//! assert_eq!(schedule.assignments(), &[vec![0, 1], vec![2, 3]]);
//!
//! let directives = AffinityDirective::for_schedule(&schedule);
//! assert_eq!(directives[1].thread_count, 2);
//! ```

mod affinity;
pub mod cpuset;
mod error;
mod schedule;
mod topology;

pub use affinity::{
    AffinityDirective, AffinityMask, AFFINITY_VAR, THREADS_VAR, WORKER_INDEX_VAR,
};
pub use cpuset::parse_cpu_list;
pub use error::TopologyError;
pub use schedule::{schedule_workers, Schedule, Scheduler};
pub use topology::{parse_lscpu, CpuTopology};
