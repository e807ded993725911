// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # multi-instance
//!
//! Serves one model from several OS processes, each pinned to its own block
//! of physical cores.
//!
//! ```text
//!  coordinator                          worker i (own process)
//!  ───────────                          ──────────────────────
//!  Scheduler → AffinityDirective[i]
//!  spawn(env = KMP_AFFINITY,            run_stdio():
//!        OMP_NUM_THREADS, PROCESS_IDX)    apply directive (threads, pin)
//!  invoke ── WorkerRequest (NDJSON) ──►   serve(): forward
//!         ◄── WorkerResponse ──────────
//!  shutdown ── {"type":"shutdown"} ──►    exit 0
//! ```
//!
//! Workers share no memory with the coordinator or each other. Each worker
//! answers its requests in order.

mod coordinator;
mod error;
mod launch;
pub mod protocol;
pub mod worker;

pub use coordinator::{MultiInstanceCoordinator, SHUTDOWN_GRACE};
pub use error::CoordinatorError;
pub use launch::{LaunchConfig, WorkerLauncher};
pub use protocol::{WorkerRequest, WorkerResponse};
