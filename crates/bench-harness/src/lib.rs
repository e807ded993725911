// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # bench-harness
//!
//! Latency measurement for candidate artifacts.
//!
//! [`BenchmarkHarness::measure`] warms a callable up once, then times it
//! until the sample budget or the wall-clock budget runs out, and reports
//! a trimmed mean. A callable that is already far slower than the baseline
//! after a few samples is abandoned early with `completed = false`.
//!
//! [`ThreadBudget`] holds the ambient thread count that forward passes run
//! with; [`ThreadBudget::acquire`] scopes a change to it.
//!
//! # Example
//! ```
//! use bench_harness::{BenchmarkHarness, ThreadBudget};
//! use std::time::Duration;
//!
//! let budget = ThreadBudget::new(8);
//! let harness = BenchmarkHarness::default();
//! let m = {
//!     let _threads = budget.acquire(2);
//!     harness.measure(|| Ok(()), 20, Duration::from_millis(1)).unwrap()
//! };
//! assert!(m.completed);
//! assert_eq!(budget.current(), 8);
//! ```

mod config;
mod error;
mod harness;
mod stats;
mod threads;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use harness::{time_once, BenchmarkHarness, Measurement};
pub use stats::{ms, LatencyStats};
pub use threads::{ThreadBudget, ThreadGuard};
