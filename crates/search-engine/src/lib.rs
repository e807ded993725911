// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # search-engine
//!
//! Benchmark-driven search for the fastest way to run a model.
//!
//! Given a model, calibration data and optionally a validation metric, the
//! [`SearchEngine`] tries every candidate acceleration strategy, times each
//! artifact with the bench harness, and returns a [`SearchReport`] from which
//! the best artifact can be picked under latency and accuracy constraints.
//!
//! # Pipeline
//! ```text
//! SearchRequest ──► catalog (default / all / grid) ──► available subset
//!                                                          │
//!      ┌──────────── per strategy, sequentially ───────────┘
//!      ▼
//!  ModelProducer::convert ──► BenchmarkHarness ──► Metric ──► OutcomeRecord
//!                                                                 │
//!                                              SearchReport ◄─────┘
//! ```
//!
//! # Statuses
//! | Status            | Artifact | Latency | Meaning                         |
//! |-------------------|----------|---------|---------------------------------|
//! | `successful`      | yes      | yes     | benchmarked to completion       |
//! | `early stopped`   | yes      | yes     | clearly slower than the model   |
//! | `lack dependency` | no       | no      | a backend is not installed      |
//! | `fail to convert` | no       | no      | the producer returned an error  |
//! | `fail to forward` | no       | no      | the artifact failed to run      |
//!
//! # Example
//! ```no_run
//! use model_core::{LinearModel, SharedModel, Tensor};
//! use search_engine::{SearchEngine, SearchRequest, SelectionCriteria};
//! use std::sync::Arc;
//! use strategy_catalog::FixedProbe;
//! # fn producer() -> Arc<dyn search_engine::ModelProducer> { unimplemented!() }
//!
//! let model: SharedModel = Arc::new(LinearModel::seeded("net", 16, 4, 7));
//! let engine = SearchEngine::new(producer(), Arc::new(FixedProbe::all()));
//! let report = engine
//!     .optimize(&model, SearchRequest::new(Tensor::zeros(vec![8, 16])))
//!     .unwrap();
//! let best = report.best(&SelectionCriteria::default()).unwrap();
//! println!("{}: {:?}", best.name, best.record.latency);
//! ```

mod config;
mod engine;
mod error;
mod metric;
mod outcome;
mod producer;
mod report;

pub use config::{SearchConfig, DEFAULT_LATENCY_SAMPLE_NUM};
pub use engine::{
    SearchEngine, SearchMode, SearchRequest, DEFAULT_CALIBRATION_SAMPLES,
    SLOW_MODEL_CALIBRATION_SAMPLES, SLOW_MODEL_THRESHOLD,
};
pub use error::{ConversionError, MetricError, SearchError};
pub use metric::{Direction, Metric, MetricSignature};
pub use outcome::{Accuracy, OutcomeRecord, Status};
pub use producer::{BackendAdapter, ConversionRequest, ModelProducer};
pub use report::{
    AccuracyCriterion, ReportSummary, SearchReport, Selection, SelectionCriteria, SummaryEntry,
};
