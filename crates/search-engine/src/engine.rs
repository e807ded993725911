// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The search loop.
//!
//! ```text
//! validate → narrow catalog → derive + check input sample → baseline
//!   → for each strategy: convert → benchmark → accuracy → record
//!   → SearchReport
//! ```

use crate::config::{SearchConfig, DEFAULT_LATENCY_SAMPLE_NUM};
use crate::outcome::{Accuracy, OutcomeRecord, Status};
use crate::producer::{BackendAdapter, ConversionRequest, ModelProducer};
use crate::report::SearchReport;
use crate::{Direction, Metric, MetricError, SearchError};
use bench_harness::{time_once, BenchmarkHarness, HarnessConfig, ThreadBudget};
use model_core::{DataLoader, InferenceModel, SharedModel, Tensor, TrainingData};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strategy_catalog::{
    available_subset, Accelerator, DependencyProbe, Precision, StrategyCatalog, StrategyFilter,
    DEFAULT_SUBSET, ORIGINAL,
};

/// A model whose baseline forward pass takes longer than this gets a
/// smaller calibration sample.
pub const SLOW_MODEL_THRESHOLD: Duration = Duration::from_millis(100);
/// Calibration samples for slow models.
pub const SLOW_MODEL_CALIBRATION_SAMPLES: usize = 15;
/// Calibration samples otherwise.
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 100;

/// Which catalog a search draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// The curated subset.
    #[default]
    Default,
    /// Every built-in strategy.
    All,
    /// The full catalog narrowed by filters.
    Grid,
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(SearchMode::Default),
            "all" => Ok(SearchMode::All),
            "grid" => Ok(SearchMode::Grid),
            other => Err(SearchError::InputValidation(format!(
                "search mode must be 'default', 'all' or 'grid', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Default => "default",
            SearchMode::All => "all",
            SearchMode::Grid => "grid",
        })
    }
}

/// Arguments of one [`SearchEngine::optimize`] call.
///
/// String-valued options are validated by `optimize`, so they can be filled
/// straight from a CLI or a config file.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub training_data: TrainingData,
    pub validation_data: Option<TrainingData>,
    pub input_sample: Option<Vec<Tensor>>,
    pub metric: Option<Metric>,
    pub direction: String,
    pub thread_num: Option<usize>,
    pub accelerators: Option<Vec<String>>,
    pub precisions: Option<Vec<String>>,
    pub use_ipex: Option<bool>,
    pub search_mode: String,
    pub latency_sample_num: usize,
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(training_data: impl Into<TrainingData>) -> Self {
        Self {
            training_data: training_data.into(),
            validation_data: None,
            input_sample: None,
            metric: None,
            direction: Direction::default().to_string(),
            thread_num: None,
            accelerators: None,
            precisions: None,
            use_ipex: None,
            search_mode: SearchMode::default().to_string(),
            latency_sample_num: DEFAULT_LATENCY_SAMPLE_NUM,
            includes: None,
            excludes: None,
        }
    }

    /// Fills every option from `config`.
    pub fn from_config(training_data: impl Into<TrainingData>, config: &SearchConfig) -> Self {
        Self {
            direction: config.direction.clone(),
            thread_num: config.thread_num,
            accelerators: config.accelerators.clone(),
            precisions: config.precisions.clone(),
            use_ipex: config.use_ipex,
            search_mode: config.search_mode.clone(),
            latency_sample_num: config.latency_sample_num,
            includes: config.includes.clone(),
            excludes: config.excludes.clone(),
            ..Self::new(training_data)
        }
    }

    pub fn validation_data(mut self, data: impl Into<TrainingData>) -> Self {
        self.validation_data = Some(data.into());
        self
    }

    pub fn input_sample(mut self, sample: Vec<Tensor>) -> Self {
        self.input_sample = Some(sample);
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn direction(mut self, direction: &str) -> Self {
        self.direction = direction.to_string();
        self
    }

    pub fn thread_num(mut self, threads: usize) -> Self {
        self.thread_num = Some(threads);
        self
    }

    pub fn accelerators(mut self, names: &[&str]) -> Self {
        self.accelerators = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn precisions(mut self, names: &[&str]) -> Self {
        self.precisions = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn use_ipex(mut self, use_ipex: bool) -> Self {
        self.use_ipex = Some(use_ipex);
        self
    }

    pub fn search_mode(mut self, mode: &str) -> Self {
        self.search_mode = mode.to_string();
        self
    }

    pub fn latency_sample_num(mut self, n: usize) -> Self {
        self.latency_sample_num = n;
        self
    }

    pub fn includes(mut self, names: &[&str]) -> Self {
        self.includes = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn excludes(mut self, names: &[&str]) -> Self {
        self.excludes = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// The validated, typed form of a request's options.
#[derive(Debug)]
struct Plan {
    direction: Direction,
    mode: SearchMode,
    filter: StrategyFilter,
}

impl Plan {
    fn from_request(request: &SearchRequest) -> Result<Self, SearchError> {
        let direction: Direction = request.direction.parse()?;
        let mode: SearchMode = request.search_mode.parse()?;
        let invalid = |e: strategy_catalog::CatalogError| SearchError::InputValidation(e.to_string());

        let accelerators = request
            .accelerators
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.parse::<Accelerator>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(invalid)?;
        let precisions = request
            .precisions
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.parse::<Precision>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(invalid)?;

        if request.latency_sample_num == 0 {
            return Err(SearchError::InputValidation(
                "latency_sample_num must be at least 1".to_string(),
            ));
        }
        if request.thread_num == Some(0) {
            return Err(SearchError::InputValidation(
                "thread_num must be at least 1".to_string(),
            ));
        }

        let filter = StrategyFilter {
            precisions,
            accelerators,
            kernel_library: request.use_ipex,
        };
        // Any filter implies a grid search.
        let mode = if filter.is_empty() { mode } else { SearchMode::Grid };
        Ok(Self {
            direction,
            mode,
            filter,
        })
    }

    fn catalog(&self, full: &StrategyCatalog) -> StrategyCatalog {
        match self.mode {
            SearchMode::Default => full.subset(&DEFAULT_SUBSET),
            SearchMode::All => full.clone(),
            SearchMode::Grid => full.filter(&self.filter),
        }
    }
}

/// Runs every candidate strategy against a model and reports the results.
///
/// Strategies are tried one at a time, in catalog order, on the calling
/// thread. A strategy that fails in any way is recorded and the search moves
/// on; only malformed arguments, an input the model cannot run, or a metric
/// that does not work on the unmodified model abort the search.
pub struct SearchEngine {
    producer: Arc<dyn ModelProducer>,
    probe: Arc<dyn DependencyProbe>,
    catalog: StrategyCatalog,
    harness: BenchmarkHarness,
    threads: Arc<ThreadBudget>,
}

impl SearchEngine {
    pub fn new(producer: Arc<dyn ModelProducer>, probe: Arc<dyn DependencyProbe>) -> Self {
        Self {
            producer,
            probe,
            catalog: StrategyCatalog::full(),
            harness: BenchmarkHarness::default(),
            threads: ThreadBudget::global(),
        }
    }

    /// Replaces the catalog every mode and includes draw from. The default
    /// mode keeps the curated names this catalog contains.
    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_harness(mut self, config: HarnessConfig) -> Self {
        self.harness = BenchmarkHarness::new(config);
        self
    }

    /// Uses `threads` instead of the process-wide budget.
    pub fn with_thread_budget(mut self, threads: Arc<ThreadBudget>) -> Self {
        self.threads = threads;
        self
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Searches for the fastest acceleration of `model`.
    pub fn optimize(
        &self,
        model: &SharedModel,
        request: SearchRequest,
    ) -> Result<SearchReport, SearchError> {
        let plan = Plan::from_request(&request)?;
        let catalog = plan.catalog(&self.catalog);
        let candidates = available_subset(
            &catalog,
            &self.catalog,
            self.probe.as_ref(),
            request.includes.as_deref(),
            request.excludes.as_deref(),
        )?;
        tracing::info!(
            "searching {} strategies ({} mode) for model '{}'",
            candidates.len(),
            plan.mode,
            model.name()
        );

        let tracking = request.validation_data.is_some() || request.metric.is_some();
        let thread_count = request.thread_num.unwrap_or_else(|| self.threads.current());

        let input_sample = match request.input_sample {
            Some(sample) => sample,
            None => request
                .training_data
                .input_sample(model.num_inputs())
                .map_err(|source| SearchError::IncompatibleInput { source })?,
        };
        let calibration_data = request.training_data.into_loader();
        let validation_data = request.validation_data.map(TrainingData::into_loader);

        let (baseline, first) = time_once(|| model.forward(&input_sample));
        first.map_err(|source| SearchError::IncompatibleInput { source })?;
        let calibration_sample_size = if baseline > SLOW_MODEL_THRESHOLD {
            SLOW_MODEL_CALIBRATION_SAMPLES
        } else {
            DEFAULT_CALIBRATION_SAMPLES
        };
        tracing::debug!(
            "baseline forward {:.3}ms → {calibration_sample_size} calibration samples",
            bench_harness::ms(baseline)
        );

        let start = Instant::now();
        let total = candidates.len();
        let mut records = Vec::with_capacity(total);

        for (idx, candidate) in candidates.iter().enumerate() {
            let name = candidate.name.as_str();
            let strategy = candidate.strategy.clone();

            if !candidate.available {
                tracing::info!("[{}/{total}] {name}: lack dependency", idx + 1);
                records.push((
                    name.to_string(),
                    OutcomeRecord::new(strategy, Status::LackDependency),
                ));
                continue;
            }
            tracing::info!("[{}/{total}] testing {name}", idx + 1);

            let artifact: Box<dyn InferenceModel> = match BackendAdapter::for_strategy(name, &strategy) {
                None => Box::new(Arc::clone(model)),
                Some(adapter) => {
                    let conversion = ConversionRequest {
                        name,
                        strategy: &strategy,
                        adapter,
                        input_sample: &input_sample,
                        calibration_data: &calibration_data,
                        thread_count,
                        calibration_sample_size,
                    };
                    match self.producer.convert(model, &conversion) {
                        Ok(artifact) => artifact,
                        Err(e) => {
                            tracing::warn!("{name}: fail to convert: {e}");
                            records.push((
                                name.to_string(),
                                OutcomeRecord::failed(strategy, Status::FailToConvert, e.to_string()),
                            ));
                            continue;
                        }
                    }
                }
            };

            // An artifact built for a fixed thread count is timed at that
            // count; forward passes run on a pool of exactly that size.
            let threads = artifact.thread_count().unwrap_or(thread_count);
            let measured = {
                let _threads = self.threads.acquire(threads);
                self.threads
                    .install(|| {
                        self.harness.measure_model(
                            artifact.as_ref(),
                            &input_sample,
                            request.latency_sample_num,
                            baseline,
                        )
                    })
                    .and_then(|m| m)
            };
            let measurement = match measured {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("{name}: fail to forward: {e}");
                    records.push((
                        name.to_string(),
                        OutcomeRecord::failed(strategy, Status::FailToForward, e.to_string()),
                    ));
                    continue;
                }
            };

            let mut record = OutcomeRecord::new(strategy, Status::Successful);
            record.latency = Some(measurement.latency);
            record.stats = measurement.stats();

            if !measurement.completed && name != ORIGINAL {
                tracing::info!(
                    "{name}: early stopped at {:.3}ms",
                    bench_harness::ms(measurement.latency)
                );
                record.status = Status::EarlyStopped;
                record.artifact = Some(artifact);
                records.push((name.to_string(), record));
                continue;
            }

            if tracking {
                if record.strategy.precision == Precision::Fp32 && name != ORIGINAL {
                    record.accuracy = Some(Accuracy::NotRecomputed);
                } else {
                    match evaluate(request.metric.as_ref(), artifact.as_ref(), validation_data.as_ref()) {
                        Ok(v) => record.accuracy = Some(Accuracy::Value(v)),
                        Err(source) if name == ORIGINAL => {
                            tracing::error!("metric does not work on the original model: {source}");
                            return Err(SearchError::MetricProtocol { source });
                        }
                        Err(e) => {
                            tracing::warn!("{name}: accuracy unavailable: {e}");
                            record.error = Some(e.to_string());
                        }
                    }
                }
            }

            tracing::info!(
                "{name}: {:.3}ms{}",
                bench_harness::ms(measurement.latency),
                record
                    .accuracy
                    .map(|a| format!(", accuracy {a}"))
                    .unwrap_or_default()
            );
            record.artifact = Some(artifact);
            records.push((name.to_string(), record));
        }

        let report = SearchReport::new(records, plan.direction, tracking, start.elapsed());
        tracing::info!("{}", report);
        Ok(report)
    }
}

fn evaluate(
    metric: Option<&Metric>,
    model: &dyn InferenceModel,
    data: Option<&DataLoader>,
) -> Result<f64, MetricError> {
    let metric = metric.ok_or_else(|| {
        MetricError::Evaluation("validation data was supplied without a metric".to_string())
    })?;
    metric.evaluate(model, data)
}
