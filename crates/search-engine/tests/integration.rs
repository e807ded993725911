// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: full searches against scripted producers.
//!
//! These tests drive `SearchEngine::optimize` end to end, covering catalog
//! narrowing, failure isolation, early stopping, accuracy tracking and
//! best-artifact selection.

use bench_harness::{HarnessConfig, ThreadBudget};
use model_core::{
    Batch, DataLoader, FnModel, InferenceModel, LinearModel, ModelError, SharedModel, Tensor,
};
use search_engine::{
    Accuracy, AccuracyCriterion, ConversionError, ConversionRequest, Metric, ModelProducer,
    SearchEngine, SearchError, SearchRequest, SelectionCriteria, Status,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strategy_catalog::{Dependency, FixedProbe, Precision, ORIGINAL};

// ── Helpers ────────────────────────────────────────────────────

/// What the scripted producer does for one strategy.
#[derive(Clone)]
enum Script {
    /// Conversion fails.
    Fail,
    /// Conversion succeeds; the artifact errors on forward.
    BrokenForward,
    /// The artifact sleeps this long before delegating.
    Slow(Duration),
    /// The artifact records the size of the pool each forward runs on,
    /// and reports `threads` as its own thread count when given.
    Observed {
        threads: Option<usize>,
        seen: Arc<Mutex<Vec<usize>>>,
    },
}

/// One conversion call as seen by the producer.
#[derive(Debug, Clone)]
struct Call {
    name: String,
    thread_count: usize,
    calibration_sample_size: usize,
}

/// Wraps the model in a pass-through artifact named after the strategy,
/// unless a script says otherwise.
#[derive(Default)]
struct ScriptedProducer {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProducer {
    fn with(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelProducer for ScriptedProducer {
    fn convert(
        &self,
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<Box<dyn InferenceModel>, ConversionError> {
        self.calls.lock().unwrap().push(Call {
            name: request.name.to_string(),
            thread_count: request.thread_count,
            calibration_sample_size: request.calibration_sample_size,
        });
        let inner = Arc::clone(model);
        let name = request.name;
        let artifact = match self.scripts.get(name).cloned() {
            Some(Script::Fail) => {
                return Err(ConversionError::Failed {
                    strategy: name.to_string(),
                    detail: "scripted failure".to_string(),
                })
            }
            Some(Script::BrokenForward) => {
                let owned = name.to_string();
                FnModel::new(name, 1, move |_| {
                    Err(ModelError::Forward {
                        model: owned.clone(),
                        detail: "scripted forward failure".to_string(),
                    })
                })
            }
            Some(Script::Slow(delay)) => FnModel::new(name, 1, move |x| {
                std::thread::sleep(delay);
                inner.forward(x)
            }),
            Some(Script::Observed { threads, seen }) => {
                let artifact = FnModel::new(name, 1, move |x| {
                    seen.lock().unwrap().push(rayon::current_num_threads());
                    inner.forward(x)
                });
                let threads = threads.unwrap_or(request.thread_count);
                return Ok(Box::new(artifact.with_thread_count(threads)));
            }
            None => FnModel::new(name, 1, move |x| inner.forward(x)),
        };
        Ok(Box::new(artifact.with_thread_count(request.thread_count)))
    }
}

fn linear() -> SharedModel {
    Arc::new(LinearModel::seeded("net", 8, 3, 11))
}

fn sleepy(delay: Duration) -> SharedModel {
    Arc::new(FnModel::new("sleepy", 1, move |x| {
        std::thread::sleep(delay);
        Ok(x[0].clone())
    }))
}

fn train() -> Tensor {
    Tensor::full(vec![4, 8], 0.5)
}

/// Fast harness with early stopping effectively off.
fn quiet_harness() -> HarnessConfig {
    HarnessConfig {
        wall_budget_secs: 1.0,
        min_samples: 3,
        early_stop_factor: 1.0e6,
        ..Default::default()
    }
}

fn engine(producer: Arc<ScriptedProducer>, probe: FixedProbe) -> SearchEngine {
    SearchEngine::new(producer, Arc::new(probe)).with_harness(quiet_harness())
}

fn request() -> SearchRequest {
    SearchRequest::new(train()).latency_sample_num(5)
}

fn names(report: &search_engine::SearchReport) -> Vec<&str> {
    report.records().map(|(n, _)| n).collect()
}

// ── Catalog narrowing ──────────────────────────────────────────

#[test]
fn test_default_search_covers_default_subset() {
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer.clone(), FixedProbe::all())
        .optimize(&linear(), request())
        .unwrap();

    assert_eq!(names(&report), strategy_catalog::DEFAULT_SUBSET.to_vec());
    assert!(report.records().all(|(_, r)| r.status == Status::Successful));
    // Every strategy except original goes through the producer.
    assert_eq!(producer.calls().len(), 10);
    assert!(!report.accuracy_tracked());
}

#[test]
fn test_precision_filter_implies_grid() {
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), request().precisions(&["int8"]))
        .unwrap();

    assert_eq!(
        names(&report),
        vec![
            ORIGINAL,
            "int8",
            "int8_ipex",
            "openvino_int8",
            "onnxruntime_int8_qlinear",
            "onnxruntime_int8_integer",
        ]
    );
}

#[test]
fn test_all_mode_and_kernel_library_filter() {
    let producer = Arc::new(ScriptedProducer::default());
    let e = engine(producer, FixedProbe::all());

    let all = e.optimize(&linear(), request().search_mode("all")).unwrap();
    assert_eq!(all.len(), 23);

    let ipex = e
        .optimize(&linear(), request().accelerators(&["jit"]).use_ipex(true))
        .unwrap();
    assert_eq!(
        names(&ipex),
        vec![
            ORIGINAL,
            "jit_fp32_ipex",
            "jit_fp32_ipex_channels_last",
            "jit_bf16_ipex",
            "jit_bf16_ipex_channels_last",
        ]
    );
}

#[test]
fn test_includes_and_excludes() {
    let producer = Arc::new(ScriptedProducer::default());
    let e = engine(producer, FixedProbe::all());

    // jit_fp32 is outside the default subset and comes from the full catalog.
    let included = e
        .optimize(&linear(), request().includes(&["bf16", "jit_fp32"]))
        .unwrap();
    assert_eq!(names(&included), vec![ORIGINAL, "bf16", "jit_fp32"]);

    let excluded = e
        .optimize(&linear(), request().excludes(&[ORIGINAL, "bf16", "int8"]))
        .unwrap();
    let n = names(&excluded);
    assert_eq!(n.len(), 9);
    assert_eq!(n[0], ORIGINAL);
    assert!(!n.contains(&"bf16"));

    let unknown = e.optimize(&linear(), request().includes(&["fp64_magic"]));
    assert!(matches!(unknown, Err(SearchError::Catalog(_))));
}

// ── Failure isolation ──────────────────────────────────────────

#[test]
fn test_failures_are_recorded_not_raised() {
    let producer = Arc::new(
        ScriptedProducer::default()
            .with("bf16", Script::Fail)
            .with("int8", Script::BrokenForward),
    );
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), request())
        .unwrap();

    let bf16 = report.get("bf16").unwrap();
    assert_eq!(bf16.status, Status::FailToConvert);
    assert!(bf16.artifact().is_none());
    assert!(bf16.latency.is_none());
    assert!(bf16.error.as_deref().unwrap().contains("scripted failure"));

    let int8 = report.get("int8").unwrap();
    assert_eq!(int8.status, Status::FailToForward);
    assert!(int8.artifact().is_none());

    let jit = report.get("jit_fp32_ipex").unwrap();
    assert_eq!(jit.status, Status::Successful);
    assert!(jit.artifact().is_some());
    assert!(jit.latency.is_some());

    assert_eq!(report.ranked().len(), 9);
}

#[test]
fn test_missing_dependencies() {
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer.clone(), FixedProbe::with([Dependency::KernelLibrary]))
        .optimize(&linear(), request())
        .unwrap();

    for name in ["int8", "openvino_fp32", "openvino_int8", "onnxruntime_fp32"] {
        let r = report.get(name).unwrap();
        assert_eq!(r.status, Status::LackDependency, "{name}");
        assert!(r.artifact().is_none());
    }
    assert_eq!(report.get("bf16").unwrap().status, Status::Successful);
    assert_eq!(report.get("jit_bf16_ipex").unwrap().status, Status::Successful);
    assert!(producer.calls().iter().all(|c| !c.name.starts_with("openvino")));
}

#[test]
fn test_repeated_search_gives_same_statuses() {
    let producer = Arc::new(ScriptedProducer::default().with("bf16", Script::Fail));
    let e = engine(producer, FixedProbe::with([Dependency::GraphRuntimeA]));
    let statuses = |r: &search_engine::SearchReport| -> Vec<(String, Status)> {
        r.records().map(|(n, r)| (n.to_string(), r.status)).collect()
    };
    let first = e.optimize(&linear(), request()).unwrap();
    let second = e.optimize(&linear(), request()).unwrap();
    assert_eq!(statuses(&first), statuses(&second));
}

// ── Input handling ─────────────────────────────────────────────

#[test]
fn test_invalid_options_abort_before_conversion() {
    let producer = Arc::new(ScriptedProducer::default());
    let e = engine(producer.clone(), FixedProbe::all());

    for bad in [
        request().direction("sideways"),
        request().search_mode("exhaustive"),
        request().accelerators(&["tensorrt"]),
        request().latency_sample_num(0),
    ] {
        assert!(matches!(
            e.optimize(&linear(), bad),
            Err(SearchError::InputValidation(_))
        ));
    }
    assert!(producer.calls().is_empty());
}

#[test]
fn test_incompatible_training_data() {
    let producer = Arc::new(ScriptedProducer::default());
    let e = engine(producer.clone(), FixedProbe::all());

    let wrong_width = SearchRequest::new(Tensor::zeros(vec![2, 5]));
    assert!(matches!(
        e.optimize(&linear(), wrong_width),
        Err(SearchError::IncompatibleInput { .. })
    ));

    let empty = SearchRequest::new(DataLoader::default());
    assert!(matches!(
        e.optimize(&linear(), empty),
        Err(SearchError::IncompatibleInput { .. })
    ));
    assert!(producer.calls().is_empty());
}

#[test]
fn test_input_sample_cut_from_loader_batch() {
    // (x, y) batches feed a one-input model with x only.
    let loader = DataLoader::new(vec![Batch::with_target(vec![train()], Tensor::zeros(vec![4]))]);
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), SearchRequest::new(loader).includes(&[]))
        .unwrap();
    assert_eq!(names(&report), vec![ORIGINAL]);
    assert!(report.get(ORIGINAL).unwrap().is_successful());
}

#[test]
fn test_calibration_sample_size_follows_baseline() {
    let producer = Arc::new(ScriptedProducer::default());
    engine(producer.clone(), FixedProbe::all())
        .optimize(&linear(), request().includes(&["int8"]))
        .unwrap();
    assert_eq!(producer.calls()[0].calibration_sample_size, 100);

    let producer = Arc::new(ScriptedProducer::default());
    engine(producer.clone(), FixedProbe::all())
        .optimize(
            &sleepy(Duration::from_millis(120)),
            request().includes(&["int8"]).latency_sample_num(1),
        )
        .unwrap();
    assert_eq!(producer.calls()[0].calibration_sample_size, 15);
}

// ── Threads ────────────────────────────────────────────────────

#[test]
fn test_thread_budget_restored_after_search() {
    let budget = Arc::new(ThreadBudget::new(3));
    let seen = Arc::new(AtomicUsize::new(0));
    let (probe_budget, probe_seen) = (Arc::clone(&budget), Arc::clone(&seen));
    let model: SharedModel = Arc::new(FnModel::new("watcher", 1, move |x| {
        probe_seen.fetch_max(probe_budget.current(), Ordering::SeqCst);
        Ok(x[0].clone())
    }));

    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer.clone(), FixedProbe::all())
        .with_thread_budget(Arc::clone(&budget))
        .optimize(&model, request().thread_num(1).includes(&["bf16"]))
        .unwrap();

    assert_eq!(budget.current(), 3);
    // The baseline runs under the ambient budget, benchmarks under 1.
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(producer.calls()[0].thread_count, 1);
    let bf16 = report.get("bf16").unwrap();
    assert_eq!(bf16.artifact().unwrap().thread_count(), Some(1));
}

#[test]
fn test_benchmarks_run_on_pool_of_artifact_thread_count() {
    let bf16_seen = Arc::new(Mutex::new(Vec::new()));
    let int8_seen = Arc::new(Mutex::new(Vec::new()));
    let producer = Arc::new(
        ScriptedProducer::default()
            .with(
                "bf16",
                Script::Observed {
                    threads: None,
                    seen: Arc::clone(&bf16_seen),
                },
            )
            .with(
                "int8",
                Script::Observed {
                    threads: Some(2),
                    seen: Arc::clone(&int8_seen),
                },
            ),
    );
    let budget = Arc::new(ThreadBudget::new(1));
    engine(producer, FixedProbe::all())
        .with_thread_budget(Arc::clone(&budget))
        .optimize(&linear(), request().thread_num(3).includes(&["bf16", "int8"]))
        .unwrap();

    // bf16 runs at the requested count, int8 at the count it was built for.
    let bf16 = bf16_seen.lock().unwrap().clone();
    let int8 = int8_seen.lock().unwrap().clone();
    assert!(!bf16.is_empty() && bf16.iter().all(|&n| n == 3), "{bf16:?}");
    assert!(!int8.is_empty() && int8.iter().all(|&n| n == 2), "{int8:?}");
    assert_eq!(budget.current(), 1);
}

// ── Early stopping ─────────────────────────────────────────────

#[test]
fn test_slow_artifact_is_early_stopped_and_kept() {
    let producer = Arc::new(
        ScriptedProducer::default().with("bf16", Script::Slow(Duration::from_millis(40))),
    );
    let harness = HarnessConfig {
        wall_budget_secs: 1.0,
        min_samples: 3,
        ..Default::default()
    };
    let mut report = SearchEngine::new(producer, Arc::new(FixedProbe::all()))
        .with_harness(harness)
        .optimize(
            &sleepy(Duration::from_millis(2)),
            request().includes(&["bf16"]).latency_sample_num(20),
        )
        .unwrap();

    let bf16 = report.get("bf16").unwrap();
    assert_eq!(bf16.status, Status::EarlyStopped);
    assert!(bf16.latency.unwrap() >= Duration::from_millis(40));
    assert_eq!(bf16.stats.as_ref().unwrap().count, 3);
    assert!(report.ranked().iter().all(|(n, _)| *n != "bf16"));

    let best = report.best(&SelectionCriteria::default()).unwrap();
    assert_eq!(best.name, ORIGINAL);

    let taken = report.take("bf16").unwrap();
    assert!(taken.artifact.is_some());
}

#[test]
fn test_original_is_never_early_stopped() {
    // First call (the baseline) is instant, every later call is slow.
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let model: SharedModel = Arc::new(FnModel::new("warming", 1, move |x| {
        if counter.fetch_add(1, Ordering::SeqCst) > 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(x[0].clone())
    }));
    let harness = HarnessConfig {
        wall_budget_secs: 1.0,
        min_samples: 3,
        ..Default::default()
    };
    let report = SearchEngine::new(
        Arc::new(ScriptedProducer::default()),
        Arc::new(FixedProbe::all()),
    )
    .with_harness(harness)
    .optimize(&model, request().includes(&[]))
    .unwrap();

    let original = report.get(ORIGINAL).unwrap();
    assert_eq!(original.status, Status::Successful);
    assert!(original.latency.unwrap() >= Duration::from_millis(5));
}

// ── Accuracy ───────────────────────────────────────────────────

/// 0.90 for everything except int8 artifacts, which score 0.80.
fn name_metric() -> Metric {
    Metric::model_only(|m| Ok(if m.name().contains("int8") { 0.80 } else { 0.90 }))
}

#[test]
fn test_accuracy_tracking_and_selection() {
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), request().metric(name_metric()))
        .unwrap();

    assert!(report.accuracy_tracked());
    assert_eq!(
        report.get(ORIGINAL).unwrap().accuracy,
        Some(Accuracy::Value(0.90))
    );
    assert_eq!(
        report.get("jit_fp32_ipex").unwrap().accuracy,
        Some(Accuracy::NotRecomputed)
    );
    assert_eq!(report.get("bf16").unwrap().accuracy, Some(Accuracy::Value(0.90)));
    assert_eq!(report.get("int8").unwrap().accuracy, Some(Accuracy::Value(0.80)));

    let tight = SelectionCriteria {
        accuracy: Some(AccuracyCriterion::Relative(0.05)),
        ..Default::default()
    };
    let best = report.best(&tight).unwrap();
    assert!(!best.name.contains("int8"));

    let int8_only = SelectionCriteria {
        precision: Some(Precision::Int8),
        ..tight.clone()
    };
    assert!(matches!(
        report.best(&int8_only),
        Err(SearchError::NoCandidate(_))
    ));

    let loose = SelectionCriteria {
        precision: Some(Precision::Int8),
        accuracy: Some(AccuracyCriterion::Absolute(0.2)),
        ..Default::default()
    };
    assert!(report.best(&loose).unwrap().name.contains("int8"));
}

#[test]
fn test_accuracy_with_validation_loader() {
    let x = Tensor::full(vec![2, 8], 1.0);
    let y = Tensor::new(vec![2], vec![0.0, 2.0]).unwrap();
    let validation = DataLoader::new(vec![Batch::with_target(vec![x], y)]);

    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer, FixedProbe::all())
        .optimize(
            &linear(),
            request()
                .includes(&["bf16"])
                .validation_data(validation)
                .metric(Metric::top1_accuracy())
                .direction("max"),
        )
        .unwrap();

    let original = report.get(ORIGINAL).unwrap().accuracy.unwrap();
    let bf16 = report.get("bf16").unwrap().accuracy.unwrap();
    // The pass-through artifact predicts exactly like the model.
    assert_eq!(original, bf16);
    assert!((0.0..=1.0).contains(&original.value().unwrap()));
}

#[test]
fn test_metric_that_fails_on_original_aborts() {
    let producer = Arc::new(ScriptedProducer::default());
    let e = engine(producer, FixedProbe::all());

    // A prediction/target metric needs targets in the validation data.
    let no_targets = request()
        .validation_data(train())
        .metric(Metric::top1_accuracy());
    assert!(matches!(
        e.optimize(&linear(), no_targets),
        Err(SearchError::MetricProtocol { .. })
    ));

    // Validation data with no metric at all.
    let no_metric = request().validation_data(train());
    assert!(matches!(
        e.optimize(&linear(), no_metric),
        Err(SearchError::MetricProtocol { .. })
    ));
}

#[test]
fn test_accuracy_criterion_without_tracking() {
    let producer = Arc::new(ScriptedProducer::default());
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), request().includes(&["bf16"]))
        .unwrap();
    let criteria = SelectionCriteria {
        accuracy: Some(AccuracyCriterion::Absolute(0.1)),
        ..Default::default()
    };
    assert!(matches!(
        report.best(&criteria),
        Err(SearchError::InputValidation(_))
    ));
}

// ── Report ─────────────────────────────────────────────────────

#[test]
fn test_report_summary_written_to_disk() {
    let producer = Arc::new(ScriptedProducer::default().with("int8", Script::Fail));
    let report = engine(producer, FixedProbe::all())
        .optimize(&linear(), request())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.save_json(&path).unwrap();
    let loaded = search_engine::ReportSummary::load(&path).unwrap();

    assert_eq!(loaded.entries.len(), report.len());
    let int8 = loaded.entries.iter().find(|e| e.name == "int8").unwrap();
    assert_eq!(int8.status, Status::FailToConvert);
    assert!(int8.latency_ms.is_none());

    let table = report.to_string();
    assert!(table.contains("fail to convert"));
    assert!(table.contains("Optimization cost"));
}
