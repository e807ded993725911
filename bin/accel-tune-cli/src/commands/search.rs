// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-tune search` command: run a strategy search on the demo model.
//!
//! Every strategy is built by the emulated producer, benchmarked, and scored
//! with top-1 accuracy against labels taken from the unmodified model. The
//! report table is printed, followed by the best pick.

use super::demo::{self, EmulatedProducer};
use super::{split_list, DemoModelArgs};
use bench_harness::HarnessConfig;
use model_core::SharedModel;
use search_engine::{
    AccuracyCriterion, Metric, SearchConfig, SearchEngine, SearchRequest, SelectionCriteria,
    DEFAULT_LATENCY_SAMPLE_NUM,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub model: DemoModelArgs,

    /// Rows per input batch.
    #[arg(long, default_value_t = 32)]
    pub rows: usize,

    /// Search mode: default, all, grid.
    #[arg(short, long, default_value = "default")]
    pub mode: String,

    /// Precision filter (comma-separated): fp32, bf16, int8.
    #[arg(long)]
    pub precisions: Option<String>,

    /// Accelerator filter (comma-separated): none, jit, openvino, onnxruntime.
    #[arg(long)]
    pub accelerators: Option<String>,

    /// Kernel-library filter.
    #[arg(long)]
    pub use_ipex: Option<bool>,

    /// Only search these strategies (comma-separated; original is always kept).
    #[arg(long)]
    pub includes: Option<String>,

    /// Never search these strategies (comma-separated).
    #[arg(long)]
    pub excludes: Option<String>,

    /// Direction in which accuracy improves: max or min.
    #[arg(long, default_value = "max")]
    pub direction: String,

    /// Timed samples per strategy.
    #[arg(long, default_value_t = DEFAULT_LATENCY_SAMPLE_NUM)]
    pub latency_samples: usize,

    /// Threads to benchmark with (default: the current budget).
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Installed backends: all, none, or a comma-separated list of
    /// kernel-library, quantization-toolkit, graph-runtime-a, graph-runtime-b.
    #[arg(long, default_value = "all")]
    pub available: String,

    /// Skip accuracy tracking.
    #[arg(long)]
    pub no_metric: bool,

    /// Maximum relative accuracy drop of the selected artifact (e.g. 0.01).
    #[arg(long)]
    pub max_accuracy_drop: Option<f64>,

    /// Write a JSON summary of the report here.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl SearchArgs {
    fn to_request(&self, training: model_core::Tensor) -> SearchRequest {
        let list = |v: &Option<String>| v.as_deref().map(split_list);
        SearchRequest {
            direction: self.direction.clone(),
            search_mode: self.mode.clone(),
            latency_sample_num: self.latency_samples,
            thread_num: self.threads,
            precisions: list(&self.precisions),
            accelerators: list(&self.accelerators),
            use_ipex: self.use_ipex,
            includes: list(&self.includes),
            excludes: list(&self.excludes),
            ..SearchRequest::new(training)
        }
    }
}

pub async fn execute(args: SearchArgs, config: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            accel-tune · Strategy Search              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let model = demo::demo_model(&args.model);
    let shared: SharedModel = Arc::new(model);
    let training = demo::demo_inputs(args.rows, args.model.in_features, 0);

    let (mut request, harness, report_path) = match &config {
        Some(path) => {
            let cfg = SearchConfig::from_file(path)?;
            println!("  Config: {}", path.display());
            let report_path = cfg.report_path.clone().or_else(|| args.report.clone());
            (
                SearchRequest::from_config(training, &cfg),
                cfg.harness,
                report_path,
            )
        }
        None => (
            args.to_request(training),
            HarnessConfig::default(),
            args.report.clone(),
        ),
    };

    if !args.no_metric {
        let validation = demo::labelled_loader(
            shared.as_ref(),
            4,
            args.rows,
            args.model.in_features,
        )?;
        request = request
            .validation_data(validation)
            .metric(Metric::top1_accuracy());
    }

    println!(
        "  Model: {} ({} → {}), mode {}, {} samples per strategy",
        shared.name(),
        args.model.in_features,
        args.model.out_features,
        request.search_mode,
        request.latency_sample_num
    );
    println!();

    let engine = SearchEngine::new(
        Arc::new(EmulatedProducer),
        Arc::new(demo::parse_probe(&args.available)?),
    )
    .with_harness(harness);

    // The search is CPU-bound and runs on this thread.
    let report = tokio::task::block_in_place(|| engine.optimize(&shared, request))?;

    // ── Report ─────────────────────────────────────────────────
    println!("{report}");
    println!();

    // ── Selection ──────────────────────────────────────────────
    let criteria = SelectionCriteria {
        accuracy: args
            .max_accuracy_drop
            .filter(|_| report.accuracy_tracked())
            .map(AccuracyCriterion::Relative),
        ..Default::default()
    };
    match report.best(&criteria) {
        Ok(best) => {
            println!("  Best:     {} ({})", best.name, best.record.strategy);
            if let Some(ms) = best.record.latency_ms() {
                println!("  Latency:  {ms:.3} ms");
            }
            if let Some(acc) = best.record.accuracy {
                println!("  Accuracy: {acc}");
            }
        }
        Err(e) => println!("  No selection: {e}"),
    }

    if let Some(path) = report_path {
        report.save_json(&path)?;
        println!("  Report written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(clap::Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: SearchArgs,
    }

    #[test]
    fn test_flags_become_request() {
        let w = Wrapper::parse_from([
            "search",
            "--precisions",
            "int8,bf16",
            "--excludes",
            "int8_ipex",
            "--direction",
            "min",
            "--latency-samples",
            "7",
        ]);
        let r = w.args.to_request(model_core::Tensor::zeros(vec![1, 64]));
        assert_eq!(
            r.precisions,
            Some(vec!["int8".to_string(), "bf16".to_string()])
        );
        assert_eq!(r.excludes, Some(vec!["int8_ipex".to_string()]));
        assert_eq!(r.direction, "min");
        assert_eq!(r.latency_sample_num, 7);
        assert_eq!(r.accelerators, None);
        assert_eq!(r.search_mode, "default");
    }
}
