// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Search the default subset with a producer that only knows bf16.
//!
//! Shows how a search report looks when some strategies convert, some are
//! unsupported and some lack dependencies, and how the best artifact is
//! picked under an accuracy limit.
//!
//! ```bash
//! cargo run -p search-engine --example strategy_search
//! ```

use model_core::{Batch, DataLoader, FnModel, InferenceModel, LinearModel, SharedModel, Tensor};
use search_engine::{
    AccuracyCriterion, ConversionError, ConversionRequest, Metric, ModelProducer, SearchEngine,
    SearchRequest, SelectionCriteria,
};
use std::sync::Arc;
use strategy_catalog::{Dependency, FixedProbe, Precision};

/// Runs the original for fp32 and truncates outputs to bf16 mantissa width
/// for bf16. Everything else is unsupported.
struct Bf16Only;

impl ModelProducer for Bf16Only {
    fn convert(
        &self,
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<Box<dyn InferenceModel>, ConversionError> {
        if request.strategy.precision != Precision::Bf16 {
            return Err(ConversionError::Unsupported {
                strategy: request.name.to_string(),
                detail: "only bf16 is emulated here".to_string(),
            });
        }
        let inner = Arc::clone(model);
        let artifact = FnModel::new(request.name, 1, move |x| {
            let out = inner.forward(x)?;
            Ok(out.map(|v| f32::from_bits(v.to_bits() & 0xFFFF_0000)))
        });
        Ok(Box::new(artifact.with_thread_count(request.thread_count)))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let model: SharedModel = Arc::new(LinearModel::seeded("toy", 16, 4, 7));

    // Labelled validation data: the original's own predictions, so it
    // scores 1.0 and every artifact is judged against it.
    let batches = (0..4)
        .map(|b| {
            let data = (0..8 * 16).map(|i| ((i + b * 31) as f32 * 0.37).sin()).collect();
            let x = Tensor::new(vec![8, 16], data)?;
            let labels = model.forward(&[x.clone()])?.argmax_rows();
            let target = Tensor::new(vec![8], labels.iter().map(|&l| l as f32).collect())?;
            Ok(Batch::with_target(vec![x], target))
        })
        .collect::<Result<Vec<_>, model_core::ModelError>>()?;
    let loader = DataLoader::new(batches);

    let probe = FixedProbe::with([Dependency::KernelLibrary]);
    let engine = SearchEngine::new(Arc::new(Bf16Only), Arc::new(probe));

    let request = SearchRequest::new(loader.clone())
        .validation_data(loader)
        .metric(Metric::top1_accuracy())
        .latency_sample_num(20);

    let report = engine.optimize(&model, request)?;
    println!("{report}");

    let criteria = SelectionCriteria {
        accuracy: Some(AccuracyCriterion::Relative(0.05)),
        ..Default::default()
    };
    let best = report.best(&criteria)?;
    println!(
        "Best: {} ({:.3} ms)",
        best.name,
        best.record.latency_ms().unwrap_or(f64::NAN)
    );
    Ok(())
}
