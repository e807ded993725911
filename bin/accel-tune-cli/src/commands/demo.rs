// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The demo model, its data, and an in-process producer.
//!
//! [`EmulatedProducer`] stands in for real backends: every strategy becomes
//! a wrapper around the original model, with output rounding that mimics
//! the precision of the target (bf16 mantissa truncation, int8 symmetric
//! quantization calibrated on the training data).

use super::DemoModelArgs;
use bench_harness::ThreadBudget;
use model_core::{Batch, DataLoader, FnModel, InferenceModel, LinearModel, SharedModel, Tensor};
use search_engine::{
    BackendAdapter, ConversionError, ConversionRequest, ModelProducer, DEFAULT_CALIBRATION_SAMPLES,
};
use std::sync::Arc;
use strategy_catalog::{Dependency, FixedProbe, StrategyCatalog};

pub fn demo_model(args: &DemoModelArgs) -> LinearModel {
    LinearModel::seeded("demo", args.in_features, args.out_features, args.seed)
}

/// Deterministic input rows; `salt` varies the values between sets.
pub fn demo_inputs(rows: usize, features: usize, salt: u64) -> Tensor {
    let mut t = Tensor::zeros(vec![rows, features]);
    for (i, v) in t.as_mut_slice().iter_mut().enumerate() {
        *v = ((i as f32 + 1.0) * 0.618 + salt as f32 * 1.7).sin();
    }
    t
}

/// The demo model converted with `strategy` through [`EmulatedProducer`].
///
/// Calibration data is derived from the model arguments alone, so a worker
/// process and its coordinator build identical artifacts.
pub fn demo_artifact(
    args: &DemoModelArgs,
    strategy: &str,
) -> anyhow::Result<Box<dyn InferenceModel>> {
    let model: SharedModel = Arc::new(demo_model(args));
    let catalog = StrategyCatalog::full();
    let spec = catalog
        .get(strategy)
        .ok_or_else(|| anyhow::anyhow!("unknown strategy '{strategy}'"))?;
    let Some(adapter) = BackendAdapter::for_strategy(strategy, spec) else {
        return Ok(Box::new(model));
    };

    let calibration = DataLoader::new(
        (0..4)
            .map(|b| Batch::new(vec![demo_inputs(8, args.in_features, 200 + b)]))
            .collect(),
    );
    let input_sample = vec![demo_inputs(1, args.in_features, 0)];
    let request = ConversionRequest {
        name: strategy,
        strategy: spec,
        adapter,
        input_sample: &input_sample,
        calibration_data: &calibration,
        thread_count: ThreadBudget::global().current(),
        calibration_sample_size: DEFAULT_CALIBRATION_SAMPLES,
    };
    let artifact = EmulatedProducer.convert(&model, &request)?;
    tracing::info!("built '{}' via {adapter:?}", artifact.name());
    Ok(artifact)
}

/// A validation loader labelled with the model's own predictions, so the
/// original model scores 1.0.
pub fn labelled_loader(
    model: &dyn InferenceModel,
    batches: usize,
    rows: usize,
    features: usize,
) -> anyhow::Result<DataLoader> {
    let mut out = Vec::with_capacity(batches);
    for b in 0..batches {
        let x = demo_inputs(rows, features, 100 + b as u64);
        let labels: Vec<f32> = model
            .forward(std::slice::from_ref(&x))?
            .argmax_rows()
            .into_iter()
            .map(|c| c as f32)
            .collect();
        let y = Tensor::new(vec![labels.len()], labels)?;
        out.push(Batch::with_target(vec![x], y));
    }
    Ok(DataLoader::new(out))
}

/// Parses `all`, `none`, or a comma-separated list of dependency names.
pub fn parse_probe(list: &str) -> anyhow::Result<FixedProbe> {
    match list.trim() {
        "all" => Ok(FixedProbe::all()),
        "none" => Ok(FixedProbe::none()),
        names => {
            let deps = super::split_list(names)
                .iter()
                .map(|s| s.parse::<Dependency>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FixedProbe::with(deps))
        }
    }
}

fn truncate_bf16(v: f32) -> f32 {
    f32::from_bits(v.to_bits() & 0xFFFF_0000)
}

fn quantize_int8(v: f32, scale: f32) -> f32 {
    (v / scale).round().clamp(-127.0, 127.0) * scale
}

/// Builds emulated artifacts for every adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmulatedProducer;

impl EmulatedProducer {
    /// Symmetric int8 scale from the largest output over the calibration
    /// batches.
    fn calibrate(
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<f32, ConversionError> {
        let n = model.num_inputs();
        let calibration = request.calibration_data.take(request.calibration_sample_size);
        if calibration.is_empty() {
            return Err(ConversionError::Failed {
                strategy: request.name.to_string(),
                detail: "no calibration data".to_string(),
            });
        }
        let mut max_abs = 0.0f32;
        for batch in &calibration {
            let out = model.forward(batch.inputs(n))?;
            max_abs = out.as_slice().iter().fold(max_abs, |m, v| m.max(v.abs()));
        }
        tracing::debug!(
            "{}: calibrated on {} batches, max |y| = {max_abs:.4}",
            request.name,
            calibration.len()
        );
        Ok(if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 })
    }
}

impl ModelProducer for EmulatedProducer {
    fn convert(
        &self,
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<Box<dyn InferenceModel>, ConversionError> {
        let inner = Arc::clone(model);
        let name = format!("{}[{}]", model.name(), request.name);
        let n = model.num_inputs();

        let artifact = match request.adapter {
            BackendAdapter::NoOpTrace
            | BackendAdapter::JitCompile
            | BackendAdapter::GraphRuntimeA
            | BackendAdapter::GraphRuntimeB => FnModel::new(&name, n, move |x| inner.forward(x)),
            BackendAdapter::Bf16Cast => FnModel::new(&name, n, move |x| {
                Ok(inner.forward(x)?.map(truncate_bf16))
            }),
            BackendAdapter::Int8Quantize => {
                let scale = Self::calibrate(model, request)?;
                FnModel::new(&name, n, move |x| {
                    Ok(inner.forward(x)?.map(|v| quantize_int8(v, scale)))
                })
            }
        };
        Ok(Box::new(artifact.with_thread_count(request.thread_count)))
    }
}
