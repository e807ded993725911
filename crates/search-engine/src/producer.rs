// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The seam between the search and whatever actually builds artifacts.
//!
//! The engine never transforms a model itself. For every strategy except
//! `original` it hands a [`ConversionRequest`] to a [`ModelProducer`] and
//! benchmarks whatever comes back. [`BackendAdapter`] names the conversion
//! family a strategy needs so producers can route on it without re-deriving
//! the rules.

use crate::ConversionError;
use model_core::{DataLoader, InferenceModel, SharedModel, Tensor};
use std::fmt;
use strategy_catalog::{Accelerator, Precision, Strategy, ORIGINAL};

/// The conversion family a strategy is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BackendAdapter {
    /// fp32, eager: trace with layout or kernel-library options only.
    NoOpTrace,
    /// fp32, JIT compiled graph.
    JitCompile,
    /// fp32 export to graph runtime A.
    GraphRuntimeA,
    /// fp32 export to graph runtime B.
    GraphRuntimeB,
    /// Post-training int8 quantization (on any accelerator).
    Int8Quantize,
    /// Reduced-precision bf16 execution (on any accelerator).
    Bf16Cast,
}

impl BackendAdapter {
    /// Routes `strategy` to its conversion family. `None` for `original`,
    /// which is used unchanged.
    pub fn for_strategy(name: &str, strategy: &Strategy) -> Option<Self> {
        if name == ORIGINAL {
            return None;
        }
        let adapter = match (strategy.precision, strategy.accelerator) {
            (Precision::Int8, _) => BackendAdapter::Int8Quantize,
            (Precision::Bf16, _) => BackendAdapter::Bf16Cast,
            (Precision::Fp32, Accelerator::OpenVino) => BackendAdapter::GraphRuntimeA,
            (Precision::Fp32, Accelerator::OnnxRuntime) => BackendAdapter::GraphRuntimeB,
            (Precision::Fp32, Accelerator::Jit) => BackendAdapter::JitCompile,
            (Precision::Fp32, Accelerator::None) => BackendAdapter::NoOpTrace,
        };
        Some(adapter)
    }
}

impl fmt::Display for BackendAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendAdapter::NoOpTrace => "trace",
            BackendAdapter::JitCompile => "jit-compile",
            BackendAdapter::GraphRuntimeA => "graph-runtime-a",
            BackendAdapter::GraphRuntimeB => "graph-runtime-b",
            BackendAdapter::Int8Quantize => "int8-quantize",
            BackendAdapter::Bf16Cast => "bf16-cast",
        };
        f.write_str(s)
    }
}

/// Everything a producer needs to build one strategy's artifact.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest<'a> {
    /// Catalog name of the strategy.
    pub name: &'a str,
    pub strategy: &'a Strategy,
    pub adapter: BackendAdapter,
    /// The input the artifact will be traced and benchmarked with.
    pub input_sample: &'a [Tensor],
    /// Training data, for calibration-based quantization.
    pub calibration_data: &'a DataLoader,
    /// Threads the artifact should run with.
    pub thread_count: usize,
    /// How many calibration samples a quantizer should draw: fewer for
    /// slow models.
    pub calibration_sample_size: usize,
}

/// Builds accelerated artifacts.
///
/// Implementations wrap real backends. Errors are recorded against the
/// strategy as `fail to convert`; they never abort the search.
pub trait ModelProducer: Send + Sync {
    fn convert(
        &self,
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<Box<dyn InferenceModel>, ConversionError>;
}

impl<F> ModelProducer for F
where
    F: Fn(&SharedModel, &ConversionRequest<'_>) -> Result<Box<dyn InferenceModel>, ConversionError>
        + Send
        + Sync,
{
    fn convert(
        &self,
        model: &SharedModel,
        request: &ConversionRequest<'_>,
    ) -> Result<Box<dyn InferenceModel>, ConversionError> {
        self(model, request)
    }
}
