// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`InferenceModel`] trait and two small implementations.

use crate::{ModelError, Tensor};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Anything that can run a forward pass.
///
/// The search engine treats the caller's model and every accelerated
/// artifact uniformly through this trait: it never inspects which backend
/// produced an artifact.
pub trait InferenceModel: Send + Sync {
    /// Human-readable name, used in logs and reports.
    fn name(&self) -> &str;

    /// Number of positional inputs `forward` expects.
    ///
    /// Used to cut an input sample out of a training batch: a batch of
    /// `(x, y)` fed to a one-input model yields the sample `(x,)`.
    fn num_inputs(&self) -> usize {
        1
    }

    /// Runs one forward pass.
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor, ModelError>;

    /// Thread count the artifact was built for, if it pins one.
    fn thread_count(&self) -> Option<usize> {
        None
    }
}

/// A model shared between the caller and the search engine.
pub type SharedModel = Arc<dyn InferenceModel>;

impl<M: InferenceModel + ?Sized> InferenceModel for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn num_inputs(&self) -> usize {
        (**self).num_inputs()
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor, ModelError> {
        (**self).forward(inputs)
    }

    fn thread_count(&self) -> Option<usize> {
        (**self).thread_count()
    }
}

impl<M: InferenceModel + ?Sized> InferenceModel for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn num_inputs(&self) -> usize {
        (**self).num_inputs()
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor, ModelError> {
        (**self).forward(inputs)
    }

    fn thread_count(&self) -> Option<usize> {
        (**self).thread_count()
    }
}

// ── LinearModel ────────────────────────────────────────────────

/// A single dense layer `y = x·W + b` with deterministic weights.
///
/// Small enough to rebuild identically in a worker process from its seed,
/// which is how multi-instance serving reconstructs the model on the
/// other side of the process boundary.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    in_features: usize,
    out_features: usize,
    /// `[in_features, out_features]`, row-major.
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearModel {
    /// Builds a layer whose weights are drawn from a fixed-seed LCG in `[-1, 1)`.
    pub fn seeded(name: &str, in_features: usize, out_features: usize, seed: u64) -> Self {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        };
        let weight = (0..in_features * out_features).map(|_| next()).collect();
        let bias = (0..out_features).map(|_| next() * 0.1).collect();
        Self {
            name: name.to_string(),
            in_features,
            out_features,
            weight,
            bias,
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl InferenceModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor, ModelError> {
        let [x] = inputs else {
            return Err(ModelError::InputArity {
                model: self.name.clone(),
                expected: 1,
                actual: inputs.len(),
            });
        };
        if x.shape().last().copied() != Some(self.in_features) {
            return Err(ModelError::Forward {
                model: self.name.clone(),
                detail: format!(
                    "input {x} does not end in {} features",
                    self.in_features
                ),
            });
        }

        let rows: usize = x.shape()[..x.rank() - 1].iter().product();
        let xs = x.as_slice();
        let mut out = vec![0.0f32; rows * self.out_features];
        // Rows are independent and run on the current rayon pool, so the
        // caller's pool size is the effective parallelism.
        out.par_chunks_mut(self.out_features.max(1))
            .enumerate()
            .for_each(|(r, dst)| {
                dst.copy_from_slice(&self.bias);
                let row = &xs[r * self.in_features..(r + 1) * self.in_features];
                for (k, &xv) in row.iter().enumerate() {
                    let w = &self.weight[k * self.out_features..(k + 1) * self.out_features];
                    for (d, &wv) in dst.iter_mut().zip(w) {
                        *d += xv * wv;
                    }
                }
            });

        Tensor::new(vec![rows, self.out_features], out)
    }
}

// ── FnModel ────────────────────────────────────────────────────

type ForwardFn = dyn Fn(&[Tensor]) -> Result<Tensor, ModelError> + Send + Sync;

/// Wraps a closure as a model. Handy for adapters and tests.
pub struct FnModel {
    name: String,
    num_inputs: usize,
    thread_count: Option<usize>,
    forward: Box<ForwardFn>,
}

impl FnModel {
    pub fn new(
        name: &str,
        num_inputs: usize,
        forward: impl Fn(&[Tensor]) -> Result<Tensor, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            num_inputs,
            thread_count: None,
            forward: Box::new(forward),
        }
    }

    /// Records the thread count this model was built for.
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = Some(threads);
        self
    }
}

impl InferenceModel for FnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor, ModelError> {
        (self.forward)(inputs)
    }

    fn thread_count(&self) -> Option<usize> {
        self.thread_count
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("num_inputs", &self.num_inputs)
            .field("thread_count", &self.thread_count)
            .finish()
    }
}
