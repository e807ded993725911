// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Training and validation data.
//!
//! Data reaches the search in one of three forms: a loader of batches, a
//! single tensor, or a tuple of tensors. The two non-loader forms are
//! normalised into a one-batch [`DataLoader`] so everything downstream
//! (calibration, accuracy metrics) sees a single shape.
//!
//! A batch is a tuple of tensors. Its first `num_inputs` entries feed the
//! model; when the tuple is longer, its last entry is the target.

use crate::{ModelError, Tensor};

/// One item produced by a [`DataLoader`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Batch {
    tensors: Vec<Tensor>,
}

impl Batch {
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self { tensors }
    }

    /// A batch of `inputs` followed by a `target`.
    pub fn with_target(mut inputs: Vec<Tensor>, target: Tensor) -> Self {
        inputs.push(target);
        Self { tensors: inputs }
    }

    /// All tensors of the tuple.
    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    /// The leading tensors a model with `num_inputs` inputs consumes.
    pub fn inputs(&self, num_inputs: usize) -> &[Tensor] {
        &self.tensors[..num_inputs.min(self.tensors.len())]
    }

    /// The target, present only when the tuple is longer than the model's inputs.
    pub fn target(&self, num_inputs: usize) -> Option<&Tensor> {
        if self.tensors.len() > num_inputs {
            self.tensors.last()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// An ordered, replayable sequence of batches.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataLoader {
    batches: Vec<Batch>,
}

impl DataLoader {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }

    pub fn first(&self) -> Option<&Batch> {
        self.batches.first()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns `true` when every batch carries a target for a model with
    /// `num_inputs` inputs.
    pub fn has_targets(&self, num_inputs: usize) -> bool {
        !self.batches.is_empty() && self.batches.iter().all(|b| b.target(num_inputs).is_some())
    }

    /// A loader holding at most the first `n` batches.
    pub fn take(&self, n: usize) -> Self {
        Self {
            batches: self.batches.iter().take(n).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DataLoader {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

/// Data in any of the accepted forms.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingData {
    /// A loader of batches.
    Loader(DataLoader),
    /// A single input tensor.
    Tensor(Tensor),
    /// A tuple such as `(x, y)` or `(x1, x2)`.
    Tuple(Vec<Tensor>),
}

impl TrainingData {
    /// Cuts an input sample for a model with `num_inputs` inputs.
    ///
    /// - loader: the first `num_inputs` tensors of the first batch;
    /// - tuple: its first `num_inputs` tensors;
    /// - single tensor: the tensor itself.
    pub fn input_sample(&self, num_inputs: usize) -> Result<Vec<Tensor>, ModelError> {
        match self {
            TrainingData::Loader(loader) => {
                let batch = loader.first().ok_or(ModelError::EmptyData)?;
                if batch.is_empty() {
                    return Err(ModelError::EmptyData);
                }
                Ok(batch.inputs(num_inputs).to_vec())
            }
            TrainingData::Tuple(items) => {
                if items.is_empty() {
                    return Err(ModelError::EmptyData);
                }
                Ok(items.iter().take(num_inputs).cloned().collect())
            }
            TrainingData::Tensor(t) => Ok(vec![t.clone()]),
        }
    }

    /// Normalises the data into a loader; non-loader forms become one batch.
    pub fn into_loader(self) -> DataLoader {
        match self {
            TrainingData::Loader(loader) => loader,
            TrainingData::Tensor(t) => DataLoader::new(vec![Batch::new(vec![t])]),
            TrainingData::Tuple(items) => DataLoader::new(vec![Batch::new(items)]),
        }
    }
}

impl From<DataLoader> for TrainingData {
    fn from(loader: DataLoader) -> Self {
        TrainingData::Loader(loader)
    }
}

impl From<Tensor> for TrainingData {
    fn from(t: Tensor) -> Self {
        TrainingData::Tensor(t)
    }
}

impl From<Vec<Tensor>> for TrainingData {
    fn from(items: Vec<Tensor>) -> Self {
        TrainingData::Tuple(items)
    }
}
