// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-core
//!
//! The shared vocabulary of the workspace:
//!
//! - [`Tensor`]: a row-major `f32` buffer with a shape. Serialisable, since
//!   tensors cross the process boundary in multi-instance serving.
//! - [`InferenceModel`]: anything with a forward pass. Both the caller's
//!   original model and every artifact produced by an acceleration backend
//!   implement it.
//! - [`TrainingData`], [`DataLoader`], [`Batch`]: the data a search is
//!   driven with, and the rules for cutting an input sample out of it.
//!
//! # Example
//! ```
//! use model_core::{InferenceModel, LinearModel, Tensor};
//!
//! let model = LinearModel::seeded("probe", 4, 2, 7);
//! let out = model.forward(&[Tensor::zeros(vec![1, 4])]).unwrap();
//! assert_eq!(out.shape(), &[1, 2]);
//! ```

mod data;
mod error;
mod model;
mod tensor;

pub use data::{Batch, DataLoader, TrainingData};
pub use error::ModelError;
pub use model::{FnModel, InferenceModel, LinearModel, SharedModel};
pub use tensor::Tensor;
