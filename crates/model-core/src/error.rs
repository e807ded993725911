// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensors, models and datasets.

/// Errors raised by tensors and forward passes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// The data buffer does not match the element count of the shape.
    #[error("shape {shape:?} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A forward pass received the wrong number of positional inputs.
    #[error("model '{model}' expects {expected} inputs, got {actual}")]
    InputArity {
        model: String,
        expected: usize,
        actual: usize,
    },

    /// The forward computation itself failed.
    #[error("forward pass of '{model}' failed: {detail}")]
    Forward { model: String, detail: String },

    /// A dataset had nothing to draw a sample from.
    #[error("dataset is empty")]
    EmptyData,
}
