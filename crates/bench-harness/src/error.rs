// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for latency measurement.

use model_core::ModelError;

/// Errors that can occur while measuring a callable.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A sample budget of zero was requested.
    #[error("sample budget must be at least 1")]
    EmptyBudget,

    /// The measured callable failed.
    #[error("forward pass failed: {0}")]
    Forward(#[from] ModelError),

    /// The compute pool for a thread count could not be started.
    #[error("cannot start a {threads}-thread compute pool: {detail}")]
    ThreadPool { threads: usize, detail: String },
}
