// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the search engine.

use crate::metric::MetricSignature;
use model_core::ModelError;
use strategy_catalog::{CatalogError, Dependency};

/// Errors that abort a whole search or a query on its report.
///
/// Failures of a single strategy never surface here; they are recorded in
/// the strategy's [`OutcomeRecord`](crate::OutcomeRecord).
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A request argument is malformed.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The model cannot run the input sample derived from the training data.
    #[error("training data is incompatible with the model input: {source}")]
    IncompatibleInput {
        #[source]
        source: ModelError,
    },

    /// The metric does not work with the model and validation data.
    #[error("metric is incompatible with the validation data: {source}")]
    MetricProtocol {
        #[source]
        source: MetricError,
    },

    /// The catalog rejected a filter, include or exclude.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// No record satisfies the selection criteria.
    #[error("no candidate found: {0}")]
    NoCandidate(String),

    /// Failed to read or write a file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to (de)serialise a report.
    #[error("report serialisation error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors a [`ModelProducer`](crate::ModelProducer) reports for one strategy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// A component the strategy needs could not be loaded.
    #[error("missing dependency: {0}")]
    MissingDependency(Dependency),

    /// The producer has no way to build this strategy.
    #[error("strategy '{strategy}' is not supported: {detail}")]
    Unsupported { strategy: String, detail: String },

    /// Conversion was attempted and failed.
    #[error("conversion to '{strategy}' failed: {detail}")]
    Failed { strategy: String, detail: String },

    /// The model failed while being traced or calibrated.
    #[error("model error during conversion: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised while computing accuracy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MetricError {
    /// The metric's shape does not fit the available data.
    #[error("{signature} metric cannot be evaluated: {detail}")]
    Protocol {
        signature: MetricSignature,
        detail: String,
    },

    /// The metric itself failed.
    #[error("metric evaluation failed: {0}")]
    Evaluation(String),

    /// A forward pass failed while collecting predictions.
    #[error("forward pass failed during evaluation: {0}")]
    Model(#[from] ModelError),
}
