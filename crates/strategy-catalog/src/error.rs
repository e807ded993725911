// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the strategy catalog.

/// Errors that can occur while building or querying a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// A strategy with this name is already registered.
    #[error("strategy '{name}' is already registered")]
    DuplicateStrategy { name: String },

    /// A name given in `includes` is not in the full catalog.
    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    /// A precision, accelerator or strategy name could not be parsed.
    #[error("invalid {kind} '{value}': expected one of {expected}")]
    InvalidName {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}
