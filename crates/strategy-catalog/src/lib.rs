// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # strategy-catalog
//!
//! The search space of inference acceleration strategies.
//!
//! A [`Strategy`] is one combination of precision, accelerator and flags.
//! Strategies are kept in an ordered, named [`StrategyCatalog`]; the order is
//! the order in which a search tries them.
//!
//! # Built-in groupings
//!
//! | Catalog | Entries | Use |
//! |---|---|---|
//! | [`StrategyCatalog::full`] | 23 | `all` and `grid` searches |
//! | [`StrategyCatalog::default_subset`] | 11 | `default` searches |
//!
//! # Example
//! ```
//! use strategy_catalog::{available_subset, FixedProbe, Precision, StrategyCatalog, StrategyFilter};
//!
//! let full = StrategyCatalog::full();
//! let int8 = full.filter(&StrategyFilter {
//!     precisions: Some(vec![Precision::Int8]),
//!     ..Default::default()
//! });
//! let subset = available_subset(&int8, &full, &FixedProbe::none(), None, None).unwrap();
//! // "original" always survives and needs nothing.
//! assert!(subset.get("original").unwrap().available);
//! assert!(!subset.get("int8").unwrap().available);
//! ```

mod availability;
pub mod catalog;
mod error;
mod strategy;

pub use availability::{available_subset, AvailableSubset, Candidate, DependencyProbe, FixedProbe};
pub use catalog::{StrategyCatalog, StrategyFilter, DEFAULT_SUBSET, ORIGINAL};
pub use error::CatalogError;
pub use strategy::{Accelerator, Dependency, Precision, Strategy};
