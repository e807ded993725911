// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dependency-aware narrowing of a catalog.

use crate::catalog::ORIGINAL;
use crate::{CatalogError, Dependency, Strategy, StrategyCatalog};
use std::collections::BTreeSet;

/// Answers whether an optional component can be loaded in this process.
pub trait DependencyProbe: Send + Sync {
    fn is_available(&self, dependency: Dependency) -> bool;
}

/// A probe backed by a fixed set of available dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FixedProbe {
    available: BTreeSet<Dependency>,
}

impl FixedProbe {
    /// Nothing optional is installed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional component is installed.
    pub fn all() -> Self {
        Self::with([
            Dependency::KernelLibrary,
            Dependency::QuantizationToolkit,
            Dependency::GraphRuntimeA,
            Dependency::GraphRuntimeB,
        ])
    }

    pub fn with(deps: impl IntoIterator<Item = Dependency>) -> Self {
        Self {
            available: deps.into_iter().collect(),
        }
    }
}

impl DependencyProbe for FixedProbe {
    fn is_available(&self, dependency: Dependency) -> bool {
        self.available.contains(&dependency)
    }
}

/// A strategy selected for a search, with its dependency verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub strategy: Strategy,
    pub available: bool,
}

/// Ordered result of [`available_subset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailableSubset {
    candidates: Vec<Candidate>,
}

impl AvailableSubset {
    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> IntoIterator for &'a AvailableSubset {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Narrows `catalog` by `includes` / `excludes` and marks each survivor
/// available or not according to `probe`.
///
/// - `includes`: only these names are searched. [`ORIGINAL`] is always
///   added. Names missing from `catalog` are taken from `full` and appended;
///   names missing from both are [`CatalogError::UnknownStrategy`].
/// - `excludes`: these names are dropped. [`ORIGINAL`] cannot be excluded.
pub fn available_subset(
    catalog: &StrategyCatalog,
    full: &StrategyCatalog,
    probe: &dyn DependencyProbe,
    includes: Option<&[String]>,
    excludes: Option<&[String]>,
) -> Result<AvailableSubset, CatalogError> {
    let mut working = catalog.clone();

    let include_set: Option<BTreeSet<&str>> = match includes {
        Some(names) => {
            let mut set: BTreeSet<&str> = names.iter().map(String::as_str).collect();
            set.insert(ORIGINAL);
            for &name in &set {
                if working.contains(name) {
                    continue;
                }
                let strategy = full.get(name).ok_or_else(|| CatalogError::UnknownStrategy {
                    name: name.to_string(),
                })?;
                working.register(name, strategy.clone())?;
            }
            Some(set)
        }
        None => None,
    };

    let exclude_set: BTreeSet<&str> = excludes
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .filter(|&n| n != ORIGINAL)
        .collect();

    let mut candidates = Vec::new();
    for (name, strategy) in working.iter() {
        if include_set.as_ref().is_some_and(|set| !set.contains(name)) {
            continue;
        }
        if exclude_set.contains(name) {
            continue;
        }
        let missing: Vec<Dependency> = strategy
            .dependencies()
            .into_iter()
            .filter(|&d| !probe.is_available(d))
            .collect();
        if !missing.is_empty() {
            tracing::debug!("strategy '{name}' lacks {missing:?}");
        }
        candidates.push(Candidate {
            name: name.to_string(),
            strategy: strategy.clone(),
            available: missing.is_empty(),
        });
    }

    Ok(AvailableSubset { candidates })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_deps_only_plain_strategies_available() {
        let full = StrategyCatalog::full();
        let subset = available_subset(&full, &full, &FixedProbe::none(), None, None).unwrap();
        assert_eq!(subset.len(), 23);
        assert!(subset.get("original").unwrap().available);
        assert!(subset.get("bf16").unwrap().available);
        assert!(subset.get("jit_fp32").unwrap().available);
        assert!(!subset.get("fp32_ipex").unwrap().available);
        assert!(!subset.get("int8").unwrap().available);
        assert!(!subset.get("openvino_int8").unwrap().available);
    }

    #[test]
    fn test_includes_force_original_and_widen() {
        let default = StrategyCatalog::default_subset();
        let full = StrategyCatalog::full();
        let includes = names(&["jit_fp32"]);
        let subset =
            available_subset(&default, &full, &FixedProbe::all(), Some(&includes), None).unwrap();
        assert_eq!(subset.names().collect::<Vec<_>>(), vec!["original", "jit_fp32"]);
    }

    #[test]
    fn test_excludes_cannot_drop_original() {
        let full = StrategyCatalog::full();
        let excludes = names(&["original", "bf16"]);
        let subset =
            available_subset(&full, &full, &FixedProbe::all(), None, Some(&excludes)).unwrap();
        assert!(subset.get("original").is_some());
        assert!(subset.get("bf16").is_none());
        assert_eq!(subset.len(), 22);
    }

    #[test]
    fn test_unknown_include_is_error() {
        let full = StrategyCatalog::full();
        let includes = names(&["warp_drive"]);
        let err = available_subset(&full, &full, &FixedProbe::all(), Some(&includes), None)
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownStrategy {
                name: "warp_drive".into()
            }
        );
    }

    #[test]
    fn test_order_follows_catalog() {
        let full = StrategyCatalog::full();
        let includes = names(&["onnxruntime_fp32", "bf16"]);
        let subset =
            available_subset(&full, &full, &FixedProbe::none(), Some(&includes), None).unwrap();
        assert_eq!(
            subset.names().collect::<Vec<_>>(),
            vec!["original", "bf16", "onnxruntime_fp32"]
        );
        assert!(!subset.get("onnxruntime_fp32").unwrap().available);
    }
}
