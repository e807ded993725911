// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named, ordered strategy collections.

use crate::{Accelerator, CatalogError, Precision, Strategy};

/// Name of the strategy that runs the caller's model unchanged.
pub const ORIGINAL: &str = "original";

/// Names of the curated default subset, in search order.
pub const DEFAULT_SUBSET: [&str; 11] = [
    "original",
    "bf16",
    "int8",
    "jit_fp32_ipex",
    "jit_fp32_ipex_channels_last",
    "jit_bf16_ipex",
    "jit_bf16_ipex_channels_last",
    "openvino_fp32",
    "openvino_int8",
    "onnxruntime_fp32",
    "onnxruntime_int8_qlinear",
];

/// Constraint set for [`StrategyCatalog::filter`]. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StrategyFilter {
    pub precisions: Option<Vec<Precision>>,
    pub accelerators: Option<Vec<Accelerator>>,
    pub kernel_library: Option<bool>,
}

impl StrategyFilter {
    /// Returns `true` when no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        self.precisions.is_none() && self.accelerators.is_none() && self.kernel_library.is_none()
    }

    pub fn matches(&self, strategy: &Strategy) -> bool {
        if let Some(ps) = &self.precisions {
            if !ps.contains(&strategy.precision) {
                return false;
            }
        }
        if let Some(accs) = &self.accelerators {
            if !accs.contains(&strategy.accelerator) {
                return false;
            }
        }
        if let Some(ipex) = self.kernel_library {
            if strategy.ipex != ipex {
                return false;
            }
        }
        true
    }
}

/// An insertion-ordered mapping from strategy name to [`Strategy`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct StrategyCatalog {
    entries: Vec<(String, Strategy)>,
}

impl StrategyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strategy under `name`.
    pub fn register(&mut self, name: &str, strategy: Strategy) -> Result<(), CatalogError> {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidName {
                kind: "strategy name",
                value: name.to_string(),
                expected: "a non-empty name",
            });
        }
        if self.contains(name) {
            return Err(CatalogError::DuplicateStrategy {
                name: name.to_string(),
            });
        }
        self.entries.push((name.to_string(), strategy));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Strategy names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Strategy)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sub-catalog of the strategies matching `filter`, in insertion order.
    /// [`ORIGINAL`] is always kept, first, when present.
    pub fn filter(&self, filter: &StrategyFilter) -> Self {
        let mut out = Self::new();
        if let Some(orig) = self.get(ORIGINAL) {
            out.entries.push((ORIGINAL.to_string(), orig.clone()));
        }
        for (name, strategy) in &self.entries {
            if name != ORIGINAL && filter.matches(strategy) {
                out.entries.push((name.clone(), strategy.clone()));
            }
        }
        tracing::debug!("filter {:?} kept {} of {} strategies", filter, out.len(), self.len());
        out
    }

    /// Sub-catalog of the named strategies, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Self, CatalogError> {
        let mut out = Self::new();
        for &name in names {
            let strategy = self.get(name).ok_or_else(|| CatalogError::UnknownStrategy {
                name: name.to_string(),
            })?;
            out.register(name, strategy.clone())?;
        }
        Ok(out)
    }

    /// Sub-catalog of those `names` present here, in the order given.
    /// Absent names are skipped.
    pub fn subset(&self, names: &[&str]) -> Self {
        let mut out = Self::new();
        for &name in names {
            if out.contains(name) {
                continue;
            }
            if let Some(strategy) = self.get(name) {
                out.entries.push((name.to_string(), strategy.clone()));
            }
        }
        out
    }

    /// Every built-in strategy, in search order.
    pub fn full() -> Self {
        use Accelerator::{Jit, None as Eager, OnnxRuntime, OpenVino};
        use Precision::{Bf16, Fp32, Int8};

        let s = Strategy::new;
        let entries: Vec<(&str, Strategy)> = vec![
            (ORIGINAL, Strategy::baseline()),
            ("fp32_channels_last", s(Fp32, Eager).with_channels_last()),
            ("fp32_ipex", s(Fp32, Eager).with_ipex()),
            (
                "fp32_ipex_channels_last",
                s(Fp32, Eager).with_ipex().with_channels_last(),
            ),
            ("bf16", s(Bf16, Eager)),
            ("bf16_channels_last", s(Bf16, Eager).with_channels_last()),
            ("bf16_ipex", s(Bf16, Eager).with_ipex()),
            (
                "bf16_ipex_channels_last",
                s(Bf16, Eager).with_ipex().with_channels_last(),
            ),
            ("int8", s(Int8, Eager)),
            ("int8_ipex", s(Int8, Eager).with_ipex().with_method("ipex")),
            ("jit_fp32", s(Fp32, Jit)),
            ("jit_fp32_channels_last", s(Fp32, Jit).with_channels_last()),
            ("jit_bf16", s(Bf16, Jit)),
            ("jit_bf16_channels_last", s(Bf16, Jit).with_channels_last()),
            ("jit_fp32_ipex", s(Fp32, Jit).with_ipex()),
            (
                "jit_fp32_ipex_channels_last",
                s(Fp32, Jit).with_ipex().with_channels_last(),
            ),
            ("jit_bf16_ipex", s(Bf16, Jit).with_ipex()),
            (
                "jit_bf16_ipex_channels_last",
                s(Bf16, Jit).with_ipex().with_channels_last(),
            ),
            ("openvino_fp32", s(Fp32, OpenVino)),
            ("openvino_int8", s(Int8, OpenVino)),
            ("onnxruntime_fp32", s(Fp32, OnnxRuntime)),
            (
                "onnxruntime_int8_qlinear",
                s(Int8, OnnxRuntime).with_method("qlinear"),
            ),
            (
                "onnxruntime_int8_integer",
                s(Int8, OnnxRuntime).with_method("integer"),
            ),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(n, s)| (n.to_string(), s))
                .collect(),
        }
    }

    /// The curated subset searched by default.
    pub fn default_subset() -> Self {
        Self::full().subset(&DEFAULT_SUBSET)
    }
}

impl<'a> IntoIterator for &'a StrategyCatalog {
    type Item = &'a (String, Strategy);
    type IntoIter = std::slice::Iter<'a, (String, Strategy)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
