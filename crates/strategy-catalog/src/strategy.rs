// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Strategy`] descriptor and its dimensions.

use crate::CatalogError;
use std::fmt;
use std::str::FromStr;

/// Numeric precision an artifact runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    Bf16,
    Int8,
}

impl Precision {
    pub const ALL: [Precision; 3] = [Precision::Fp32, Precision::Bf16, Precision::Int8];

    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Bf16 => "bf16",
            Precision::Int8 => "int8",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fp32" => Ok(Precision::Fp32),
            "bf16" => Ok(Precision::Bf16),
            "int8" => Ok(Precision::Int8),
            _ => Err(CatalogError::InvalidName {
                kind: "precision",
                value: s.to_string(),
                expected: "fp32, bf16, int8",
            }),
        }
    }
}

/// Compilation or graph runtime an artifact is produced through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    /// Eager execution.
    None,
    /// Traced / JIT-compiled graph.
    Jit,
    /// Graph runtime A.
    OpenVino,
    /// Graph runtime B.
    OnnxRuntime,
}

impl Accelerator {
    pub const ALL: [Accelerator; 4] = [
        Accelerator::None,
        Accelerator::Jit,
        Accelerator::OpenVino,
        Accelerator::OnnxRuntime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Accelerator::None => "none",
            Accelerator::Jit => "jit",
            Accelerator::OpenVino => "openvino",
            Accelerator::OnnxRuntime => "onnxruntime",
        }
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accelerator {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Accelerator::None),
            "jit" => Ok(Accelerator::Jit),
            "openvino" => Ok(Accelerator::OpenVino),
            "onnxruntime" => Ok(Accelerator::OnnxRuntime),
            _ => Err(CatalogError::InvalidName {
                kind: "accelerator",
                value: s.to_string(),
                expected: "none, jit, openvino, onnxruntime",
            }),
        }
    }
}

/// An optional external component a strategy needs at conversion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Dependency {
    /// Optimised CPU kernel library (the `ipex` flag).
    KernelLibrary,
    /// Post-training quantization toolkit.
    QuantizationToolkit,
    /// Graph runtime A (`openvino`).
    GraphRuntimeA,
    /// Graph runtime B (`onnxruntime`).
    GraphRuntimeB,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dependency::KernelLibrary => "kernel-library",
            Dependency::QuantizationToolkit => "quantization-toolkit",
            Dependency::GraphRuntimeA => "graph-runtime-a",
            Dependency::GraphRuntimeB => "graph-runtime-b",
        };
        f.write_str(s)
    }
}

impl Dependency {
    pub const ALL: [Dependency; 4] = [
        Dependency::KernelLibrary,
        Dependency::QuantizationToolkit,
        Dependency::GraphRuntimeA,
        Dependency::GraphRuntimeB,
    ];
}

impl FromStr for Dependency {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dependency::ALL
            .into_iter()
            .find(|d| d.to_string() == s.trim())
            .ok_or_else(|| CatalogError::InvalidName {
                kind: "dependency",
                value: s.to_string(),
                expected: "kernel-library, quantization-toolkit, graph-runtime-a, graph-runtime-b",
            })
    }
}

/// One point in the search space. Immutable once registered.
///
/// # Examples
/// ```
/// use strategy_catalog::{Accelerator, Dependency, Precision, Strategy};
///
/// let s = Strategy::new(Precision::Int8, Accelerator::OnnxRuntime).with_method("qlinear");
/// assert_eq!(
///     s.dependencies(),
///     vec![Dependency::QuantizationToolkit, Dependency::GraphRuntimeB]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Strategy {
    pub precision: Precision,
    pub accelerator: Accelerator,
    /// Use the optimised kernel library.
    pub ipex: bool,
    /// Use channels-last memory layout.
    pub channels_last: bool,
    /// Backend-specific sub-method (`qlinear`, `integer`, `ipex`, ...).
    pub method: Option<String>,
}

impl Strategy {
    pub fn new(precision: Precision, accelerator: Accelerator) -> Self {
        Self {
            precision,
            accelerator,
            ipex: false,
            channels_last: false,
            method: None,
        }
    }

    /// The unmodified model: fp32, eager, no flags.
    pub fn baseline() -> Self {
        Self::new(Precision::Fp32, Accelerator::None)
    }

    pub fn with_ipex(mut self) -> Self {
        self.ipex = true;
        self
    }

    pub fn with_channels_last(mut self) -> Self {
        self.channels_last = true;
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// Returns `true` when the strategy changes nothing about the model.
    pub fn is_baseline(&self) -> bool {
        self.precision == Precision::Fp32
            && self.accelerator == Accelerator::None
            && !self.ipex
            && !self.channels_last
    }

    /// Components that must be loadable for this strategy to run.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = Vec::new();
        if self.ipex {
            deps.push(Dependency::KernelLibrary);
        }
        // Graph runtime A ships its own int8 tooling.
        if self.precision == Precision::Int8 && self.accelerator != Accelerator::OpenVino {
            deps.push(Dependency::QuantizationToolkit);
        }
        match self.accelerator {
            Accelerator::OpenVino => deps.push(Dependency::GraphRuntimeA),
            Accelerator::OnnxRuntime => deps.push(Dependency::GraphRuntimeB),
            Accelerator::None | Accelerator::Jit => {}
        }
        deps
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.precision, self.accelerator)?;
        if self.ipex {
            f.write_str("+ipex")?;
        }
        if self.channels_last {
            f.write_str("+channels_last")?;
        }
        if let Some(m) = &self.method {
            write!(f, "({m})")?;
        }
        Ok(())
    }
}
