// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Search configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! direction = "max"
//! search_mode = "default"
//! latency_sample_num = 100
//! thread_num = 4
//! accelerators = ["openvino", "onnxruntime"]
//! precisions = ["int8"]
//! use_ipex = false
//! excludes = ["onnxruntime_int8_integer"]
//! report_path = "./search-report.json"
//!
//! [harness]
//! wall_budget_secs = 10.0
//! early_stop_factor = 4.0
//! ```

use crate::SearchError;
use bench_harness::HarnessConfig;
use std::path::{Path, PathBuf};

/// Default number of timed samples per strategy.
pub const DEFAULT_LATENCY_SAMPLE_NUM: usize = 100;

/// Configuration for a search run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchConfig {
    /// `"min"` or `"max"`: which way the accuracy metric improves.
    #[serde(default = "default_direction")]
    pub direction: String,
    /// `"default"`, `"all"` or `"grid"`.
    #[serde(default = "default_search_mode")]
    pub search_mode: String,
    /// Timed samples per strategy.
    #[serde(default = "default_latency_sample_num")]
    pub latency_sample_num: usize,
    /// Threads each artifact is built and benchmarked with (defaults to the
    /// current thread budget).
    pub thread_num: Option<usize>,
    /// Accelerator filter: `none`, `jit`, `openvino`, `onnxruntime`.
    pub accelerators: Option<Vec<String>>,
    /// Precision filter: `fp32`, `bf16`, `int8`.
    pub precisions: Option<Vec<String>>,
    /// Kernel-library filter.
    pub use_ipex: Option<bool>,
    /// Only search these strategies (plus `original`).
    pub includes: Option<Vec<String>>,
    /// Never search these strategies.
    pub excludes: Option<Vec<String>>,
    /// Where to write the JSON report summary, if anywhere.
    pub report_path: Option<PathBuf>,
    /// Measurement-loop constants.
    #[serde(default)]
    pub harness: HarnessConfig,
}

fn default_direction() -> String {
    "max".to_string()
}

fn default_search_mode() -> String {
    "default".to_string()
}

fn default_latency_sample_num() -> usize {
    DEFAULT_LATENCY_SAMPLE_NUM
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            direction: default_direction(),
            search_mode: default_search_mode(),
            latency_sample_num: DEFAULT_LATENCY_SAMPLE_NUM,
            thread_num: None,
            accelerators: None,
            precisions: None,
            use_ipex: None,
            includes: None,
            excludes: None,
            report_path: None,
            harness: HarnessConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SearchError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| SearchError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, SearchError> {
        toml::to_string_pretty(self)
            .map_err(|e| SearchError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks values that parsing alone cannot.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.latency_sample_num == 0 {
            return Err(SearchError::Config(
                "latency_sample_num must be at least 1".to_string(),
            ));
        }
        if self.thread_num == Some(0) {
            return Err(SearchError::Config("thread_num must be at least 1".to_string()));
        }
        self.harness
            .validate()
            .map_err(|e| SearchError::Config(format!("[harness] {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let c = SearchConfig::from_toml("").unwrap();
        assert_eq!(c, SearchConfig::default());
        assert_eq!(c.latency_sample_num, 100);
        assert_eq!(c.direction, "max");
    }

    #[test]
    fn test_full_toml() {
        let c = SearchConfig::from_toml(
            r#"
direction = "min"
search_mode = "all"
latency_sample_num = 20
thread_num = 2
precisions = ["int8"]
use_ipex = false
excludes = ["int8_ipex"]
report_path = "out.json"

[harness]
wall_budget_secs = 2.5
"#,
        )
        .unwrap();
        assert_eq!(c.direction, "min");
        assert_eq!(c.precisions, Some(vec!["int8".to_string()]));
        assert_eq!(c.harness.wall_budget_secs, 2.5);
        assert_eq!(c.harness.min_samples, 10);
        assert_eq!(c.report_path, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_toml_round_trip() {
        let c = SearchConfig {
            accelerators: Some(vec!["jit".into()]),
            thread_num: Some(4),
            ..Default::default()
        };
        let back = SearchConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_invalid_values() {
        assert!(SearchConfig::from_toml("latency_sample_num = 0").is_err());
        assert!(SearchConfig::from_toml("thread_num = 0").is_err());
        assert!(SearchConfig::from_toml("[harness]\ntrim_ratio = 0.7").is_err());
        assert!(SearchConfig::from_toml("direction = [").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(&path, "search_mode = \"grid\"\n").unwrap();
        let c = SearchConfig::from_file(&path).unwrap();
        assert_eq!(c.search_mode, "grid");
        assert!(SearchConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
