// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Harness tuning constants.
//!
//! # TOML Format
//! ```toml
//! wall_budget_secs = 10.0
//! min_samples = 10
//! early_stop_factor = 4.0
//! early_stop_min_samples = 3
//! trim_ratio = 0.1
//! ```

use std::time::Duration;

/// Constants controlling when [`BenchmarkHarness`](crate::BenchmarkHarness)
/// stops sampling and how it aggregates samples.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Wall-clock budget for the timed loop, in seconds.
    pub wall_budget_secs: f64,
    /// Samples always taken before the wall-clock budget can cut the loop.
    pub min_samples: usize,
    /// An artifact slower than `early_stop_factor × baseline` is abandoned.
    pub early_stop_factor: f64,
    /// Sample count at which the early-stop check runs.
    pub early_stop_min_samples: usize,
    /// Fraction of samples dropped from each end before averaging.
    pub trim_ratio: f64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wall_budget_secs: 10.0,
            min_samples: 10,
            early_stop_factor: 4.0,
            early_stop_min_samples: 3,
            trim_ratio: 0.1,
        }
    }
}

impl HarnessConfig {
    pub fn wall_budget(&self) -> Duration {
        Duration::from_secs_f64(self.wall_budget_secs.max(0.0))
    }

    /// Checks that every constant is in range.
    pub fn validate(&self) -> Result<(), String> {
        if !self.wall_budget_secs.is_finite() || self.wall_budget_secs <= 0.0 {
            return Err(format!(
                "wall_budget_secs must be positive, got {}",
                self.wall_budget_secs
            ));
        }
        if !(0.0..0.5).contains(&self.trim_ratio) {
            return Err(format!(
                "trim_ratio must be in [0, 0.5), got {}",
                self.trim_ratio
            ));
        }
        if !self.early_stop_factor.is_finite() || self.early_stop_factor < 1.0 {
            return Err(format!(
                "early_stop_factor must be at least 1, got {}",
                self.early_stop_factor
            ));
        }
        if self.early_stop_min_samples == 0 {
            return Err("early_stop_min_samples must be at least 1".to_string());
        }
        Ok(())
    }
}
