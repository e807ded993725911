// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-strategy results.

use bench_harness::LatencyStats;
use model_core::InferenceModel;
use std::fmt;
use std::time::Duration;
use strategy_catalog::Strategy;

/// How a strategy's trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    #[serde(rename = "successful")]
    Successful,
    #[serde(rename = "lack dependency")]
    LackDependency,
    #[serde(rename = "fail to convert")]
    FailToConvert,
    #[serde(rename = "fail to forward")]
    FailToForward,
    #[serde(rename = "early stopped")]
    EarlyStopped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Successful => "successful",
            Status::LackDependency => "lack dependency",
            Status::FailToConvert => "fail to convert",
            Status::FailToForward => "fail to forward",
            Status::EarlyStopped => "early stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accuracy figure, or the marker for fp32 artifacts whose accuracy is
/// taken to equal the original's.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    Value(f64),
    NotRecomputed,
}

impl Accuracy {
    pub fn value(&self) -> Option<f64> {
        match self {
            Accuracy::Value(v) => Some(*v),
            Accuracy::NotRecomputed => None,
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accuracy::Value(v) => write!(f, "{v:.3}"),
            Accuracy::NotRecomputed => f.write_str("not recomputed"),
        }
    }
}

/// The result of trying one strategy.
pub struct OutcomeRecord {
    pub strategy: Strategy,
    pub status: Status,
    /// Measured latency. Present for `successful` and `early stopped`.
    pub latency: Option<Duration>,
    pub stats: Option<LatencyStats>,
    pub accuracy: Option<Accuracy>,
    /// The artifact. Present for `successful` and `early stopped`.
    pub artifact: Option<Box<dyn InferenceModel>>,
    /// What went wrong, for failed statuses or a failed metric.
    pub error: Option<String>,
}

impl OutcomeRecord {
    pub(crate) fn new(strategy: Strategy, status: Status) -> Self {
        Self {
            strategy,
            status,
            latency: None,
            stats: None,
            accuracy: None,
            artifact: None,
            error: None,
        }
    }

    pub(crate) fn failed(strategy: Strategy, status: Status, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(strategy, status)
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == Status::Successful
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(bench_harness::ms)
    }

    pub fn artifact(&self) -> Option<&dyn InferenceModel> {
        self.artifact.as_deref()
    }
}

impl fmt::Debug for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeRecord")
            .field("strategy", &self.strategy)
            .field("status", &self.status)
            .field("latency", &self.latency)
            .field("accuracy", &self.accuracy)
            .field("artifact", &self.artifact.as_ref().map(|a| a.name().to_string()))
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(Status::LackDependency.to_string(), "lack dependency");
        assert_eq!(
            serde_json::to_string(&Status::EarlyStopped).unwrap(),
            "\"early stopped\""
        );
    }

    #[test]
    fn test_accuracy_display() {
        assert_eq!(Accuracy::Value(0.91234).to_string(), "0.912");
        assert_eq!(Accuracy::NotRecomputed.to_string(), "not recomputed");
        assert_eq!(Accuracy::NotRecomputed.value(), None);
    }

    #[test]
    fn test_failed_record_has_no_artifact() {
        let r = OutcomeRecord::failed(
            Strategy::baseline(),
            Status::FailToConvert,
            "boom".into(),
        );
        assert!(r.artifact().is_none());
        assert!(!r.is_successful());
        assert_eq!(r.error.as_deref(), Some("boom"));
    }
}
