// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The search report: every record, a ranking, and best-artifact selection.

use crate::outcome::{Accuracy, OutcomeRecord, Status};
use crate::{Direction, SearchError};
use model_core::InferenceModel;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use strategy_catalog::{Accelerator, Precision, Strategy, ORIGINAL};

/// How far accuracy may fall below `original` for a candidate to qualify.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyCriterion {
    /// Maximum drop as a fraction of the original's accuracy (0.05 = 5%).
    Relative(f64),
    /// Maximum drop in metric units.
    Absolute(f64),
}

impl AccuracyCriterion {
    fn admits(&self, direction: Direction, reference: f64, candidate: f64) -> bool {
        let drop = direction.drop_from(reference, candidate);
        match *self {
            AccuracyCriterion::Absolute(max) => drop <= max,
            AccuracyCriterion::Relative(max) => {
                if reference == 0.0 {
                    drop <= 0.0
                } else {
                    drop / reference.abs() <= max
                }
            }
        }
    }
}

/// Constraints for [`SearchReport::best`]. All default to "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionCriteria {
    pub accelerator: Option<Accelerator>,
    pub precision: Option<Precision>,
    pub kernel_library: Option<bool>,
    pub accuracy: Option<AccuracyCriterion>,
}

impl SelectionCriteria {
    fn has_limit(&self) -> bool {
        self.accelerator.is_some() || self.precision.is_some() || self.kernel_library.is_some()
    }

    fn matches(&self, strategy: &Strategy) -> bool {
        self.accelerator.map_or(true, |a| strategy.accelerator == a)
            && self.precision.map_or(true, |p| strategy.precision == p)
            && self.kernel_library.map_or(true, |k| strategy.ipex == k)
    }
}

/// The artifact chosen by [`SearchReport::best`].
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub name: &'a str,
    pub record: &'a OutcomeRecord,
}

impl<'a> Selection<'a> {
    pub fn artifact(&self) -> Option<&'a dyn InferenceModel> {
        self.record.artifact()
    }
}

/// Result of a search.
#[derive(Debug)]
pub struct SearchReport {
    records: Vec<(String, OutcomeRecord)>,
    direction: Direction,
    accuracy_tracked: bool,
    elapsed: Duration,
}

impl SearchReport {
    pub(crate) fn new(
        records: Vec<(String, OutcomeRecord)>,
        direction: Direction,
        accuracy_tracked: bool,
        elapsed: Duration,
    ) -> Self {
        Self {
            records,
            direction,
            accuracy_tracked,
            elapsed,
        }
    }

    /// Records in search order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &OutcomeRecord)> {
        self.records.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn get(&self, name: &str) -> Option<&OutcomeRecord> {
        self.records
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Removes and returns a record, handing its artifact to the caller.
    pub fn take(&mut self, name: &str) -> Option<OutcomeRecord> {
        let idx = self.records.iter().position(|(n, _)| n == name)?;
        Some(self.records.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn accuracy_tracked(&self) -> bool {
        self.accuracy_tracked
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Successful records, fastest first.
    pub fn ranked(&self) -> Vec<(&str, &OutcomeRecord)> {
        let mut ok: Vec<_> = self
            .records()
            .filter(|(_, r)| r.is_successful() && r.latency.is_some())
            .collect();
        ok.sort_by_key(|(_, r)| r.latency);
        ok
    }

    /// The fastest successful artifact satisfying `criteria`.
    ///
    /// `original` is the fallback when no constraint on accelerator,
    /// precision or kernel library is given. Accuracy is compared against
    /// `original`; `not recomputed` counts as equal to it.
    ///
    /// # Errors
    /// - [`SearchError::InputValidation`] for an accuracy criterion on a
    ///   search that did not track accuracy.
    /// - [`SearchError::NoCandidate`] when nothing qualifies.
    pub fn best(&self, criteria: &SelectionCriteria) -> Result<Selection<'_>, SearchError> {
        if criteria.accuracy.is_some() && !self.accuracy_tracked {
            return Err(SearchError::InputValidation(
                "an accuracy criterion needs a search run with a metric or validation data"
                    .to_string(),
            ));
        }

        let original = self.get(ORIGINAL);
        let reference = original.and_then(|r| r.accuracy).and_then(|a| a.value());

        let mut best: Option<Selection<'_>> = None;
        if !criteria.has_limit() {
            if let Some(record) = original.filter(|r| r.is_successful()) {
                best = Some(Selection {
                    name: ORIGINAL,
                    record,
                });
            }
        }

        for (name, record) in self.records() {
            if name == ORIGINAL || !record.is_successful() || !criteria.matches(&record.strategy) {
                continue;
            }
            if let Some(criterion) = criteria.accuracy {
                let candidate = match record.accuracy {
                    Some(Accuracy::Value(v)) => Some(v),
                    Some(Accuracy::NotRecomputed) => reference,
                    None => None,
                };
                match (reference, candidate) {
                    (Some(r), Some(c)) if criterion.admits(self.direction, r, c) => {}
                    _ => continue,
                }
            }
            let faster = match (&best, record.latency) {
                (None, _) => true,
                (Some(b), Some(l)) => b.record.latency.map_or(true, |bl| l < bl),
                (Some(_), None) => false,
            };
            if faster {
                best = Some(Selection { name, record });
            }
        }

        best.ok_or_else(|| {
            SearchError::NoCandidate(format!("no successful strategy matches {criteria:?}"))
        })
    }

    /// A serialisable view without artifacts.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            direction: self.direction,
            accuracy_tracked: self.accuracy_tracked,
            elapsed_secs: self.elapsed.as_secs_f64(),
            entries: self
                .records
                .iter()
                .map(|(name, r)| SummaryEntry {
                    name: name.clone(),
                    strategy: r.strategy.clone(),
                    status: r.status,
                    latency_ms: r.latency_ms(),
                    accuracy: r.accuracy,
                    error: r.error.clone(),
                })
                .collect(),
        }
    }

    /// Writes [`summary`](Self::summary) as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), SearchError> {
        self.summary().save(path)
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_w = self
            .records
            .iter()
            .map(|(n, _)| n.len())
            .max()
            .unwrap_or(6)
            .max(6);
        let rule = format!(
            " {:-<nw$} {:-<17} {:-<14}{}",
            "",
            "",
            "",
            if self.accuracy_tracked {
                format!(" {:-<16}", "")
            } else {
                String::new()
            },
            nw = name_w + 2
        );

        writeln!(f, "{rule}")?;
        write!(f, "| {:^nw$} | {:^15} | {:^12} |", "method", "status", "latency(ms)", nw = name_w)?;
        if self.accuracy_tracked {
            write!(f, " {:^14} |", "accuracy")?;
        }
        writeln!(f)?;
        writeln!(f, "{rule}")?;

        for (name, r) in &self.records {
            let latency = r
                .latency_ms()
                .map(|l| format!("{l:.3}"))
                .unwrap_or_else(|| "None".to_string());
            write!(
                f,
                "| {:^nw$} | {:^15} | {:^12} |",
                name,
                r.status.as_str(),
                latency,
                nw = name_w
            )?;
            if self.accuracy_tracked {
                let acc = r
                    .accuracy
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "None".to_string());
                write!(f, " {acc:^14} |")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{rule}")?;
        write!(
            f,
            "Optimization cost {:.1}s in total.",
            self.elapsed.as_secs_f64()
        )
    }
}

/// One row of a [`ReportSummary`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummaryEntry {
    pub name: String,
    pub strategy: Strategy,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<Accuracy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Artifact-free, serialisable form of a [`SearchReport`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportSummary {
    pub direction: Direction,
    pub accuracy_tracked: bool,
    pub elapsed_secs: f64,
    pub entries: Vec<SummaryEntry>,
}

impl ReportSummary {
    /// Save report to JSON file.
    pub fn save(&self, path: &Path) -> Result<(), SearchError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| SearchError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Load report from JSON file.
    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let json = std::fs::read_to_string(path).map_err(|e| SearchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_core::FnModel;
    use model_core::Tensor;

    fn artifact(name: &str) -> Box<dyn InferenceModel> {
        Box::new(FnModel::new(name, 1, |_| Ok(Tensor::scalar(0.0))))
    }

    fn record(
        strategy: Strategy,
        status: Status,
        latency_ms: u64,
        accuracy: Option<Accuracy>,
    ) -> OutcomeRecord {
        let mut r = OutcomeRecord::new(strategy, status);
        if matches!(status, Status::Successful | Status::EarlyStopped) {
            r.latency = Some(Duration::from_millis(latency_ms));
            r.artifact = Some(artifact("a"));
        }
        r.accuracy = accuracy;
        r
    }

    fn sample_report(tracked: bool) -> SearchReport {
        let fp32_jit = Strategy::new(Precision::Fp32, Accelerator::Jit);
        let int8 = Strategy::new(Precision::Int8, Accelerator::None);
        let int8_ov = Strategy::new(Precision::Int8, Accelerator::OpenVino);
        let acc = |v| tracked.then_some(Accuracy::Value(v));
        SearchReport::new(
            vec![
                (
                    "original".into(),
                    record(Strategy::baseline(), Status::Successful, 10, acc(0.90)),
                ),
                (
                    "jit_fp32".into(),
                    record(
                        fp32_jit,
                        Status::Successful,
                        6,
                        tracked.then_some(Accuracy::NotRecomputed),
                    ),
                ),
                (
                    "int8".into(),
                    record(int8, Status::Successful, 3, acc(0.80)),
                ),
                (
                    "openvino_int8".into(),
                    record(int8_ov, Status::Successful, 4, acc(0.89)),
                ),
                (
                    "bf16".into(),
                    record(
                        Strategy::new(Precision::Bf16, Accelerator::None),
                        Status::FailToConvert,
                        0,
                        None,
                    ),
                ),
            ],
            Direction::Max,
            tracked,
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn test_ranked_is_by_latency() {
        let r = sample_report(false);
        let names: Vec<&str> = r.ranked().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["int8", "openvino_int8", "jit_fp32", "original"]);
    }

    #[test]
    fn test_best_unconstrained_is_fastest() {
        let r = sample_report(false);
        assert_eq!(r.best(&SelectionCriteria::default()).unwrap().name, "int8");
    }

    #[test]
    fn test_best_with_relative_accuracy() {
        let r = sample_report(true);
        let c = SelectionCriteria {
            accuracy: Some(AccuracyCriterion::Relative(0.05)),
            ..Default::default()
        };
        // int8 loses 11%; openvino_int8 loses ~1%.
        assert_eq!(r.best(&c).unwrap().name, "openvino_int8");
    }

    #[test]
    fn test_best_with_absolute_accuracy() {
        let r = sample_report(true);
        let c = SelectionCriteria {
            accuracy: Some(AccuracyCriterion::Absolute(0.0)),
            ..Default::default()
        };
        // Only not-recomputed fp32 artifacts match original exactly.
        assert_eq!(r.best(&c).unwrap().name, "jit_fp32");
    }

    #[test]
    fn test_best_constrained_without_match() {
        let r = sample_report(false);
        let c = SelectionCriteria {
            accelerator: Some(Accelerator::OnnxRuntime),
            ..Default::default()
        };
        assert!(matches!(r.best(&c), Err(SearchError::NoCandidate(_))));
    }

    #[test]
    fn test_best_accuracy_requires_tracking() {
        let r = sample_report(false);
        let c = SelectionCriteria {
            accuracy: Some(AccuracyCriterion::Relative(0.1)),
            ..Default::default()
        };
        assert!(matches!(r.best(&c), Err(SearchError::InputValidation(_))));
    }

    #[test]
    fn test_display_table() {
        let text = sample_report(true).to_string();
        assert!(text.contains("method"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("fail to convert"));
        assert!(text.contains("not recomputed"));
        assert!(text.ends_with("Optimization cost 1.5s in total."));
    }

    #[test]
    fn test_summary_save_and_load() {
        let r = sample_report(true);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        r.save_json(&path).unwrap();
        let back = ReportSummary::load(&path).unwrap();
        assert_eq!(back, r.summary());
        assert_eq!(back.entries.len(), 5);
        assert_eq!(back.entries[4].status, Status::FailToConvert);
    }

    #[test]
    fn test_take_moves_artifact_out() {
        let mut r = sample_report(false);
        let rec = r.take("int8").unwrap();
        assert!(rec.artifact.is_some());
        assert!(r.get("int8").is_none());
        assert_eq!(r.len(), 4);
    }
}
