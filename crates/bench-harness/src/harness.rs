// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The timed measurement loop.

use crate::stats::{mean, trimmed_mean};
use crate::{HarnessConfig, HarnessError, LatencyStats};
use model_core::{InferenceModel, ModelError, Tensor};
use std::time::{Duration, Instant};

/// Outcome of one [`BenchmarkHarness::measure`] run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Measurement {
    /// Trimmed mean latency (or the plain mean of the samples taken when
    /// early-stopped).
    pub latency: Duration,
    /// Every timed sample, in the order taken.
    pub samples: Vec<Duration>,
    /// `false` when the early-stop check abandoned the run.
    pub completed: bool,
}

impl Measurement {
    pub fn stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_samples(&self.samples)
    }
}

/// Measures the steady-state latency of a callable.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkHarness {
    config: HarnessConfig,
}

impl BenchmarkHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Times `f` up to `sample_budget` times after one untimed warm-up call.
    ///
    /// Sampling ends early when:
    /// - at least `min(sample_budget, min_samples)` samples exist and the
    ///   timed loop has run longer than the wall-clock budget, or
    /// - at `early_stop_min_samples` samples, the mean exceeds
    ///   `early_stop_factor × baseline`. The measurement is then returned
    ///   with `completed = false`.
    ///
    /// # Errors
    /// [`HarnessError::EmptyBudget`] for a zero budget; the first error `f`
    /// returns, as [`HarnessError::Forward`].
    pub fn measure<F>(
        &self,
        mut f: F,
        sample_budget: usize,
        baseline: Duration,
    ) -> Result<Measurement, HarnessError>
    where
        F: FnMut() -> Result<(), ModelError>,
    {
        if sample_budget == 0 {
            return Err(HarnessError::EmptyBudget);
        }
        let cfg = &self.config;
        let wall_budget = cfg.wall_budget();
        let min_samples = sample_budget.min(cfg.min_samples);
        let threshold = baseline.mul_f64(cfg.early_stop_factor);

        f()?;

        let mut samples = Vec::with_capacity(sample_budget);
        let start = Instant::now();
        for i in 0..sample_budget {
            let t0 = Instant::now();
            f()?;
            samples.push(t0.elapsed());

            if i + 1 == cfg.early_stop_min_samples && !baseline.is_zero() {
                let so_far = mean(&samples);
                if so_far > threshold {
                    tracing::debug!(
                        "early stop: {:?} mean after {} samples > {:?}",
                        so_far,
                        samples.len(),
                        threshold
                    );
                    return Ok(Measurement {
                        latency: so_far,
                        samples,
                        completed: false,
                    });
                }
            }

            if i + 1 >= min_samples && start.elapsed() > wall_budget {
                tracing::debug!(
                    "wall-clock budget {:?} exhausted after {} samples",
                    wall_budget,
                    samples.len()
                );
                break;
            }
        }

        Ok(Measurement {
            latency: trimmed_mean(&samples, cfg.trim_ratio),
            samples,
            completed: true,
        })
    }

    /// Convenience wrapper timing `model.forward(input)`.
    pub fn measure_model(
        &self,
        model: &dyn InferenceModel,
        input: &[Tensor],
        sample_budget: usize,
        baseline: Duration,
    ) -> Result<Measurement, HarnessError> {
        self.measure(|| model.forward(input).map(drop), sample_budget, baseline)
    }
}

/// Times a single call, returning its duration and result.
pub fn time_once<T>(f: impl FnOnce() -> T) -> (Duration, T) {
    let t0 = Instant::now();
    let out = f();
    (t0.elapsed(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_core::{FnModel, LinearModel};
    use std::cell::Cell;

    fn sleep_ms(ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let h = BenchmarkHarness::default();
        let err = h.measure(|| Ok(()), 0, Duration::ZERO).unwrap_err();
        assert!(matches!(err, HarnessError::EmptyBudget));
    }

    #[test]
    fn test_runs_warmup_plus_budget() {
        let calls = Cell::new(0);
        let h = BenchmarkHarness::default();
        let m = h
            .measure(
                || {
                    calls.set(calls.get() + 1);
                    Ok(())
                },
                20,
                Duration::from_secs(1),
            )
            .unwrap();
        assert!(m.completed);
        assert_eq!(m.samples.len(), 20);
        assert_eq!(calls.get(), 21);
    }

    #[test]
    fn test_early_stop_on_slow_callable() {
        let h = BenchmarkHarness::default();
        let slow = || {
            sleep_ms(5);
            Ok(())
        };
        let m = h.measure(slow, 100, Duration::from_micros(100)).unwrap();
        assert!(!m.completed);
        assert_eq!(m.samples.len(), 3);
        assert!(m.latency >= Duration::from_millis(5));
    }

    #[test]
    fn test_zero_baseline_disables_early_stop() {
        let h = BenchmarkHarness::default();
        let tick = || {
            sleep_ms(1);
            Ok(())
        };
        let m = h.measure(tick, 5, Duration::ZERO).unwrap();
        assert!(m.completed);
        assert_eq!(m.samples.len(), 5);
    }

    #[test]
    fn test_wall_budget_cuts_loop_after_min_samples() {
        let h = BenchmarkHarness::new(HarnessConfig {
            wall_budget_secs: 0.02,
            min_samples: 4,
            ..Default::default()
        });
        let tick = || {
            sleep_ms(10);
            Ok(())
        };
        let m = h.measure(tick, 1000, Duration::from_secs(1)).unwrap();
        assert!(m.completed);
        assert_eq!(m.samples.len(), 4);
    }

    #[test]
    fn test_forward_error_propagates() {
        let h = BenchmarkHarness::default();
        let n = Cell::new(0);
        let err = h
            .measure(
                || {
                    n.set(n.get() + 1);
                    if n.get() > 3 {
                        Err(ModelError::Forward {
                            model: "m".into(),
                            detail: "boom".into(),
                        })
                    } else {
                        Ok(())
                    }
                },
                10,
                Duration::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, HarnessError::Forward(_)));
    }

    #[test]
    fn test_measure_model() {
        let m = LinearModel::seeded("lin", 8, 4, 3);
        let x = Tensor::full(vec![2, 8], 0.5);
        let h = BenchmarkHarness::default();
        let out = h.measure_model(&m, &[x], 10, Duration::ZERO).unwrap();
        assert_eq!(out.samples.len(), 10);
        assert!(out.stats().is_some());
    }

    #[test]
    fn test_measure_model_bad_input() {
        let m = FnModel::new("two", 2, |xs| {
            if xs.len() != 2 {
                return Err(ModelError::InputArity {
                    model: "two".into(),
                    expected: 2,
                    actual: xs.len(),
                });
            }
            Ok(Tensor::scalar(0.0))
        });
        let h = BenchmarkHarness::default();
        let err = h
            .measure_model(&m, &[Tensor::scalar(1.0)], 5, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Forward(ModelError::InputArity { .. })
        ));
    }
}
