// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Latency statistics over a set of timed samples.

use std::time::Duration;

/// Order statistics of a latency sample set.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
}

impl LatencyStats {
    /// Computes statistics, or `None` for an empty sample set.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: mean(&sorted),
            p50: percentile(&sorted, 0.5),
            p90: percentile(&sorted, 0.9),
        })
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{} samples: mean {:.3}ms, p50 {:.3}ms, p90 {:.3}ms, min {:.3}ms, max {:.3}ms",
            self.count,
            ms(self.mean),
            ms(self.p50),
            ms(self.p90),
            ms(self.min),
            ms(self.max),
        )
    }
}

/// Milliseconds as `f64`.
pub fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub(crate) fn mean(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = samples.iter().sum();
    total / samples.len() as u32
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    let rank = ((q * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

/// Mean after dropping `⌊ratio·n⌋` samples from each end of the sorted set.
/// Falls back to the plain mean when trimming would leave nothing.
pub(crate) fn trimmed_mean(samples: &[Duration], ratio: f64) -> Duration {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let lo = (ratio * n as f64) as usize;
    let hi = n.saturating_sub(lo);
    if lo < hi {
        mean(&sorted[lo..hi])
    } else {
        mean(&sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(v: &[u64]) -> Vec<Duration> {
        v.iter().map(|&m| Duration::from_millis(m)).collect()
    }

    #[test]
    fn test_empty() {
        assert!(LatencyStats::from_samples(&[]).is_none());
        assert_eq!(trimmed_mean(&[], 0.1), Duration::ZERO);
    }

    #[test]
    fn test_stats() {
        let s = LatencyStats::from_samples(&millis(&[5, 1, 3, 2, 4, 6, 7, 8, 9, 10])).unwrap();
        assert_eq!(s.count, 10);
        assert_eq!(s.min, Duration::from_millis(1));
        assert_eq!(s.max, Duration::from_millis(10));
        assert_eq!(s.p50, Duration::from_millis(5));
        assert_eq!(s.p90, Duration::from_millis(9));
        assert_eq!(s.mean, Duration::from_micros(5500));
    }

    #[test]
    fn test_trimmed_mean_drops_outliers() {
        // 10 samples: trimming 10% drops the 1ms and the 1000ms.
        let samples = millis(&[1, 10, 10, 10, 10, 10, 10, 10, 10, 1000]);
        assert_eq!(trimmed_mean(&samples, 0.1), Duration::from_millis(10));
    }

    #[test]
    fn test_trimmed_mean_small_set_falls_back() {
        let samples = millis(&[4]);
        assert_eq!(trimmed_mean(&samples, 0.1), Duration::from_millis(4));
    }

    #[test]
    fn test_summary() {
        let s = LatencyStats::from_samples(&millis(&[2, 4])).unwrap();
        assert!(s.summary().contains("2 samples"));
        assert!(s.summary().contains("mean 3.000ms"));
    }
}
