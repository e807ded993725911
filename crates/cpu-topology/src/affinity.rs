// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-worker affinity directives and their environment-variable form.
//!
//! The environment is the only channel through which a schedule reaches a
//! spawned worker's numeric backend:
//!
//! | Variable          | Value                                           |
//! |-------------------|-------------------------------------------------|
//! | `KMP_AFFINITY`    | `granularity=fine,proclist=[0,1],explicit` or `disabled` |
//! | `OMP_NUM_THREADS` | threads for the worker                          |
//! | `PROCESS_IDX`     | worker index                                    |

use crate::Schedule;
use std::fmt;
use std::str::FromStr;

/// Affinity-mask variable.
pub const AFFINITY_VAR: &str = "KMP_AFFINITY";
/// Thread-count variable.
pub const THREADS_VAR: &str = "OMP_NUM_THREADS";
/// Worker-index variable.
pub const WORKER_INDEX_VAR: &str = "PROCESS_IDX";

/// Which logical cores a worker is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AffinityMask {
    /// Pinned to exactly these logical cores.
    Explicit(Vec<usize>),
    /// No usable core mapping; the backend picks.
    Disabled,
}

impl AffinityMask {
    /// Cores of an explicit mask; empty when disabled.
    pub fn cores(&self) -> &[usize] {
        match self {
            AffinityMask::Explicit(cores) => cores,
            AffinityMask::Disabled => &[],
        }
    }
}

impl fmt::Display for AffinityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffinityMask::Explicit(cores) => {
                let list: Vec<String> = cores.iter().map(usize::to_string).collect();
                write!(f, "granularity=fine,proclist=[{}],explicit", list.join(","))
            }
            AffinityMask::Disabled => f.write_str("disabled"),
        }
    }
}

impl FromStr for AffinityMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "disabled" {
            return Ok(AffinityMask::Disabled);
        }
        let open = s.find('[').ok_or_else(|| format!("no proclist in '{s}'"))?;
        let close = s.rfind(']').ok_or_else(|| format!("unterminated proclist in '{s}'"))?;
        if close < open {
            return Err(format!("malformed proclist in '{s}'"));
        }
        let inner = &s[open + 1..close];
        if inner.trim().is_empty() {
            return Ok(AffinityMask::Explicit(Vec::new()));
        }
        let cores = inner
            .split(',')
            .map(|c| {
                c.trim()
                    .parse::<usize>()
                    .map_err(|_| format!("bad core id '{c}' in '{s}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AffinityMask::Explicit(cores))
    }
}

/// The environment a single worker is launched with.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AffinityDirective {
    pub affinity: AffinityMask,
    pub thread_count: usize,
    pub worker_index: usize,
}

impl AffinityDirective {
    /// Derives one directive per worker. A schedule whose first block is
    /// empty yields `disabled` masks with one thread each.
    pub fn for_schedule(schedule: &Schedule) -> Vec<Self> {
        let disabled = schedule.is_empty();
        schedule
            .assignments()
            .iter()
            .enumerate()
            .map(|(worker_index, cores)| {
                if disabled {
                    Self {
                        affinity: AffinityMask::Disabled,
                        thread_count: 1,
                        worker_index,
                    }
                } else {
                    Self {
                        affinity: AffinityMask::Explicit(cores.clone()),
                        thread_count: cores.len(),
                        worker_index,
                    }
                }
            })
            .collect()
    }

    /// The `(name, value)` pairs to place in the worker's environment.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (AFFINITY_VAR, self.affinity.to_string()),
            (THREADS_VAR, self.thread_count.to_string()),
            (WORKER_INDEX_VAR, self.worker_index.to_string()),
        ]
    }

    /// Rebuilds a directive from variables looked up through `lookup`.
    ///
    /// Returns `None` when the worker-index variable is absent, meaning the
    /// process was not launched by a coordinator. A missing affinity or
    /// thread variable falls back to `disabled` / 1.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let worker_index = lookup(WORKER_INDEX_VAR)?.trim().parse().ok()?;
        let affinity = lookup(AFFINITY_VAR)
            .and_then(|v| v.parse().ok())
            .unwrap_or(AffinityMask::Disabled);
        let thread_count = lookup(THREADS_VAR)
            .and_then(|v| v.trim().parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1);
        Some(Self {
            affinity,
            thread_count,
            worker_index,
        })
    }

    /// Reads the directive from this process's environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
