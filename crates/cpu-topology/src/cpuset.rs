// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The restricting core set imposed by a container or cgroup.
//!
//! Reads, in order:
//! - `/sys/fs/cgroup/cpuset/cpuset.cpus`: cgroup v1 cpuset controller.
//! - `/sys/fs/cgroup/cpuset.cpus.effective`: cgroup v2 unified hierarchy.
//!
//! Both hold a single line such as `0-3,8,10-11`. A host without either file
//! (or with an unparsable one) is not an error: the process may use every
//! discovered core.

use crate::TopologyError;
use std::path::Path;

/// cgroup v1 cpuset file.
pub const CGROUP_V1_CPUSET: &str = "/sys/fs/cgroup/cpuset/cpuset.cpus";

/// cgroup v2 effective cpuset file.
pub const CGROUP_V2_CPUSET: &str = "/sys/fs/cgroup/cpuset.cpus.effective";

/// Upper bound on logical cpu ids, above any kernel `NR_CPUS`.
pub const MAX_CPU_ID: usize = 1 << 16;

/// Parses a kernel cpu-list string like `"0-3,8,10-11"` into sorted,
/// de-duplicated logical core ids. Ids of [`MAX_CPU_ID`] or more are
/// rejected.
pub fn parse_cpu_list(s: &str) -> Result<Vec<usize>, String> {
    let mut ids = Vec::new();
    for part in s.trim().split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("empty entry in cpu list '{s}'"));
        }
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: usize = start_s
                .trim()
                .parse()
                .map_err(|_| format!("bad range start in '{part}'"))?;
            let end: usize = end_s
                .trim()
                .parse()
                .map_err(|_| format!("bad range end in '{part}'"))?;
            if end < start {
                return Err(format!("descending range '{part}'"));
            }
            if end >= MAX_CPU_ID {
                return Err(format!("cpu id {end} in '{part}' is out of range"));
            }
            ids.extend(start..=end);
        } else {
            let id: usize = part.parse().map_err(|_| format!("bad cpu id '{part}'"))?;
            if id >= MAX_CPU_ID {
                return Err(format!("cpu id {id} is out of range"));
            }
            ids.push(id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Reads and parses one cpuset file.
pub fn read_cpuset(path: &Path) -> Result<Vec<usize>, TopologyError> {
    let content = std::fs::read_to_string(path).map_err(|e| TopologyError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let first_line = content.lines().next().unwrap_or("");
    parse_cpu_list(first_line).map_err(|detail| TopologyError::ParseError {
        path: path.display().to_string(),
        detail,
    })
}

/// Returns the restricting set from the first readable cgroup file,
/// or `discovered` when none can be read.
pub fn restricting_set(discovered: &[usize]) -> Vec<usize> {
    restricting_set_from(
        &[Path::new(CGROUP_V1_CPUSET), Path::new(CGROUP_V2_CPUSET)],
        discovered,
    )
}

/// Like [`restricting_set`], over an explicit list of candidate files.
pub fn restricting_set_from(paths: &[&Path], discovered: &[usize]) -> Vec<usize> {
    for path in paths {
        match read_cpuset(path) {
            Ok(set) => {
                tracing::debug!("restricting set from {}: {set:?}", path.display());
                return set;
            }
            Err(e) => tracing::debug!("no cpuset restriction from {}: {e}", path.display()),
        }
    }
    let mut all = discovered.to_vec();
    all.sort_unstable();
    all
}
