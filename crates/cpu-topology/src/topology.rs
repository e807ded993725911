// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical → physical core and socket maps.
//!
//! Discovery tries two sources:
//! - `lscpu --parse=CPU,Core,Socket`: one `cpu,core,socket` line per logical
//!   core, with a globally unique core column.
//! - `/sys/devices/system/cpu/cpuN/topology/{core_id,physical_package_id}`:
//!   used when `lscpu` is missing. `core_id` is only unique within a package,
//!   so `(package, core_id)` pairs are renumbered in logical-core order.

use crate::cpuset::{self, parse_cpu_list};
use crate::TopologyError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Command;

/// Base sysfs path for CPU information.
const CPU_BASE: &str = "/sys/devices/system/cpu";

/// The host's core layout plus the subset this process may use.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CpuTopology {
    physical_core: BTreeMap<usize, usize>,
    socket: BTreeMap<usize, usize>,
    restricting_set: Vec<usize>,
}

impl CpuTopology {
    /// Builds a topology from explicit `(logical, physical, socket)` triples.
    /// The restricting set defaults to every logical core.
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, usize, usize)>) -> Self {
        let mut physical_core = BTreeMap::new();
        let mut socket = BTreeMap::new();
        for (logical, physical, sock) in entries {
            physical_core.insert(logical, physical);
            socket.insert(logical, sock);
        }
        let restricting_set = physical_core.keys().copied().collect();
        Self {
            physical_core,
            socket,
            restricting_set,
        }
    }

    /// Replaces the restricting set.
    pub fn with_restricting_set(mut self, mut set: Vec<usize>) -> Self {
        set.sort_unstable();
        set.dedup();
        self.restricting_set = set;
        self
    }

    /// Probes the running host: `lscpu`, then sysfs, then the cgroup cpuset.
    pub fn discover() -> Result<Self, TopologyError> {
        let topology = match run_lscpu() {
            Ok(text) => Self::from_lscpu(&text)?,
            Err(lscpu_err) => {
                tracing::debug!("lscpu unavailable ({lscpu_err}), trying sysfs");
                Self::from_sysfs(Path::new(CPU_BASE)).map_err(|e| {
                    TopologyError::TopologyUnavailable {
                        detail: format!("lscpu: {lscpu_err}; sysfs: {e}"),
                    }
                })?
            }
        };

        let logical: Vec<usize> = topology.logical_cores().collect();
        let restricting = cpuset::restricting_set(&logical);
        let topology = topology.with_restricting_set(restricting);
        tracing::info!("{}", topology.summary());
        Ok(topology)
    }

    /// Parses `lscpu --parse=CPU,Core,Socket` output.
    pub fn from_lscpu(text: &str) -> Result<Self, TopologyError> {
        Ok(Self::from_entries(parse_lscpu(text)?))
    }

    /// Reads the per-core topology files under `base`
    /// (normally `/sys/devices/system/cpu`).
    pub fn from_sysfs(base: &Path) -> Result<Self, TopologyError> {
        let online = read_sysfs_file(&base.join("online"))?;
        let logical = parse_cpu_list(&online).map_err(|detail| TopologyError::ParseError {
            path: base.join("online").display().to_string(),
            detail,
        })?;

        let mut renumber: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut entries = Vec::with_capacity(logical.len());
        for cpu in logical {
            let dir = base.join(format!("cpu{cpu}")).join("topology");
            let core_id = read_sysfs_usize(&dir.join("core_id"))?;
            let package = read_sysfs_usize(&dir.join("physical_package_id"))?;
            let next = renumber.len();
            let physical = *renumber.entry((package, core_id)).or_insert(next);
            entries.push((cpu, physical, package));
        }

        if entries.is_empty() {
            return Err(TopologyError::TopologyUnavailable {
                detail: format!("no online cores under {}", base.display()),
            });
        }
        Ok(Self::from_entries(entries))
    }

    /// All discovered logical core ids, ascending.
    pub fn logical_cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.physical_core.keys().copied()
    }

    pub fn physical_core_of(&self, logical: usize) -> Option<usize> {
        self.physical_core.get(&logical).copied()
    }

    pub fn socket_of(&self, logical: usize) -> Option<usize> {
        self.socket.get(&logical).copied()
    }

    /// Logical cores this process is allowed to run on, ascending.
    pub fn restricting_set(&self) -> &[usize] {
        &self.restricting_set
    }

    /// One logical core per physical core inside the restricting set, ordered
    /// by physical core id. Each physical core is represented by the smallest
    /// restricting-set logical id that maps to it.
    ///
    /// Restricting-set entries with no known physical core are skipped.
    pub fn usable_physical_cores(&self) -> Vec<usize> {
        let mut first_logical: BTreeMap<usize, usize> = BTreeMap::new();
        for &logical in &self.restricting_set {
            if let Some(physical) = self.physical_core_of(logical) {
                first_logical.entry(physical).or_insert(logical);
            }
        }
        first_logical.into_values().collect()
    }

    /// Number of distinct physical cores in the whole topology.
    pub fn num_physical_cores(&self) -> usize {
        self.physical_core.values().collect::<BTreeSet<_>>().len()
    }

    /// Number of distinct sockets.
    pub fn num_sockets(&self) -> usize {
        self.socket.values().collect::<BTreeSet<_>>().len()
    }

    /// Returns a one-line human-readable description.
    pub fn summary(&self) -> String {
        format!(
            "{} logical / {} physical cores on {} socket(s); {} usable physical cores",
            self.physical_core.len(),
            self.num_physical_cores(),
            self.num_sockets(),
            self.usable_physical_cores().len(),
        )
    }
}

/// Parses `lscpu --parse=CPU,Core,Socket` output into
/// `(logical, physical, socket)` triples. `#` lines are comments; lines
/// without three numeric fields (offline cpus print empty ones) are skipped.
///
/// # Examples
/// ```
/// let text = "# CPU,Core,Socket\n0,0,0\n1,1,0\n2,,\n3,0,0\n";
/// let triples = cpu_topology::parse_lscpu(text).unwrap();
/// assert_eq!(triples, vec![(0, 0, 0), (1, 1, 0), (3, 0, 0)]);
/// ```
pub fn parse_lscpu(text: &str) -> Result<Vec<(usize, usize, usize)>, TopologyError> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_lscpu_line(line) {
            Some(entry) => entries.push(entry),
            None => tracing::debug!("lscpu line {}: skipping '{line}'", lineno + 1),
        }
    }
    if entries.is_empty() {
        return Err(TopologyError::TopologyUnavailable {
            detail: "lscpu listed no cores".to_string(),
        });
    }
    Ok(entries)
}

fn parse_lscpu_line(line: &str) -> Option<(usize, usize, usize)> {
    let mut fields = line.split(',').map(|f| f.trim().parse::<usize>().ok());
    Some((fields.next()??, fields.next()??, fields.next()??))
}

fn run_lscpu() -> Result<String, String> {
    let output = Command::new("lscpu")
        .arg("--parse=CPU,Core,Socket")
        .output()
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(format!("lscpu exited with {}", output.status));
    }
    String::from_utf8(output.stdout).map_err(|e| e.to_string())
}

/// Reads a sysfs file and returns its trimmed contents.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, TopologyError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| TopologyError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

fn read_sysfs_usize(path: &Path) -> Result<usize, TopologyError> {
    let s = read_sysfs_file(path)?;
    s.parse().map_err(|_| TopologyError::ParseError {
        path: path.display().to_string(),
        detail: format!("'{s}' is not an integer"),
    })
}
