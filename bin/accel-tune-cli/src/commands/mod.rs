// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the pieces they share.

pub mod demo;
pub mod schedule;
pub mod search;
pub mod serve;
pub mod topology;
pub mod worker;

use cpu_topology::{CpuTopology, Scheduler};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
///
/// Logs go to stderr: a worker's stdout carries the wire protocol.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Shape and weights of the demo model. Workers rebuild the same model
/// from these flags.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct DemoModelArgs {
    /// Input features of the demo model.
    #[arg(long, default_value_t = 64)]
    pub in_features: usize,

    /// Output features (classes) of the demo model.
    #[arg(long, default_value_t = 10)]
    pub out_features: usize,

    /// Weight seed of the demo model.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl DemoModelArgs {
    /// The flags that reproduce these arguments on a worker command line.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--in-features".to_string(),
            self.in_features.to_string(),
            "--out-features".to_string(),
            self.out_features.to_string(),
            "--seed".to_string(),
            self.seed.to_string(),
        ]
    }
}

/// Loads the topology from saved lscpu output, or probes the host.
pub fn load_topology(lscpu: Option<&Path>) -> anyhow::Result<CpuTopology> {
    match lscpu {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("cannot read lscpu output '{}': {e}", path.display())
            })?;
            Ok(CpuTopology::from_lscpu(&text)?)
        }
        None => Ok(CpuTopology::discover()?),
    }
}

pub fn load_scheduler(lscpu: Option<&Path>) -> anyhow::Result<Scheduler> {
    Ok(Scheduler::new(load_topology(lscpu)?))
}

/// Splits a comma-separated flag value.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
