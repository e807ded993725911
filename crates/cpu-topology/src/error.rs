// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for topology discovery and scheduling.

/// Errors that can occur while probing the CPU topology or building a schedule.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// No enumeration source (lscpu, sysfs) produced a usable core map.
    #[error("CPU topology unavailable: {detail}")]
    TopologyUnavailable { detail: String },

    /// More cores were requested than the restricting set provides.
    #[error(
        "requested {requested} cores ({num_workers} workers × {cores_per_worker}) \
         but only {available} physical cores are available"
    )]
    OverAllocation {
        num_workers: usize,
        cores_per_worker: usize,
        requested: usize,
        available: usize,
    },

    /// The scheduling request itself is malformed.
    #[error("invalid scheduling request: {0}")]
    InvalidRequest(String),

    /// Failed to read a sysfs or cgroup file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A system file did not have the expected format.
    #[error("failed to parse {path}: {detail}")]
    ParseError { path: String, detail: String },
}
