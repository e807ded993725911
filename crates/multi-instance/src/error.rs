// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the coordinator and its workers.

/// Errors raised while spawning, talking to, or stopping workers.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The core schedule could not be computed.
    #[error("scheduling failed: {0}")]
    Topology(#[from] cpu_topology::TopologyError),

    /// A worker process could not be started.
    #[error("failed to spawn worker {index} ('{program}'): {source}")]
    Spawn {
        index: usize,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to a worker's pipes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded, decoded, or matched to its request.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The worker ran the request and reported a failure.
    #[error("worker {index} failed: {message}")]
    Worker { index: usize, message: String },

    /// Some workers did not exit cleanly.
    #[error("workers {failed:?} did not shut down cleanly")]
    Shutdown { failed: Vec<usize> },

    /// A coordinator needs at least one worker.
    #[error("no workers to spawn")]
    NoWorkers,
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(e: serde_json::Error) -> Self {
        CoordinatorError::Protocol(e.to_string())
    }
}
