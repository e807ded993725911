// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wire format between coordinator and workers.
//!
//! One JSON object per line in each direction:
//! ```text
//! → {"type":"forward","id":7,"inputs":[{"shape":[1,4],"data":[...]}]}
//! ← {"type":"output","id":7,"output":{"shape":[1,2],"data":[...]}}
//! → {"type":"shutdown"}
//! ```

use model_core::Tensor;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Coordinator → worker.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    Forward { id: u64, inputs: Vec<Tensor> },
    Shutdown,
}

/// Worker → coordinator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    Output { id: u64, output: Tensor },
    Failed { id: u64, message: String },
}

impl WorkerResponse {
    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Output { id, .. } | WorkerResponse::Failed { id, .. } => *id,
        }
    }
}

/// Serialises `msg` as one newline-terminated line.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim_end())
}
