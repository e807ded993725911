// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The worker side: apply the launch directive, then answer requests.

use crate::protocol::{self, WorkerRequest, WorkerResponse};
use crate::CoordinatorError;
use bench_harness::ThreadBudget;
use cpu_topology::AffinityDirective;
use model_core::InferenceModel;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Answers requests from `reader` on `writer` until a shutdown message or
/// end of input. Returns the number of forward requests served.
///
/// Each forward pass runs on `budget`'s compute pool. A failed forward pass
/// is reported to the coordinator and serving continues; a malformed line
/// ends the loop with a protocol error.
pub async fn serve<R, W>(
    model: &dyn InferenceModel,
    budget: &ThreadBudget,
    reader: R,
    mut writer: W,
) -> Result<usize, CoordinatorError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: WorkerRequest = protocol::decode(&line)?;
        let response = match request {
            WorkerRequest::Shutdown => {
                tracing::debug!("shutdown requested after {served} requests");
                break;
            }
            WorkerRequest::Forward { id, inputs } => {
                let result = budget
                    .install(|| model.forward(&inputs))
                    .map_err(|e| e.to_string())
                    .and_then(|r| r.map_err(|e| e.to_string()));
                match result {
                    Ok(output) => WorkerResponse::Output { id, output },
                    Err(message) => {
                        tracing::warn!("request {id} failed: {message}");
                        WorkerResponse::Failed { id, message }
                    }
                }
            }
        };
        writer
            .write_all(protocol::encode(&response)?.as_bytes())
            .await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

/// Applies `directive` to `budget`: the thread count becomes the size of
/// its compute pool, and every pool thread is pinned to a core of the mask.
/// Returns the cores pool threads are pinned to (empty when disabled).
pub fn apply_directive(budget: &ThreadBudget, directive: &AffinityDirective) -> Vec<usize> {
    budget.set(directive.thread_count);
    let cores = directive.affinity.cores().to_vec();
    budget.pin_to(cores.clone());
    if cores.is_empty() {
        tracing::info!(
            "worker {}: {} threads, unpinned",
            directive.worker_index,
            directive.thread_count
        );
    } else {
        tracing::info!(
            "worker {}: {} threads pinned to {:?}",
            directive.worker_index,
            directive.thread_count,
            cores
        );
    }
    cores
}

/// Entry point for a worker process: reads the directive from the
/// environment, applies it to the process budget, and serves stdin/stdout.
pub async fn run_stdio(model: &dyn InferenceModel) -> Result<usize, CoordinatorError> {
    let budget = ThreadBudget::global();
    match AffinityDirective::from_env() {
        Some(directive) => {
            apply_directive(&budget, &directive);
        }
        None => tracing::debug!("no launch directive in environment, running unpinned"),
    }
    let served = serve(
        model,
        &budget,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;
    tracing::info!("worker '{}' served {served} requests", model.name());
    Ok(served)
}
