// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The coordinator side: spawn pinned workers and route requests to them.

use crate::launch::WorkerLauncher;
use crate::protocol::{self, WorkerRequest, WorkerResponse};
use crate::CoordinatorError;
use cpu_topology::{AffinityDirective, Scheduler};
use model_core::Tensor;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

/// How long a worker gets to exit after the shutdown message before it is
/// killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One running worker process and its pipes.
struct WorkerHandle {
    directive: AffinityDirective,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl WorkerHandle {
    fn index(&self) -> usize {
        self.directive.worker_index
    }

    async fn send(&mut self, request: &WorkerRequest) -> Result<(), CoordinatorError> {
        self.stdin
            .write_all(protocol::encode(request)?.as_bytes())
            .await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Reads replies until the one for `id`.
    ///
    /// Request ids only grow, so a reply with a smaller id belongs to a
    /// request whose caller stopped waiting; it is discarded.
    async fn receive(&mut self, id: u64) -> Result<Tensor, CoordinatorError> {
        let index = self.index();
        let response = loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                CoordinatorError::Protocol(format!("worker {index} closed its output"))
            })?;
            let response: WorkerResponse = protocol::decode(&line)?;
            match response.id() {
                got if got == id => break response,
                got if got < id => {
                    tracing::debug!("worker {index}: dropping stale reply to request {got}");
                }
                got => {
                    return Err(CoordinatorError::Protocol(format!(
                        "worker {index} answered request {got} while {id} was pending"
                    )))
                }
            }
        };
        match response {
            WorkerResponse::Output { output, .. } => Ok(output),
            WorkerResponse::Failed { message, .. } => {
                Err(CoordinatorError::Worker { index, message })
            }
        }
    }

    /// Asks the worker to stop and waits for it. `false` if it had to be
    /// killed or exited with an error.
    async fn stop(mut self) -> bool {
        let index = self.index();
        let sent = self.send(&WorkerRequest::Shutdown).await.is_ok();
        drop(self.stdin);

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => sent,
            Ok(Ok(status)) => {
                tracing::warn!("worker {index} exited with {status}");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!("worker {index}: wait failed: {e}");
                false
            }
            Err(_) => {
                tracing::warn!("worker {index} ignored shutdown, killing");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("worker {index}: kill failed: {e}");
                }
                false
            }
        }
    }
}

/// Runs a model as N independent worker processes on disjoint core sets.
///
/// Requests to one worker are answered in the order they were sent; there
/// is no ordering between workers. Dropping the coordinator kills every
/// worker; [`shutdown`](Self::shutdown) stops them gracefully.
///
/// # Example
/// ```no_run
/// # async fn example() -> Result<(), multi_instance::CoordinatorError> {
/// use model_core::Tensor;
/// use multi_instance::{MultiInstanceCoordinator, WorkerLauncher};
///
/// let launcher = WorkerLauncher::new("accel-tune").arg("worker");
/// let mut coordinator = MultiInstanceCoordinator::spawn(&launcher, 2, None).await?;
/// let out = coordinator.invoke(vec![Tensor::zeros(vec![1, 16])]).await?;
/// println!("{out}");
/// coordinator.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct MultiInstanceCoordinator {
    workers: Vec<WorkerHandle>,
    next_worker: usize,
    next_id: u64,
}

impl MultiInstanceCoordinator {
    /// Discovers the host topology, schedules `num_workers` blocks of
    /// `cores_per_worker` physical cores (default: an even split) and
    /// spawns one worker per block.
    pub async fn spawn(
        launcher: &WorkerLauncher,
        num_workers: usize,
        cores_per_worker: Option<usize>,
    ) -> Result<Self, CoordinatorError> {
        if num_workers == 0 {
            return Err(CoordinatorError::NoWorkers);
        }
        let scheduler = Scheduler::discover()?;
        Self::spawn_with(launcher, &scheduler, num_workers, cores_per_worker).await
    }

    /// Like [`spawn`](Self::spawn) against a known topology.
    pub async fn spawn_with(
        launcher: &WorkerLauncher,
        scheduler: &Scheduler,
        num_workers: usize,
        cores_per_worker: Option<usize>,
    ) -> Result<Self, CoordinatorError> {
        let schedule = scheduler.schedule(num_workers, cores_per_worker)?;
        tracing::info!(
            "scheduled {} workers × {} cores: {:?}",
            schedule.num_workers(),
            schedule.cores_per_worker(),
            schedule.assignments()
        );
        Self::spawn_with_directives(launcher, AffinityDirective::for_schedule(&schedule)).await
    }

    /// Spawns one worker per directive.
    ///
    /// If any spawn fails the workers already started are killed and the
    /// error is returned.
    pub async fn spawn_with_directives(
        launcher: &WorkerLauncher,
        directives: Vec<AffinityDirective>,
    ) -> Result<Self, CoordinatorError> {
        if directives.is_empty() {
            return Err(CoordinatorError::NoWorkers);
        }

        let mut workers = Vec::with_capacity(directives.len());
        for directive in directives {
            let config = launcher.config_for(&directive);
            let index = config.worker_index;
            let mut child =
                launcher
                    .command(&config)
                    .spawn()
                    .map_err(|source| CoordinatorError::Spawn {
                        index,
                        program: launcher.program().display().to_string(),
                        source,
                    })?;
            let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
                return Err(CoordinatorError::Protocol(format!(
                    "worker {index} was spawned without piped stdio"
                )));
            };
            tracing::debug!(
                "spawned worker {index} (pid {:?}) with {}",
                child.id(),
                directive.affinity
            );
            workers.push(WorkerHandle {
                directive,
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            });
        }
        tracing::info!("{} workers running", workers.len());

        Ok(Self {
            workers,
            next_worker: 0,
            next_id: 0,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// The directive each worker was launched with, in worker order.
    pub fn directives(&self) -> impl Iterator<Item = &AffinityDirective> {
        self.workers.iter().map(|w| &w.directive)
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Sends `inputs` to the next worker in round-robin order and waits for
    /// its output.
    ///
    /// Dropping the future after the request went out is harmless: the
    /// orphaned reply is skipped by the next call on that worker.
    pub async fn invoke(&mut self, inputs: Vec<Tensor>) -> Result<Tensor, CoordinatorError> {
        let w = self.next_worker;
        self.next_worker = (w + 1) % self.workers.len();
        let id = self.next_request_id();
        let worker = &mut self.workers[w];
        worker.send(&WorkerRequest::Forward { id, inputs }).await?;
        worker.receive(id).await
    }

    /// Sends input `i` to worker `i % n` and returns outputs in input order.
    ///
    /// Inputs go out in rounds of one per worker, so every worker computes
    /// concurrently while no pipe ever holds more than one pending request.
    /// A failing round is read to the end before its first error is
    /// returned, so every worker stays in step; later rounds are not sent.
    pub async fn invoke_batch(
        &mut self,
        batch: Vec<Vec<Tensor>>,
    ) -> Result<Vec<Tensor>, CoordinatorError> {
        let n = self.workers.len();
        let mut outputs = Vec::with_capacity(batch.len());
        let mut pending = Vec::with_capacity(n);
        let mut inputs = batch.into_iter().peekable();

        while inputs.peek().is_some() {
            pending.clear();
            for (w, input) in inputs.by_ref().take(n).enumerate() {
                let id = self.next_request_id();
                self.workers[w]
                    .send(&WorkerRequest::Forward { id, inputs: input })
                    .await?;
                pending.push(id);
            }
            let mut first_error = None;
            for (w, &id) in pending.iter().enumerate() {
                match self.workers[w].receive(id).await {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(outputs)
    }

    /// Sends the same input to every worker; one output per worker, in
    /// worker order.
    pub async fn broadcast(&mut self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>, CoordinatorError> {
        let n = self.workers.len();
        self.invoke_batch(vec![inputs; n]).await
    }

    /// Stops every worker. All workers are stopped even when some fail; the
    /// failures are reported together.
    pub async fn shutdown(self) -> Result<(), CoordinatorError> {
        let mut failed = Vec::new();
        for worker in self.workers {
            let index = worker.index();
            if !worker.stop().await {
                failed.push(index);
            }
        }
        if failed.is_empty() {
            tracing::info!("all workers stopped");
            Ok(())
        } else {
            Err(CoordinatorError::Shutdown { failed })
        }
    }
}
