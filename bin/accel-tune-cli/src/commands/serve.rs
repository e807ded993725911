// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-tune serve` command: run a strategy artifact of the demo model in
//! pinned worker processes and push a batch of requests through them.

use super::demo;
use super::worker::WorkerArgs;
use super::DemoModelArgs;
use cpu_topology::{AffinityDirective, AffinityMask};
use multi_instance::{MultiInstanceCoordinator, WorkerLauncher};
use std::path::PathBuf;
use std::time::Instant;
use strategy_catalog::ORIGINAL;

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: DemoModelArgs,

    /// Strategy whose artifact the workers serve (e.g. the search winner).
    #[arg(long, default_value = ORIGINAL)]
    pub strategy: String,

    /// Number of worker processes.
    #[arg(short, long, default_value_t = 2)]
    pub workers: usize,

    /// Physical cores per worker (default: an even split).
    #[arg(long)]
    pub cores_per_worker: Option<usize>,

    /// Requests to send.
    #[arg(short, long, default_value_t = 64)]
    pub requests: usize,

    /// Rows per request.
    #[arg(long, default_value_t = 8)]
    pub rows: usize,

    /// Skip scheduling: every worker runs unpinned with one thread.
    #[arg(long)]
    pub no_pin: bool,

    /// Schedule against saved lscpu output instead of this host.
    #[arg(long)]
    pub lscpu: Option<PathBuf>,
}

/// The command line that starts a worker for `args`.
pub fn worker_launcher(args: &ServeArgs, verbose: u8) -> anyhow::Result<WorkerLauncher> {
    let exe = std::env::current_exe()
        .map_err(|e| anyhow::anyhow!("cannot locate own executable: {e}"))?;
    let verbosity = (0..verbose).map(|_| "-v".to_string());
    let worker = WorkerArgs {
        model: args.model.clone(),
        strategy: args.strategy.clone(),
    };
    Ok(WorkerLauncher::new(exe)
        .args(verbosity)
        .arg("worker")
        .args(worker.to_args()))
}

fn unpinned(workers: usize) -> Vec<AffinityDirective> {
    (0..workers)
        .map(|worker_index| AffinityDirective {
            affinity: AffinityMask::Disabled,
            thread_count: 1,
            worker_index,
        })
        .collect()
}

pub async fn execute(args: ServeArgs, verbose: u8) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           accel-tune · Multi-Instance Serve          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // Built here too, to reject unknown strategies before spawning and to
    // check the workers' answers.
    let local = demo::demo_artifact(&args.model, &args.strategy)?;
    println!("  Serving: {}", local.name());

    let launcher = worker_launcher(&args, verbose)?;
    let mut coordinator = if args.no_pin {
        MultiInstanceCoordinator::spawn_with_directives(&launcher, unpinned(args.workers)).await?
    } else {
        let scheduler = super::load_scheduler(args.lscpu.as_deref())?;
        MultiInstanceCoordinator::spawn_with(
            &launcher,
            &scheduler,
            args.workers,
            args.cores_per_worker,
        )
        .await?
    };

    // ── Workers ────────────────────────────────────────────────
    for d in coordinator.directives() {
        println!(
            "  Worker {}: {} thread(s), {}",
            d.worker_index, d.thread_count, d.affinity
        );
    }
    println!();

    // ── Batch ──────────────────────────────────────────────────
    let batch: Vec<_> = (0..args.requests)
        .map(|i| vec![demo::demo_inputs(args.rows, args.model.in_features, i as u64)])
        .collect();
    let start = Instant::now();
    let outputs = coordinator.invoke_batch(batch).await?;
    let elapsed = start.elapsed();
    println!(
        "  {} requests in {:.1} ms ({:.0} req/s)",
        outputs.len(),
        elapsed.as_secs_f64() * 1e3,
        outputs.len() as f64 / elapsed.as_secs_f64().max(1e-9)
    );

    // Every worker serves the same artifact, so a broadcast must agree
    // with itself and with the local build.
    let probe = vec![demo::demo_inputs(1, args.model.in_features, 999)];
    let answers = coordinator.broadcast(probe.clone()).await?;
    let consistent = answers.windows(2).all(|w| w[0] == w[1]);
    let expected = local.forward(&probe)?;
    let matches_local = answers.iter().all(|a| *a == expected);
    println!(
        "  Broadcast: {} answers, {}, {}",
        answers.len(),
        if consistent { "consistent" } else { "INCONSISTENT" },
        if matches_local {
            format!("matches local {} artifact", args.strategy)
        } else {
            format!("DIFFERS from local {} artifact", args.strategy)
        }
    );
    println!();

    coordinator.shutdown().await?;
    println!("  All workers stopped.");
    if !consistent {
        anyhow::bail!("workers disagreed on the broadcast request");
    }
    if !matches_local {
        anyhow::bail!("workers disagreed with the local '{}' artifact", args.strategy);
    }
    Ok(())
}
