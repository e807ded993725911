// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-tune schedule` command: show the core blocks and the launch
//! environment each worker would receive.

use cpu_topology::AffinityDirective;
use std::path::PathBuf;

pub async fn execute(
    workers: usize,
    cores_per_worker: Option<usize>,
    lscpu: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            accel-tune · Worker Schedule              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let scheduler = super::load_scheduler(lscpu.as_deref())?;
    println!("  {}", scheduler.topology().summary());
    println!();

    let schedule = scheduler.schedule(workers, cores_per_worker)?;
    let directives = AffinityDirective::for_schedule(&schedule);

    println!(
        "  {} workers × {} physical cores",
        schedule.num_workers(),
        schedule.cores_per_worker()
    );
    if schedule.is_empty() {
        println!("  Not enough physical cores for one per worker: affinity disabled.");
    }
    println!();

    // ── Directives ─────────────────────────────────────────────
    for directive in &directives {
        println!("  Worker {}", directive.worker_index);
        for (name, value) in directive.env_vars() {
            println!("   {name}={value}");
        }
    }
    Ok(())
}
