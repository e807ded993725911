// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-tune topology` command: display logical → physical core mapping
//! and the cgroup restriction.

use std::path::PathBuf;

pub async fn execute(lscpu: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             accel-tune · CPU Topology                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let topology = super::load_topology(lscpu.as_deref())?;

    // ── Cores ──────────────────────────────────────────────────
    println!("  {:>8} {:>9} {:>7} {:>7}", "Logical", "Physical", "Socket", "Usable");
    println!("  {}", "-".repeat(34));
    let restricted = topology.restricting_set();
    for logical in topology.logical_cores() {
        let physical = topology
            .physical_core_of(logical)
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        let socket = topology
            .socket_of(logical)
            .map_or_else(|| "?".to_string(), |s| s.to_string());
        let usable = if restricted.contains(&logical) { "yes" } else { "no" };
        println!("  {logical:>8} {physical:>9} {socket:>7} {usable:>7}");
    }
    println!();

    // ── Summary ────────────────────────────────────────────────
    let usable = topology.usable_physical_cores();
    println!("  Usable physical cores: {} {:?}", usable.len(), usable);
    println!("  {}", topology.summary());
    Ok(())
}
