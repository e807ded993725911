// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-tune
//!
//! Command-line interface for the accel-tune workspace.
//!
//! ## Usage
//! ```bash
//! # Search the default strategy subset on the demo model
//! accel-tune search --in-features 256 --out-features 10
//!
//! # Only int8 strategies, with a report written to disk
//! accel-tune search --precisions int8 --report ./search-report.json
//!
//! # Show the core blocks 4 workers would get
//! accel-tune schedule --workers 4
//!
//! # Serve the int8 artifact of the demo model from 2 pinned worker processes
//! accel-tune serve --workers 2 --requests 64 --strategy int8
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accel-tune",
    about = "Find the fastest way to run a model and serve it on pinned cores",
    version,
    author
)]
struct Cli {
    /// Path to a TOML search configuration (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search acceleration strategies for the demo model.
    Search(commands::search::SearchArgs),

    /// Print the per-worker core blocks and launch environment.
    Schedule {
        /// Number of worker processes.
        #[arg(short, long)]
        workers: usize,

        /// Physical cores per worker (default: an even split).
        #[arg(long)]
        cores_per_worker: Option<usize>,

        /// Read the topology from saved `lscpu --parse=CPU,Core,Socket`
        /// output instead of probing this host.
        #[arg(long)]
        lscpu: Option<PathBuf>,
    },

    /// Display the CPU topology and cgroup core restriction of this host.
    Topology {
        /// Read saved `lscpu --parse=CPU,Core,Socket` output instead.
        #[arg(long)]
        lscpu: Option<PathBuf>,
    },

    /// Serve the demo model from pinned worker processes and send it requests.
    Serve(commands::serve::ServeArgs),

    /// Run as a worker process (spawned by `serve`).
    #[command(hide = true)]
    Worker(commands::worker::WorkerArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Search(args) => commands::search::execute(args, cli.config).await,
        Commands::Schedule {
            workers,
            cores_per_worker,
            lscpu,
        } => commands::schedule::execute(workers, cores_per_worker, lscpu).await,
        Commands::Topology { lscpu } => commands::topology::execute(lscpu).await,
        Commands::Serve(args) => commands::serve::execute(args, cli.verbose).await,
        Commands::Worker(args) => commands::worker::execute(args).await,
    }
}
