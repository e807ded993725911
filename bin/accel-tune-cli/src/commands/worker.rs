// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hidden `accel-tune worker` command: the process `serve` spawns.
//!
//! Rebuilds the demo model from its flags, converts it with the requested
//! strategy, and answers requests on stdin/stdout under the directive found
//! in the environment.

use super::DemoModelArgs;
use strategy_catalog::ORIGINAL;

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub model: DemoModelArgs,

    /// Catalog name of the strategy to serve.
    #[arg(long, default_value = ORIGINAL)]
    pub strategy: String,
}

impl WorkerArgs {
    /// The flags that reproduce these arguments on a worker command line.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = self.model.to_args();
        args.push("--strategy".to_string());
        args.push(self.strategy.clone());
        args
    }
}

pub async fn execute(args: WorkerArgs) -> anyhow::Result<()> {
    let artifact = super::demo::demo_artifact(&args.model, &args.strategy)?;
    multi_instance::worker::run_stdio(artifact.as_ref()).await?;
    Ok(())
}
