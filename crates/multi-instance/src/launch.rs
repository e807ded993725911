// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! How worker processes are started.

use cpu_topology::AffinityDirective;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// The command line of a worker process.
///
/// The program must rebuild the model it serves and call
/// [`worker::run_stdio`](crate::worker::run_stdio).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLauncher {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl WorkerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// An extra variable set in every worker (e.g. `RUST_LOG`).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The launch configuration of one worker.
    pub fn config_for(&self, directive: &AffinityDirective) -> LaunchConfig {
        let mut env: Vec<(String, String)> = self.env.clone();
        env.extend(
            directive
                .env_vars()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v)),
        );
        LaunchConfig {
            worker_index: directive.worker_index,
            env,
        }
    }

    /// Builds the spawn command for `config`.
    ///
    /// Directive variables go straight onto the command; the coordinator's
    /// own environment is never modified. Stdin and stdout are piped, stderr
    /// is inherited so worker logs reach the terminal, and the child is
    /// killed if its handle is dropped.
    pub fn command(&self, config: &LaunchConfig) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// Environment and identity of a single worker launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub worker_index: usize,
    pub env: Vec<(String, String)>,
}

impl LaunchConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        // Later entries win, matching how `Command::envs` applies them.
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpu_topology::{AffinityMask, AFFINITY_VAR, THREADS_VAR, WORKER_INDEX_VAR};

    fn directive() -> AffinityDirective {
        AffinityDirective {
            affinity: AffinityMask::Explicit(vec![4, 5]),
            thread_count: 2,
            worker_index: 1,
        }
    }

    #[test]
    fn test_config_carries_directive() {
        let launcher = WorkerLauncher::new("/bin/worker")
            .arg("worker")
            .env("RUST_LOG", "debug");
        let cfg = launcher.config_for(&directive());
        assert_eq!(cfg.worker_index, 1);
        assert_eq!(
            cfg.get(AFFINITY_VAR),
            Some("granularity=fine,proclist=[4,5],explicit")
        );
        assert_eq!(cfg.get(THREADS_VAR), Some("2"));
        assert_eq!(cfg.get(WORKER_INDEX_VAR), Some("1"));
        assert_eq!(cfg.get("RUST_LOG"), Some("debug"));
        assert_eq!(launcher.get_args(), ["worker".to_string()]);
    }

    #[test]
    fn test_directive_overrides_launcher_env() {
        let launcher = WorkerLauncher::new("w").env(THREADS_VAR, "64");
        let cfg = launcher.config_for(&directive());
        assert_eq!(cfg.get(THREADS_VAR), Some("2"));
    }

    #[test]
    fn test_command_does_not_touch_own_env() {
        let launcher = WorkerLauncher::new("w");
        let _cmd = launcher.command(&launcher.config_for(&directive()));
        assert!(std::env::var(WORKER_INDEX_VAR).is_err());
    }
}
