// src/process/launch.rs

//! Launch plans and the pluggable launcher backend.
//!
//! The supervisor talks to a [`LauncherBackend`] instead of spawning
//! processes itself. Production uses [`RealLauncherBackend`]; tests provide
//! a fake that records plans and fabricates exits.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::Context;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::errors::Result;

/// Fully resolved command line for the managed process:
/// runtime binary, injection argument, runtime arguments, artifact
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// Build the plan from configuration, filling in the `{shim}`,
    /// `{payload}` and `{artifact}` placeholders.
    pub fn build(cfg: &ConfigFile, shim: &Path, payload: &str, artifact: &Path) -> Self {
        let fill = |arg: &str| {
            arg.replace("{shim}", &shim.display().to_string())
                .replace("{payload}", payload)
                .replace("{artifact}", &artifact.display().to_string())
        };

        let mut args = Vec::with_capacity(2 + cfg.process.runtime_args.len());
        args.push(fill(&cfg.process.inject_arg));
        args.extend(cfg.process.runtime_args.iter().map(|a| fill(a)));
        args.extend(cfg.process.invoke_args.iter().map(|a| fill(a)));

        Self {
            program: cfg.process.runtime.clone(),
            args,
        }
    }
}

/// Portable capture of a child's exit status; fakes can fabricate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitNotice {
    pub code: Option<i32>,
}

impl ExitNotice {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn from_status(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSignal {
    /// SIGTERM on Unix; plain kill on Windows.
    Graceful,
    /// Immediate kill.
    Forcible,
}

/// What a launcher backend hands back for a spawned process.
///
/// The exit receiver publishes the [`ExitNotice`] exactly once. Dropping
/// the handle never kills the child; only a [`KillSignal`] does.
pub struct SpawnHandle {
    pub pid: u32,
    pub kill_tx: mpsc::Sender<KillSignal>,
    pub exit_rx: watch::Receiver<Option<ExitNotice>>,
}

/// Trait abstracting how the managed process is spawned.
pub trait LauncherBackend: Send + Sync {
    fn launch(
        &self,
        plan: LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnHandle>> + Send + '_>>;
}

/// Real launcher backend used in production.
///
/// Spawns the process with inherited stdio (its output belongs on the
/// supervisor's console) and runs a reaper task that waits for the exit,
/// relays kill signals and publishes the exit notice.
pub struct RealLauncherBackend;

impl LauncherBackend for RealLauncherBackend {
    fn launch(
        &self,
        plan: LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnHandle>> + Send + '_>> {
        Box::pin(async move {
            let mut cmd = Command::new(&plan.program);
            cmd.args(&plan.args);
            // Dropping handles must not kill the managed process.
            cmd.kill_on_drop(false);

            let child = cmd
                .spawn()
                .with_context(|| format!("spawning managed process '{}'", plan.program))?;
            let pid = child.id().unwrap_or_default();
            info!(pid, program = %plan.program, "managed process spawned");

            let (kill_tx, kill_rx) = mpsc::channel(4);
            let (exit_tx, exit_rx) = watch::channel(None);
            tokio::spawn(reap(child, pid, kill_rx, exit_tx));

            Ok(SpawnHandle {
                pid,
                kill_tx,
                exit_rx,
            })
        })
    }
}

/// Wait for the child to exit, relaying kill requests along the way, and
/// publish the exit notice exactly once.
async fn reap(
    mut child: Child,
    pid: u32,
    mut kill_rx: mpsc::Receiver<KillSignal>,
    exit_tx: watch::Sender<Option<ExitNotice>>,
) {
    loop {
        tokio::select! {
            status = child.wait() => {
                publish_exit(pid, status, &exit_tx);
                return;
            }
            signal = kill_rx.recv() => {
                match signal {
                    Some(KillSignal::Graceful) => terminate_gracefully(pid, &mut child),
                    Some(KillSignal::Forcible) => {
                        if let Err(e) = child.start_kill() {
                            warn!(pid, error = %e, "forcible kill failed");
                        }
                    }
                    None => {
                        // All kill handles dropped; keep waiting so the exit
                        // is still observed and logged.
                        let status = child.wait().await;
                        publish_exit(pid, status, &exit_tx);
                        return;
                    }
                }
            }
        }
    }
}

fn publish_exit(
    pid: u32,
    status: std::io::Result<std::process::ExitStatus>,
    exit_tx: &watch::Sender<Option<ExitNotice>>,
) {
    match status {
        Ok(status) => {
            let notice = ExitNotice::from_status(status);
            info!(pid, code = ?notice.code, success = notice.success(), "managed process exited");
            let _ = exit_tx.send(Some(notice));
        }
        Err(e) => {
            // Waiters see the sender drop without a notice and treat it as
            // an observation failure.
            warn!(pid, error = %e, "failed waiting on managed process");
        }
    }
}

#[cfg(unix)]
fn terminate_gracefully(pid: u32, child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(pid, error = %e, "SIGTERM failed; falling back to kill");
        if let Err(e) = child.start_kill() {
            warn!(pid, error = %e, "fallback kill failed");
        }
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(pid: u32, child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(pid, error = %e, "kill failed");
    }
}
