// src/console.rs

//! Interactive operator console on stdin.
//!
//! Logs go to stderr, so stdout belongs to this console (and to whatever
//! the managed process prints with inherited stdio). EOF ends the console
//! task without shutting the supervisor down.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::UpkeepError;
use crate::selfupdate::SelfUpdater;
use crate::update::UpdateOrchestrator;
use crate::workdir::WorkDir;

pub struct Console {
    orchestrator: UpdateOrchestrator,
    selfupdater: SelfUpdater,
    workdir: WorkDir,
    artifact: PathBuf,
    shutdown_tx: mpsc::Sender<()>,
}

pub fn spawn_console(console: Console) -> JoinHandle<()> {
    tokio::spawn(console.run())
}

impl Console {
    pub fn new(
        orchestrator: UpdateOrchestrator,
        selfupdater: SelfUpdater,
        workdir: WorkDir,
        artifact: PathBuf,
        shutdown_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            orchestrator,
            selfupdater,
            workdir,
            artifact,
            shutdown_tx,
        }
    }

    pub async fn run(self) {
        println!("upkeep console ready; type 'help' for commands");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => self.dispatch(line.trim()).await,
                Ok(None) => {
                    debug!("console stdin closed");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "console read failed");
                    return;
                }
            }
        }
    }

    async fn dispatch(&self, line: &str) {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return;
        };

        match command {
            "help" => print_help(),
            "status" => self.status().await,
            "start" => self.start().await,
            "shutdown" => self.shutdown(parts.next() == Some("--force")).await,
            "update" => self.update(parts.next()).await,
            "profiling" => self.profiling().await,
            "selfupdate" => self.selfupdate(parts.next()).await,
            "quit" | "exit" => {
                let _ = self.shutdown_tx.send(()).await;
            }
            other => println!("unknown command '{other}'; type 'help'"),
        }
    }

    async fn status(&self) {
        match self.orchestrator.supervisor().current().await {
            Some(process) => {
                let tag = process
                    .release()
                    .map(|r| r.tag.clone())
                    .unwrap_or_else(|| "untagged".to_string());
                match process.exit_notice() {
                    Some(notice) => println!(
                        "process {} ({tag}) exited with code {:?}",
                        process.pid(),
                        notice.code
                    ),
                    None => println!("process {} running ({tag})", process.pid()),
                }
            }
            None => println!("no process running"),
        }
    }

    async fn start(&self) {
        let supervisor = self.orchestrator.supervisor();
        let running = supervisor
            .current()
            .await
            .is_some_and(|p| p.exit_notice().is_none());
        if running {
            println!("a process is already running; use 'shutdown' first");
            return;
        }
        if !self.artifact.exists() {
            println!(
                "artifact {} is missing; use 'update' first",
                self.artifact.display()
            );
            return;
        }
        self.orchestrator.start_process().await;
        match supervisor.current().await {
            Some(process) => println!("started process {}", process.pid()),
            None => println!("start failed; see the log"),
        }
    }

    async fn shutdown(&self, force: bool) {
        let supervisor = self.orchestrator.supervisor();
        if supervisor.current().await.is_none() {
            println!("no process is running");
            return;
        }
        supervisor.destroy(force).await;
        supervisor.clear().await;
        println!("shutdown signalled");
    }

    async fn update(&self, tag: Option<&str>) {
        let result = match tag {
            Some(tag) => self.orchestrator.update_to_tag(tag).await,
            None => self.orchestrator.update_to_latest().await,
        };
        match result {
            Ok(()) => println!("update under way"),
            Err(e) => println!("update failed: {e}"),
        }
    }

    async fn profiling(&self) {
        match self.orchestrator.supervisor().process_profile().await {
            Ok(snapshot) => match self.workdir.write_profiling_snapshot(&snapshot) {
                Ok(path) => println!("profiling snapshot written to {}", path.display()),
                Err(e) => println!("could not write the snapshot: {e}"),
            },
            Err(UpkeepError::ProcessNotRunning | UpkeepError::ChannelUnavailable(_)) => {
                println!("process not running or shim not attached");
            }
            Err(e) => println!("profiling failed: {e}"),
        }
    }

    async fn selfupdate(&self, tag: Option<&str>) {
        let Some(tag) = tag else {
            println!("usage: selfupdate <tag>");
            return;
        };
        // On success this never returns; the supervisor exits under the
        // helper's watch.
        if let Err(e) = self.selfupdater.run(tag).await {
            println!("self-update failed: {e}");
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  status             current process and release");
    println!("  start              start the managed process");
    println!("  shutdown [--force] stop the managed process");
    println!("  update [tag]       update to a tag or to the latest release");
    println!("  profiling          dump a profiling snapshot from the shim");
    println!("  selfupdate <tag>   replace the upkeep binary itself");
    println!("  quit               stop upkeep");
}
