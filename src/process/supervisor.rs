// src/process/supervisor.rs

//! Lifecycle of the single managed process.
//!
//! The supervisor holds at most one current [`ManagedProcess`]. Starting a
//! process also schedules a one-shot control-channel lookup after a grace
//! delay; destroying one notifies the shim first (when a channel resolved)
//! and then signals the reaper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::control::{ControlChannel, ControlRegistry};
use crate::errors::{Result, UpkeepError};
use crate::process::launch::{ExitNotice, KillSignal, LaunchPlan, LauncherBackend};
use crate::release::Release;

/// The currently supervised process.
///
/// Cheap to clone; clones share the kill channel, the exit notice and the
/// control-channel slot.
#[derive(Clone)]
pub struct ManagedProcess {
    pid: u32,
    release: Option<Release>,
    kill_tx: tokio::sync::mpsc::Sender<KillSignal>,
    exit_rx: watch::Receiver<Option<ExitNotice>>,
    channel: Arc<Mutex<Option<ControlChannel>>>,
}

impl ManagedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Release the process was started from, when known.
    pub fn release(&self) -> Option<&Release> {
        self.release.as_ref()
    }

    /// Await the exit notice. `None` means the exit could not be observed
    /// (the reaper went away without publishing); callers log and proceed.
    pub async fn wait_exit(&self) -> Option<ExitNotice> {
        let mut rx = self.exit_rx.clone();
        loop {
            if let Some(notice) = *rx.borrow() {
                return Some(notice);
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }

    /// Exit notice if the process has already exited.
    pub fn exit_notice(&self) -> Option<ExitNotice> {
        *self.exit_rx.borrow()
    }

    async fn channel(&self) -> Option<ControlChannel> {
        self.channel.lock().await.clone()
    }
}

/// Constructor-injected settings for a [`Supervisor`].
pub struct SupervisorSettings {
    /// Command line every start uses.
    pub plan: LaunchPlan,
    /// Artifact path checked by `try_first_start`.
    pub artifact: PathBuf,
    /// Discovery name the shim is expected to bind.
    pub discovery_name: String,
    /// Delay before the single control-channel lookup attempt.
    pub channel_grace: Duration,
}

#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    launcher: Arc<dyn LauncherBackend>,
    registry: ControlRegistry,
    settings: SupervisorSettings,
    slot: Mutex<Option<ManagedProcess>>,
}

impl Supervisor {
    pub fn new(
        launcher: Arc<dyn LauncherBackend>,
        registry: ControlRegistry,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                launcher,
                registry,
                settings,
                slot: Mutex::new(None),
            }),
        }
    }

    /// Launch the managed process, tagged with the release it runs.
    ///
    /// A failed launch is logged and leaves the supervisor with no current
    /// process; it does not propagate.
    pub async fn start(&self, release: Option<Release>) {
        let tag = release
            .as_ref()
            .map(|r| r.tag.clone())
            .unwrap_or_else(|| "<untagged>".to_string());

        match self
            .inner
            .launcher
            .launch(self.inner.settings.plan.clone())
            .await
        {
            Ok(handle) => {
                let process = ManagedProcess {
                    pid: handle.pid,
                    release,
                    kill_tx: handle.kill_tx,
                    exit_rx: handle.exit_rx,
                    channel: Arc::new(Mutex::new(None)),
                };
                info!(pid = process.pid, tag = %tag, "managed process started");
                *self.inner.slot.lock().await = Some(process.clone());
                self.spawn_channel_lookup(process);
            }
            Err(e) => {
                error!(tag = %tag, error = %e, "failed to start managed process");
                *self.inner.slot.lock().await = None;
            }
        }
    }

    /// Start only when the artifact file already exists; used at boot when
    /// release checking is not polling.
    pub async fn try_first_start(&self) {
        if !self.inner.settings.artifact.exists() {
            debug!(
                artifact = %self.inner.settings.artifact.display(),
                "artifact not present; skipping first start"
            );
            return;
        }
        self.start(None).await;
    }

    /// Terminate the managed process. No-op when nothing is running.
    ///
    /// The shim is notified first when a channel resolved; notification
    /// failures are logged and never delay termination.
    pub async fn destroy(&self, forcibly: bool) {
        let Some(process) = self.current().await else {
            debug!("destroy requested with no managed process");
            return;
        };

        if let Some(channel) = process.channel().await {
            if let Err(e) = channel.notify_shutdown().await {
                warn!(pid = process.pid, error = %e, "shutdown notification failed; terminating anyway");
            }
        }

        let signal = if forcibly {
            KillSignal::Forcible
        } else {
            KillSignal::Graceful
        };
        info!(pid = process.pid, ?signal, "terminating managed process");
        if process.kill_tx.send(signal).await.is_err() {
            debug!(pid = process.pid, "managed process already reaped");
        }
    }

    /// Drop the current reference without terminating the process.
    pub async fn clear(&self) {
        *self.inner.slot.lock().await = None;
    }

    /// Snapshot of the current managed process.
    pub async fn current(&self) -> Option<ManagedProcess> {
        self.inner.slot.lock().await.clone()
    }

    /// Profiling snapshot via the control channel.
    pub async fn process_profile(&self) -> Result<serde_json::Value> {
        let process = self.current().await.ok_or(UpkeepError::ProcessNotRunning)?;
        let channel = process.channel().await.ok_or_else(|| {
            UpkeepError::ChannelUnavailable("no shim bound for the managed process".to_string())
        })?;
        channel.process_profile().await
    }

    /// After the grace delay, try exactly once to resolve the shim's
    /// binding. Failure leaves the process without a channel.
    fn spawn_channel_lookup(&self, process: ManagedProcess) {
        let registry = self.inner.registry.clone();
        let name = self.inner.settings.discovery_name.clone();
        let grace = self.inner.settings.channel_grace;

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            match registry.lookup(&name).await {
                Ok(channel) => {
                    info!(name = %name, pid = process.pid, "control channel resolved");
                    *process.channel.lock().await = Some(channel);
                }
                Err(e) => {
                    warn!(name = %name, pid = process.pid, error = %e, "control channel lookup failed; continuing without it");
                }
            }
        });
    }
}
