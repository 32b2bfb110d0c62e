// src/update/orchestrator.rs

//! Sequencing of kill, artifact replacement and restart.
//!
//! `kill_and_update` never blocks on the old process: with a process
//! running it terminates it and returns, leaving a continuation task to
//! await the exit notice, replace the artifact and start the new process.
//! A single-flight guard rejects overlapping update jobs.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, UpkeepError};
use crate::process::Supervisor;
use crate::release::{Release, ReleaseAsset, ReleaseSource, UpdateChecker};

#[derive(Clone)]
pub struct UpdateOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    supervisor: Supervisor,
    checker: Arc<UpdateChecker>,
    source: Arc<dyn ReleaseSource>,
    artifact: PathBuf,
    in_flight: Arc<AtomicBool>,
}

impl UpdateOrchestrator {
    pub fn new(
        supervisor: Supervisor,
        checker: Arc<UpdateChecker>,
        source: Arc<dyn ReleaseSource>,
        artifact: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                supervisor,
                checker,
                source,
                artifact,
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.inner.supervisor
    }

    /// Terminate the current process (if any), replace the artifact with
    /// the release's selected asset and start the new process.
    ///
    /// With a process running this returns as soon as termination is under
    /// way; the rest happens in a continuation once the exit notice
    /// arrives. An error exit is logged and the update proceeds anyway.
    /// A release with no matching asset fails before anything is killed.
    pub async fn kill_and_update(&self, release: Release) -> Result<()> {
        let guard = JobGuard::acquire(&self.inner.in_flight)?;

        let asset = self
            .inner
            .checker
            .select_asset(&release)
            .ok_or_else(|| UpkeepError::NoMatchingAsset(release.display_name().to_string()))?
            .clone();

        match self.inner.supervisor.current().await {
            None => {
                let result = self.replace_and_start(&release, &asset).await;
                drop(guard);
                result
            }
            Some(process) => {
                info!(
                    pid = process.pid(),
                    tag = %release.tag,
                    "terminating managed process for update"
                );
                self.inner.supervisor.destroy(false).await;

                let this = self.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    match process.wait_exit().await {
                        Some(notice) if !notice.success() => {
                            warn!(
                                code = ?notice.code,
                                "managed process exited with an error; updating anyway"
                            );
                        }
                        None => {
                            warn!("managed process exit could not be observed; updating anyway");
                        }
                        _ => {}
                    }
                    if let Err(e) = this.replace_and_start(&release, &asset).await {
                        error!(
                            tag = %release.tag,
                            error = %e,
                            "update failed after terminating the old process; not restarting"
                        );
                    }
                });
                Ok(())
            }
        }
    }

    /// One scheduled polling cycle: check for a new release and update to
    /// it. Errors are logged, never propagated into the scheduler.
    pub async fn run_check_cycle(&self) {
        match self.inner.checker.find_new().await {
            Ok(true) => {
                let Some(release) = self.inner.checker.latest_found().await else {
                    return;
                };
                info!(tag = %release.tag, name = %release.display_name(), "new release found");
                if let Err(e) = self.kill_and_update(release).await {
                    warn!(error = %e, "update could not be started");
                }
            }
            Ok(false) => {
                debug!("no new release");
            }
            Err(e) => {
                warn!(error = %e, "release check failed");
            }
        }
    }

    /// Operator update to the latest release.
    pub async fn update_to_latest(&self) -> Result<()> {
        let release = self
            .inner
            .checker
            .resolve_latest()
            .await?
            .ok_or_else(|| UpkeepError::ReleaseNotFound("latest".to_string()))?;
        self.kill_and_update(release).await
    }

    /// Operator update to an exact tag.
    pub async fn update_to_tag(&self, tag: &str) -> Result<()> {
        let release = self
            .inner
            .checker
            .release_by_tag(tag)
            .await?
            .ok_or_else(|| UpkeepError::ReleaseNotFound(tag.to_string()))?;
        self.kill_and_update(release).await
    }

    /// Operator start, tagged with whatever release the checker last saw.
    pub async fn start_process(&self) {
        let release = self.inner.checker.latest_found().await;
        self.inner.supervisor.start(release).await;
    }

    async fn replace_and_start(&self, release: &Release, asset: &ReleaseAsset) -> Result<()> {
        self.replace_artifact(asset).await?;
        self.inner.supervisor.start(Some(release.clone())).await;
        Ok(())
    }

    /// Delete the old artifact and stream the asset into its place.
    async fn replace_artifact(&self, asset: &ReleaseAsset) -> Result<()> {
        let artifact = &self.inner.artifact;

        if let Some(parent) = artifact.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if let Err(e) = tokio::fs::remove_file(artifact).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(UpkeepError::IoError(e));
            }
        }

        info!(asset = %asset.name, dest = %artifact.display(), "downloading release asset");
        self.inner
            .source
            .fetch_to(&asset.download_url, artifact)
            .await?;
        Ok(())
    }
}

/// RAII single-flight guard; released when the update job finishes,
/// wherever that happens.
struct JobGuard {
    flag: Arc<AtomicBool>,
}

impl JobGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(Self {
                flag: Arc::clone(flag),
            })
        } else {
            Err(UpkeepError::UpdateInFlight)
        }
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
