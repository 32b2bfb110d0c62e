// src/selfupdate/mod.rs

//! Replace the supervisor's own binary via a detached helper process.
//!
//! The supervisor cannot overwrite itself while running, so the hand-off
//! goes: resolve everything that can fail, copy the helper binary into the
//! work directory, terminate the managed process, spawn the helper detached
//! and exit. The helper waits for this process to disappear, swaps the
//! binary and relaunches the original command line.

pub mod cmdline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use regex::Regex;
use tracing::info;

use crate::errors::{Result, UpkeepError};
use crate::process::Supervisor;
use crate::release::ReleaseSource;
use crate::workdir::WorkDir;

/// Everything `execute` needs, resolved up front by `prepare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperLaunch {
    /// Installed helper binary inside the work directory.
    pub helper: PathBuf,
    pub supervisor_pid: u32,
    /// The binary the helper will replace.
    pub binary: PathBuf,
    /// Command line the helper relaunches after the swap.
    pub relaunch_cmd: String,
    pub download_url: String,
}

impl HelperLaunch {
    /// Argument order the helper expects:
    /// `<pid> <binary> <relaunch-cmd> <url>`.
    pub fn args(&self) -> Vec<String> {
        vec![
            self.supervisor_pid.to_string(),
            self.binary.display().to_string(),
            self.relaunch_cmd.clone(),
            self.download_url.clone(),
        ]
    }
}

pub struct SelfUpdater {
    source: Arc<dyn ReleaseSource>,
    asset_regex: Regex,
    enabled: bool,
    workdir: WorkDir,
    supervisor: Supervisor,
    /// Helper binary to install; normally the `upkeep-helper` shipped next
    /// to the supervisor binary.
    helper_source: PathBuf,
}

impl SelfUpdater {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        asset_regex: Regex,
        enabled: bool,
        workdir: WorkDir,
        supervisor: Supervisor,
        helper_source: PathBuf,
    ) -> Self {
        Self {
            source,
            asset_regex,
            enabled,
            workdir,
            supervisor,
            helper_source,
        }
    }

    /// Resolve the download URL, capture the current binary and command
    /// line and install the helper. Fails on an unknown tag before any
    /// process is killed or file deleted.
    pub async fn prepare(&self, tag: &str) -> Result<HelperLaunch> {
        if !self.enabled {
            return Err(UpkeepError::SelfUpdateDisabled);
        }

        let release = self
            .source
            .by_tag(tag)
            .await?
            .ok_or_else(|| UpkeepError::ReleaseNotFound(tag.to_string()))?;
        let asset = release
            .assets
            .iter()
            .find(|a| self.asset_regex.is_match(&a.name))
            .ok_or_else(|| UpkeepError::NoMatchingAsset(release.display_name().to_string()))?;

        let binary = std::env::current_exe().context("resolving current executable")?;
        let relaunch_cmd = cmdline::current_cmdline()?;

        if !self.helper_source.exists() {
            return Err(UpkeepError::ConfigError(format!(
                "helper binary not found at {}",
                self.helper_source.display()
            )));
        }
        let helper = self.workdir.install_helper(&self.helper_source)?;

        Ok(HelperLaunch {
            helper,
            supervisor_pid: std::process::id(),
            binary,
            relaunch_cmd,
            download_url: asset.download_url.clone(),
        })
    }

    /// Terminate the managed process, spawn the helper detached with
    /// inherited stdio and exit the supervisor.
    ///
    /// Only returns on spawn failure; by then the managed process has
    /// already been told to shut down.
    pub async fn execute(&self, launch: HelperLaunch) -> Result<()> {
        info!(url = %launch.download_url, "handing off to self-update helper");
        self.supervisor.destroy(false).await;

        std::process::Command::new(&launch.helper)
            .args(launch.args())
            .spawn()
            .with_context(|| {
                format!("spawning self-update helper {}", launch.helper.display())
            })?;

        std::process::exit(0);
    }

    /// `prepare` + `execute`.
    pub async fn run(&self, tag: &str) -> Result<()> {
        let launch = self.prepare(tag).await?;
        self.execute(launch).await
    }
}
