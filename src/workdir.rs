// src/workdir.rs

//! The hidden `.upkeep/` work directory.
//!
//! Holds everything the supervisor installs next to the project: the shim
//! artifact injected into the managed process, the copied self-update helper
//! and profiling snapshots. The directory is created at boot and given the
//! hidden attribute on Windows.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

pub const WORK_DIR_NAME: &str = ".upkeep";

/// Name of the self-update helper binary installed into the work directory.
pub const HELPER_FILE_NAME: &str = if cfg!(windows) {
    "upkeep-helper.exe"
} else {
    "upkeep-helper"
};

#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Work directory rooted at an explicit path.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `.upkeep` in the current working directory.
    pub fn default_location() -> Self {
        Self::at(WORK_DIR_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed and hide it on Windows.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating work directory {}", self.root.display()))?;
        hide_on_windows(&self.root);
        Ok(())
    }

    pub fn helper_path(&self) -> PathBuf {
        self.root.join(HELPER_FILE_NAME)
    }

    pub fn profiling_dir(&self) -> PathBuf {
        self.root.join("profiling")
    }

    /// Copy the shim artifact into the work directory, replacing any
    /// existing copy, and return the installed path.
    pub fn install_shim(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .with_context(|| format!("shim source {} has no file name", source.display()))?;
        let dest = self.root.join(file_name);
        std::fs::copy(source, &dest).with_context(|| {
            format!(
                "installing shim from {} to {}",
                source.display(),
                dest.display()
            )
        })?;
        hide_on_windows(&dest);
        debug!(path = %dest.display(), "shim installed");
        Ok(dest)
    }

    /// Copy the self-update helper binary into the work directory.
    pub fn install_helper(&self, source: &Path) -> Result<PathBuf> {
        let dest = self.helper_path();
        std::fs::copy(source, &dest).with_context(|| {
            format!(
                "installing helper from {} to {}",
                source.display(),
                dest.display()
            )
        })?;
        hide_on_windows(&dest);
        debug!(path = %dest.display(), "self-update helper installed");
        Ok(dest)
    }

    /// Write a profiling snapshot as pretty JSON and return its path.
    pub fn write_profiling_snapshot(&self, snapshot: &serde_json::Value) -> Result<PathBuf> {
        let dir = self.profiling_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating profiling directory {}", dir.display()))?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let path = dir.join(format!("{millis}.json"));
        let contents =
            serde_json::to_vec_pretty(snapshot).context("serializing profiling snapshot")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("writing profiling snapshot {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(windows)]
fn hide_on_windows(path: &Path) {
    // attrib failures are ignored; the path just stays visible.
    let _ = std::process::Command::new("attrib")
        .arg("+H")
        .arg(path)
        .status();
}

#[cfg(not(windows))]
fn hide_on_windows(_path: &Path) {}
