// src/selfupdate/cmdline.rs

//! Capture the full command line of the current process, so the helper can
//! relaunch the supervisor exactly as the operator started it.

use anyhow::Context;

use crate::errors::Result;

/// The current process's original command line, joined with spaces.
pub fn current_cmdline() -> Result<String> {
    let cmdline = read_cmdline()?;
    if cmdline.trim().is_empty() {
        return Err(anyhow::anyhow!("captured command line is empty").into());
    }
    Ok(cmdline)
}

#[cfg(target_os = "linux")]
fn read_cmdline() -> anyhow::Result<String> {
    let raw = std::fs::read("/proc/self/cmdline").context("reading /proc/self/cmdline")?;
    let joined = raw
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(joined)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn read_cmdline() -> anyhow::Result<String> {
    let output = std::process::Command::new("ps")
        .args(["-o", "command=", "-p", &std::process::id().to_string()])
        .output()
        .context("running ps for the current command line")?;
    anyhow::ensure!(output.status.success(), "ps exited with {}", output.status);
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(windows)]
fn read_cmdline() -> anyhow::Result<String> {
    let output = std::process::Command::new("wmic")
        .args([
            "process",
            "where",
            &format!("processid={}", std::process::id()),
            "get",
            "commandline",
            "/format:list",
        ])
        .output()
        .context("running wmic for the current command line")?;
    anyhow::ensure!(
        output.status.success(),
        "wmic exited with {}",
        output.status
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("CommandLine=") {
            return Ok(rest.trim().to_string());
        }
    }
    anyhow::bail!("wmic output did not contain a CommandLine entry")
}
