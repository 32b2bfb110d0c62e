// src/main.rs

//! Detached helper that swaps the supervisor binary and relaunches it.
//!
//! Spawned by `upkeep` right before it exits, with:
//! `upkeep-helper <pid> <binary> <relaunch-cmd> <url>`
//!
//! The helper waits for `<pid>` to disappear, replaces `<binary>` with the
//! file downloaded from `<url>`, writes a relaunch script for
//! `<relaunch-cmd>` into the hidden work directory and launches it with
//! inherited stdio. Progress goes to stdout as short banner lines; this is
//! the only console the operator still sees at that point.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;

const WORK_DIR: &str = ".upkeep";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("upkeep-helper error: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 4 {
        bail!("usage: upkeep-helper <pid> <binary> <relaunch-cmd> <url>");
    }
    let pid: u32 = args[0].parse().context("parsing supervisor pid")?;
    let binary = PathBuf::from(&args[1]);
    let relaunch_cmd = &args[2];
    let url = &args[3];

    banner(&format!("waiting for supervisor (pid {pid}) to exit"));
    wait_for_exit(pid).await;

    banner("downloading new supervisor binary");
    replace_binary(&binary, url).await?;

    banner("relaunching");
    let script = write_relaunch_script(relaunch_cmd)?;
    launch(&script)?;

    banner("done");
    Ok(())
}

async fn wait_for_exit(pid: u32) {
    while process_alive(pid) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        // EPERM means the pid exists but belongs to someone else.
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    let output = std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/NH", "/FO", "CSV"])
        .output();
    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains(&format!("\"{pid}\"")),
        Err(_) => false,
    }
}

async fn replace_binary(binary: &Path, url: &str) -> Result<()> {
    if let Some(parent) = binary.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    if let Err(e) = std::fs::remove_file(binary) {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Err(e).with_context(|| format!("removing {}", binary.display()));
        }
    }

    let mut response = reqwest::get(url)
        .await
        .context("requesting new binary")?
        .error_for_status()
        .context("download failed")?;

    let mut file = tokio::fs::File::create(binary)
        .await
        .with_context(|| format!("creating {}", binary.display()))?;
    while let Some(chunk) = response.chunk().await.context("reading download stream")? {
        file.write_all(&chunk).await.context("writing new binary")?;
    }
    file.flush().await.context("flushing new binary")?;
    drop(file);

    make_executable(binary)?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .with_context(|| format!("reading permissions of {}", path.display()))?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)
        .with_context(|| format!("restoring executable bit on {}", path.display()))
}

#[cfg(windows)]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn write_relaunch_script(cmd: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(WORK_DIR);
    std::fs::create_dir_all(&dir).context("creating work directory")?;

    let path = dir.join(if cfg!(windows) {
        "relaunch.bat"
    } else {
        "relaunch.sh"
    });
    let contents = if cfg!(windows) {
        format!("{cmd}\r\n")
    } else {
        format!("#!/usr/bin/env sh\n{cmd}\n")
    };
    std::fs::write(&path, contents)
        .with_context(|| format!("writing relaunch script {}", path.display()))?;

    make_executable(&path)?;
    hide_on_windows(&path);
    Ok(path)
}

#[cfg(windows)]
fn hide_on_windows(path: &Path) {
    let _ = std::process::Command::new("attrib")
        .arg("+H")
        .arg(path)
        .status();
}

#[cfg(not(windows))]
fn hide_on_windows(_path: &Path) {}

fn launch(script: &Path) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = std::process::Command::new("sh");
        c.arg(script);
        c
    };
    cmd.spawn()
        .with_context(|| format!("launching relaunch script {}", script.display()))?;
    Ok(())
}

fn banner(text: &str) {
    println!("\x1b[94;1m==== \x1b[36;1m{text} \x1b[94;1m====\x1b[0m");
}
