// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod control;
pub mod errors;
pub mod logging;
pub mod process;
pub mod release;
pub mod selfupdate;
pub mod update;
pub mod workdir;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::config::loader::{load_or_init, write_default};
use crate::config::ConfigFile;
use crate::console::Console;
use crate::control::ControlRegistry;
use crate::process::{LaunchPlan, RealLauncherBackend, Supervisor, SupervisorSettings};
use crate::release::{GithubReleases, ReleaseSource, UpdateChecker};
use crate::selfupdate::SelfUpdater;
use crate::update::{spawn_schedule, CheckSchedule, UpdateOrchestrator};
use crate::workdir::{WorkDir, HELPER_FILE_NAME};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (writing a default file on first run)
/// - the work directory and shim installation
/// - the control registry
/// - supervisor / release checker / update orchestrator
/// - the check schedule, the operator console and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);

    if let Some(Command::Init) = args.command {
        write_default(&config_path)?;
        println!("wrote default config to {}", config_path.display());
        return Ok(());
    }

    let cfg = load_or_init(&config_path)?;

    let workdir = WorkDir::default_location();
    workdir.ensure()?;
    let shim_path = workdir.install_shim(&resolve_shim_source(&config_path, &cfg))?;

    let name = control::discovery_name(std::process::id());
    let registry = ControlRegistry::new();
    registry.bind(control::CONTROL_PORT).await?;

    let payload = control::encode_injection_payload(&name, cfg.webhook.credentials().as_ref());
    let artifact = PathBuf::from(&cfg.process.artifact);
    let plan = LaunchPlan::build(&cfg, &shim_path, &payload, &artifact);
    info!(program = %plan.program, artifact = %artifact.display(), "launch plan ready");

    let supervisor = Supervisor::new(
        Arc::new(RealLauncherBackend),
        registry.clone(),
        SupervisorSettings {
            plan,
            artifact: artifact.clone(),
            discovery_name: name,
            channel_grace: control::CHANNEL_GRACE,
        },
    );

    let source: Arc<dyn ReleaseSource> = Arc::new(GithubReleases::new(
        cfg.github.owner.clone(),
        cfg.github.repo.clone(),
    ));
    let checker = Arc::new(UpdateChecker::new(
        Arc::clone(&source),
        cfg.asset_regex().clone(),
    ));
    let orchestrator = UpdateOrchestrator::new(
        supervisor.clone(),
        Arc::clone(&checker),
        Arc::clone(&source),
        artifact.clone(),
    );
    let selfupdater = SelfUpdater::new(
        Arc::clone(&source),
        cfg.self_update_regex().clone(),
        cfg.self_update.enabled,
        workdir.clone(),
        supervisor.clone(),
        helper_source_path()?,
    );

    let schedule = CheckSchedule::from_minutes(cfg.update.check_interval_minutes);
    let _check_task = spawn_schedule(schedule, orchestrator.clone()).await;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    // Ctrl-C → graceful shutdown.
    {
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(()).await;
        });
    }

    let _console_task = console::spawn_console(Console::new(
        orchestrator,
        selfupdater,
        workdir,
        artifact,
        shutdown_tx,
    ));

    shutdown_rx.recv().await;
    info!("shutting down");
    supervisor.destroy(false).await;
    registry.shutdown().await;
    Ok(())
}

/// Shim source from config, resolved relative to the config file when it
/// is not absolute.
fn resolve_shim_source(config_path: &Path, cfg: &ConfigFile) -> PathBuf {
    let source = PathBuf::from(&cfg.shim.source);
    if source.is_absolute() {
        return source;
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(source),
        _ => source,
    }
}

/// The helper binary ships next to the supervisor binary.
fn helper_source_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let dir = exe
        .parent()
        .context("current executable has no parent directory")?;
    Ok(dir.join(HELPER_FILE_NAME))
}
