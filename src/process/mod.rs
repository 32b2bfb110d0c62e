// src/process/mod.rs

pub mod launch;
pub mod supervisor;

pub use launch::{
    ExitNotice, KillSignal, LaunchPlan, LauncherBackend, RealLauncherBackend, SpawnHandle,
};
pub use supervisor::{ManagedProcess, Supervisor, SupervisorSettings};
