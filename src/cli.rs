// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `upkeep`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "upkeep",
    version,
    about = "Keep a single process running and up to date with its releases.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Upkeep.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Upkeep.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `UPKEEP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. Running with none behaves like `run`.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the supervisor (the default).
    Run,

    /// Write a default config file and exit.
    Init,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
