// src/errors.rs

//! Crate-wide error types and aliases.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpkeepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("A new configuration file was created at {0}; edit it before starting")]
    ConfigCreated(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Release index error: {0}")]
    ReleaseIndex(String),

    #[error("No release found for '{0}'")]
    ReleaseNotFound(String),

    #[error("Release '{0}' has no asset matching the configured pattern")]
    NoMatchingAsset(String),

    #[error("An update is already in flight")]
    UpdateInFlight,

    #[error("No managed process is running")]
    ProcessNotRunning,

    #[error("Control channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Control call failed: {0}")]
    ControlCall(String),

    #[error("Self-update is disabled in the configuration")]
    SelfUpdateDisabled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, UpkeepError>;
