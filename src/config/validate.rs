// src/config/validate.rs

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, UpkeepError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::UpkeepError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let asset_regex = compile_pattern("[update].asset_pattern", &raw.update.asset_pattern)?;
        let self_update_regex =
            compile_pattern("[self_update].asset_pattern", &raw.self_update.asset_pattern)?;
        Ok(ConfigFile::new_unchecked(raw, asset_regex, self_update_regex))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_process(cfg)?;
    validate_github(cfg)?;
    validate_webhook(cfg)?;
    Ok(())
}

fn validate_process(cfg: &RawConfigFile) -> Result<()> {
    if cfg.process.artifact.trim().is_empty() {
        return Err(UpkeepError::ConfigError(
            "[process].artifact must be set".to_string(),
        ));
    }
    if cfg.process.runtime.trim().is_empty() {
        return Err(UpkeepError::ConfigError(
            "[process].runtime must be set".to_string(),
        ));
    }
    if !cfg.process.inject_arg.contains("{shim}") || !cfg.process.inject_arg.contains("{payload}")
    {
        return Err(UpkeepError::ConfigError(
            "[process].inject_arg must contain the {shim} and {payload} placeholders".to_string(),
        ));
    }
    if !cfg
        .process
        .invoke_args
        .iter()
        .any(|arg| arg.contains("{artifact}"))
    {
        return Err(UpkeepError::ConfigError(
            "[process].invoke_args must reference {artifact}".to_string(),
        ));
    }
    Ok(())
}

fn validate_github(cfg: &RawConfigFile) -> Result<()> {
    // Only required when release checking will actually query the index.
    if cfg.update.check_interval_minutes > 0
        && (cfg.github.owner.trim().is_empty() || cfg.github.repo.trim().is_empty())
    {
        return Err(UpkeepError::ConfigError(
            "[github].owner and [github].repo must be set when update checking is enabled"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_webhook(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.webhook.logging_url.trim().is_empty() && cfg.webhook.credentials().is_none() {
        return Err(UpkeepError::ConfigError(
            "[webhook].logging_url must end in the id and token path segments".to_string(),
        ));
    }
    Ok(())
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| UpkeepError::ConfigError(format!("{field} is not a valid regex: {e}")))
}
