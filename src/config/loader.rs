// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, UpkeepError};

/// Contents written for a fresh config file.
const DEFAULT_CONFIG: &str = r#"# upkeep configuration

[process]
# Path of the artifact the managed process runs from. Replaced on update.
artifact = "app.jar"
# Runtime binary that executes the artifact.
runtime = "java"
# Extra runtime arguments, placed after the injection argument.
runtime_args = []
# Shim injection argument; {shim} and {payload} are filled in at launch.
inject_arg = "-javaagent:{shim}={payload}"
# Invocation of the artifact itself.
invoke_args = ["-jar", "{artifact}"]

[update]
# Minutes between release checks. 0 = never check, just start the existing
# artifact at boot. Negative = fully disabled.
check_interval_minutes = 10
# First release asset whose name matches this regex is downloaded.
asset_pattern = ".*\\.jar"

[github]
# Repository whose releases are watched.
owner = ""
repo = ""

[self_update]
# Allow the `selfupdate` console command.
enabled = true
# Asset holding the new supervisor binary.
asset_pattern = "(?i)upkeep-.*"

[webhook]
# Optional logging webhook handed to the shim (never called by upkeep).
logging_url = ""

[shim]
# Shim artifact injected into the managed process.
source = "upkeep-shim.jar"
"#;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
/// reads TOML, applies defaults, compiles the asset patterns and checks the
/// launch templates.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Load the config, writing a default file first when none exists.
///
/// A freshly written file is reported as an error: the defaults are not
/// usable until the operator fills in the repository coordinates, and
/// starting with them would just poll nothing.
pub fn load_or_init(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        write_default(path)?;
        return Err(UpkeepError::ConfigCreated(path.display().to_string()));
    }
    load_and_validate(path)
}

/// Write the default config file, failing if one already exists.
pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(UpkeepError::ConfigError(format!(
            "refusing to overwrite existing config at {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, DEFAULT_CONFIG)?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Upkeep.toml")
}
