// src/config/model.rs

use regex::Regex;
use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [process]
/// artifact = "server/app.jar"
/// runtime = "java"
/// runtime_args = ["-Xmx2G"]
///
/// [update]
/// check_interval_minutes = 10
/// asset_pattern = "server-.*\\.jar"
///
/// [github]
/// owner = "acme"
/// repo = "server"
/// ```
///
/// All sections are optional and have defaults; validation decides which
/// combinations are actually usable.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Managed process launch settings from `[process]`.
    #[serde(default)]
    pub process: ProcessSection,

    /// Release checking from `[update]`.
    #[serde(default)]
    pub update: UpdateSection,

    /// Release index coordinates from `[github]`.
    #[serde(default)]
    pub github: GithubSection,

    /// Supervisor self-update from `[self_update]`.
    #[serde(default)]
    pub self_update: SelfUpdateSection,

    /// Optional logging webhook passed through to the shim, from `[webhook]`.
    #[serde(default)]
    pub webhook: WebhookSection,

    /// Shim artifact location from `[shim]`.
    #[serde(default)]
    pub shim: ShimSection,
}

/// `[process]` section: how the managed process is launched.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSection {
    /// Path of the artifact the managed process runs from. Replaced in place
    /// on update.
    #[serde(default)]
    pub artifact: String,

    /// Runtime binary that executes the artifact.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Extra runtime arguments, placed after the injection argument.
    #[serde(default)]
    pub runtime_args: Vec<String>,

    /// Template for the shim injection argument. Must contain `{shim}` and
    /// `{payload}`.
    #[serde(default = "default_inject_arg")]
    pub inject_arg: String,

    /// Arguments that invoke the artifact. Must reference `{artifact}`.
    #[serde(default = "default_invoke_args")]
    pub invoke_args: Vec<String>,
}

fn default_runtime() -> String {
    "java".to_string()
}

fn default_inject_arg() -> String {
    "-javaagent:{shim}={payload}".to_string()
}

fn default_invoke_args() -> Vec<String> {
    vec!["-jar".to_string(), "{artifact}".to_string()]
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            artifact: String::new(),
            runtime: default_runtime(),
            runtime_args: Vec::new(),
            inject_arg: default_inject_arg(),
            invoke_args: default_invoke_args(),
        }
    }
}

/// `[update]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSection {
    /// Release polling interval in minutes.
    ///
    /// - `> 0`: check on this interval, first check immediately.
    /// - `0`: never check; start the existing artifact once at boot.
    /// - `< 0`: fully disabled (no checks, no automatic start).
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: i64,

    /// Regex matched against asset names to pick the artifact to download.
    /// The first matching asset in index order wins.
    #[serde(default = "default_asset_pattern")]
    pub asset_pattern: String,
}

fn default_check_interval() -> i64 {
    10
}

fn default_asset_pattern() -> String {
    ".*\\.jar".to_string()
}

impl Default for UpdateSection {
    fn default() -> Self {
        Self {
            check_interval_minutes: default_check_interval(),
            asset_pattern: default_asset_pattern(),
        }
    }
}

/// `[github]` section: which repository's releases are watched.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GithubSection {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,
}

/// `[self_update]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SelfUpdateSection {
    /// Gate for the `selfupdate` console command.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Regex matched against asset names to pick the new supervisor binary.
    #[serde(default = "default_self_update_pattern")]
    pub asset_pattern: String,
}

fn default_true() -> bool {
    true
}

fn default_self_update_pattern() -> String {
    "(?i)upkeep-.*".to_string()
}

impl Default for SelfUpdateSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            asset_pattern: default_self_update_pattern(),
        }
    }
}

/// `[webhook]` section.
///
/// The supervisor never calls the webhook itself; the id and token are only
/// handed to the shim through the injection payload.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WebhookSection {
    /// Webhook URL whose last two path segments are the id and token.
    /// Empty means no webhook.
    #[serde(default)]
    pub logging_url: String,
}

/// Webhook id/token pair carried in the injection payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookCredentials {
    pub id: String,
    pub token: String,
}

impl WebhookSection {
    /// Parse the configured URL into credentials: the last two path
    /// segments are taken as id and token.
    ///
    /// `None` when no URL is configured or it does not carry both segments;
    /// validation rejects the latter case up front.
    pub fn credentials(&self) -> Option<WebhookCredentials> {
        let url = self.logging_url.trim().trim_end_matches('/');
        if url.is_empty() {
            return None;
        }
        let mut segments = url.rsplit('/');
        let token = segments.next()?.to_string();
        let id = segments.next()?.to_string();
        if id.is_empty() || token.is_empty() || id.contains(':') {
            return None;
        }
        Some(WebhookCredentials { id, token })
    }
}

/// `[shim]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ShimSection {
    /// Path to the shim artifact that is installed into the work directory
    /// at boot and injected into the managed process.
    #[serde(default = "default_shim_source")]
    pub source: String,
}

fn default_shim_source() -> String {
    "upkeep-shim.jar".to_string()
}

impl Default for ShimSection {
    fn default() -> Self {
        Self {
            source: default_shim_source(),
        }
    }
}

/// Validated configuration.
///
/// Constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), which
/// also compiles the asset patterns so the rest of the crate never deals
/// with invalid regexes.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub process: ProcessSection,
    pub update: UpdateSection,
    pub github: GithubSection,
    pub self_update: SelfUpdateSection,
    pub webhook: WebhookSection,
    pub shim: ShimSection,
    asset_regex: Regex,
    self_update_regex: Regex,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        asset_regex: Regex,
        self_update_regex: Regex,
    ) -> Self {
        Self {
            process: raw.process,
            update: raw.update,
            github: raw.github,
            self_update: raw.self_update,
            webhook: raw.webhook,
            shim: raw.shim,
            asset_regex,
            self_update_regex,
        }
    }

    /// Compiled `update.asset_pattern`.
    pub fn asset_regex(&self) -> &Regex {
        &self.asset_regex
    }

    /// Compiled `self_update.asset_pattern`.
    pub fn self_update_regex(&self) -> &Regex {
        &self.self_update_regex
    }
}
