#![allow(dead_code)]

use upkeep::config::{ConfigFile, GithubSection, RawConfigFile};
use upkeep::release::{Release, ReleaseAsset};

/// Builder for `Release` values as the index would report them.
pub struct ReleaseBuilder {
    release: Release,
}

impl ReleaseBuilder {
    pub fn new(id: u64, tag: &str) -> Self {
        Self {
            release: Release {
                id,
                tag: tag.to_string(),
                name: None,
                assets: vec![],
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.release.name = Some(name.to_string());
        self
    }

    pub fn asset(mut self, name: &str, url: &str) -> Self {
        self.release.assets.push(ReleaseAsset {
            name: name.to_string(),
            download_url: url.to_string(),
        });
        self
    }

    pub fn build(self) -> Release {
        self.release
    }
}

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from defaults that already validate: the given artifact plus
/// placeholder `[github]` coordinates.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(artifact: &str) -> Self {
        let mut config = RawConfigFile {
            process: Default::default(),
            update: Default::default(),
            github: GithubSection {
                owner: "acme".to_string(),
                repo: "app".to_string(),
            },
            self_update: Default::default(),
            webhook: Default::default(),
            shim: Default::default(),
        };
        config.process.artifact = artifact.to_string();
        Self { config }
    }

    pub fn runtime(mut self, runtime: &str) -> Self {
        self.config.process.runtime = runtime.to_string();
        self
    }

    pub fn runtime_arg(mut self, arg: &str) -> Self {
        self.config.process.runtime_args.push(arg.to_string());
        self
    }

    pub fn inject_arg(mut self, arg: &str) -> Self {
        self.config.process.inject_arg = arg.to_string();
        self
    }

    pub fn invoke_args(mut self, args: &[&str]) -> Self {
        self.config.process.invoke_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn check_interval(mut self, minutes: i64) -> Self {
        self.config.update.check_interval_minutes = minutes;
        self
    }

    pub fn asset_pattern(mut self, pattern: &str) -> Self {
        self.config.update.asset_pattern = pattern.to_string();
        self
    }

    pub fn github(mut self, owner: &str, repo: &str) -> Self {
        self.config.github.owner = owner.to_string();
        self.config.github.repo = repo.to_string();
        self
    }

    pub fn self_update_enabled(mut self, val: bool) -> Self {
        self.config.self_update.enabled = val;
        self
    }

    pub fn self_update_pattern(mut self, pattern: &str) -> Self {
        self.config.self_update.asset_pattern = pattern.to_string();
        self
    }

    pub fn webhook_url(mut self, url: &str) -> Self {
        self.config.webhook.logging_url = url.to_string();
        self
    }

    pub fn shim_source(mut self, path: &str) -> Self {
        self.config.shim.source = path.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// The raw form, for tests that exercise validation directly.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}
