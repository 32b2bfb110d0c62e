// src/release/checker.rs

//! Release checking and asset selection.

use std::sync::Arc;

use regex::Regex;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::Result;
use crate::release::{Release, ReleaseAsset, ReleaseSource};

/// Wraps a [`ReleaseSource`] and remembers the latest release it has seen.
///
/// "New" means the release id changed since the previous successful query;
/// ids are index-assigned and carry no ordering.
pub struct UpdateChecker {
    source: Arc<dyn ReleaseSource>,
    asset_regex: Regex,
    latest: Mutex<Option<Release>>,
}

impl UpdateChecker {
    pub fn new(source: Arc<dyn ReleaseSource>, asset_regex: Regex) -> Self {
        Self {
            source,
            asset_regex,
            latest: Mutex::new(None),
        }
    }

    /// Query the index and cache the result.
    pub async fn resolve_latest(&self) -> Result<Option<Release>> {
        let found = self.source.latest().await?;
        *self.latest.lock().await = found.clone();
        Ok(found)
    }

    /// Query the index and report whether a release different from the one
    /// cached so far appeared. Query errors propagate and leave the cache
    /// untouched.
    pub async fn find_new(&self) -> Result<bool> {
        let previous = self.latest.lock().await.clone();
        let next = self.resolve_latest().await?;
        let is_new = match (previous, next) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(prev), Some(next)) => prev.id != next.id,
        };
        debug!(is_new, "release check completed");
        Ok(is_new)
    }

    /// The latest release found so far, without querying.
    pub async fn latest_found(&self) -> Option<Release> {
        self.latest.lock().await.clone()
    }

    /// Query for an exact tag. Never cached.
    pub async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        self.source.by_tag(tag).await
    }

    /// First asset whose name matches the configured pattern, in index
    /// order.
    pub fn select_asset<'r>(&self, release: &'r Release) -> Option<&'r ReleaseAsset> {
        release
            .assets
            .iter()
            .find(|asset| self.asset_regex.is_match(&asset.name))
    }
}
