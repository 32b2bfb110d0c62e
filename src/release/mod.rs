// src/release/mod.rs

//! Release index types and the source abstraction.
//!
//! The supervisor talks to a [`ReleaseSource`] instead of a concrete HTTP
//! client. This makes it easy to swap in a canned source in tests while
//! keeping the production GitHub client in [`github`].

pub mod checker;
pub mod github;

pub use checker::UpdateChecker;
pub use github::GithubReleases;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Deserialize;

use crate::errors::Result;

/// A single release as reported by the index.
///
/// Asset order is preserved exactly as the index returned it; selection
/// depends on it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub id: u64,

    #[serde(rename = "tag_name", default)]
    pub tag: String,

    /// Display name; indexes may omit it.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Display name, falling back to the tag when the index omits one.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.tag,
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,

    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Trait abstracting the release index and artifact downloads.
///
/// Production code uses [`GithubReleases`]; tests provide their own
/// implementation with canned releases and bytes.
pub trait ReleaseSource: Send + Sync {
    /// Latest release, or `None` when the index has none published.
    fn latest(&self) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + '_>>;

    /// Release for an exact tag, or `None` when the tag is unknown.
    fn by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + 'a>>;

    /// Stream the file at `url` into `dest`, creating parent directories and
    /// replacing any existing file.
    fn fetch_to<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
