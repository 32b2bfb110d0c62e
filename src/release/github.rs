// src/release/github.rs

//! GitHub-style release index client.
//!
//! Only the public, unauthenticated release endpoints are used:
//! `/repos/{owner}/{repo}/releases/latest` and
//! `/repos/{owner}/{repo}/releases/tags/{tag}`. A 404 from either means
//! "nothing there", not a failure.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use reqwest::{header, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::Result;
use crate::release::{Release, ReleaseSource};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const ACCEPT_VALUE: &str = "application/vnd.github+json";
const USER_AGENT_VALUE: &str = concat!("upkeep/", env!("CARGO_PKG_VERSION"));

pub struct GithubReleases {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
}

impl GithubReleases {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, owner, repo)
    }

    /// Client against a non-default index, e.g. a GitHub Enterprise host.
    pub fn with_base_url(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    async fn get_release(&self, url: String) -> Result<Option<Release>> {
        debug!(url = %url, "querying release index");
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, ACCEPT_VALUE)
            .header(header::USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let release = response.error_for_status()?.json::<Release>().await?;
        Ok(Some(release))
    }
}

impl ReleaseSource for GithubReleases {
    fn latest(&self) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + '_>> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.base_url, self.owner, self.repo
        );
        Box::pin(async move { self.get_release(url).await })
    }

    fn by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + 'a>> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.base_url, self.owner, self.repo, tag
        );
        Box::pin(async move { self.get_release(url).await })
    }

    fn fetch_to<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut response = self
                .client
                .get(url)
                .header(header::USER_AGENT, USER_AGENT_VALUE)
                .send()
                .await?
                .error_for_status()?;

            if let Some(parent) = dest.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let mut file = tokio::fs::File::create(dest).await?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        })
    }
}
