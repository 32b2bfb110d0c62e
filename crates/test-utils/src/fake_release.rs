use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use upkeep::errors::Result;
use upkeep::release::{Release, ReleaseSource};

/// A canned release source that:
/// - serves a settable latest release and a tag -> release map
/// - serves registered bytes for download URLs and records every fetch.
pub struct FakeReleaseSource {
    latest: Mutex<Option<Release>>,
    by_tag: Mutex<HashMap<String, Release>>,
    bytes: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
    fail_next_latest: AtomicBool,
    latest_queries: AtomicUsize,
}

impl FakeReleaseSource {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            by_tag: Mutex::new(HashMap::new()),
            bytes: Mutex::new(HashMap::new()),
            downloads: Mutex::new(Vec::new()),
            fail_next_latest: AtomicBool::new(false),
            latest_queries: AtomicUsize::new(0),
        }
    }

    /// Set the latest release and make it resolvable by tag as well.
    pub fn publish(&self, release: Release) {
        self.by_tag
            .lock()
            .unwrap()
            .insert(release.tag.clone(), release.clone());
        *self.latest.lock().unwrap() = Some(release);
    }

    /// Make a release resolvable by tag without touching latest.
    pub fn insert_tag(&self, release: Release) {
        self.by_tag
            .lock()
            .unwrap()
            .insert(release.tag.clone(), release);
    }

    pub fn clear_latest(&self) {
        *self.latest.lock().unwrap() = None;
    }

    /// Register the bytes served for a download URL.
    pub fn insert_bytes(&self, url: &str, bytes: &[u8]) {
        self.bytes
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    /// Make the next `latest` call fail with an error.
    pub fn fail_next_latest(&self) {
        self.fail_next_latest.store(true, Ordering::SeqCst);
    }

    /// `(url, dest)` pairs for every fetch so far, in order.
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    /// Number of `latest` queries made against this source.
    pub fn latest_queries(&self) -> usize {
        self.latest_queries.load(Ordering::SeqCst)
    }
}

impl Default for FakeReleaseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseSource for FakeReleaseSource {
    fn latest(&self) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + '_>> {
        Box::pin(async move {
            self.latest_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_next_latest.swap(false, Ordering::SeqCst) {
                return Err(anyhow::anyhow!("injected index failure").into());
            }
            Ok(self.latest.lock().unwrap().clone())
        })
    }

    fn by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Release>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.by_tag.lock().unwrap().get(tag).cloned()) })
    }

    fn fetch_to<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let bytes = self
                .bytes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no bytes registered for url '{url}'"))?;

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
            }
            std::fs::write(dest, bytes).map_err(anyhow::Error::from)?;

            self.downloads
                .lock()
                .unwrap()
                .push((url.to_string(), dest.to_path_buf()));
            Ok(())
        })
    }
}
