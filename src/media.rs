use crate::timeouts::secs;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Content-addressed on-disk cache for post thumbnails.
///
/// Files are keyed by the SHA-256 of the source URL, so concurrent fetches of
/// the same thumbnail may race on the write: last writer wins and the content
/// is identical. Every failure here is swallowed; a missing thumbnail never
/// fails the page that wanted it.
pub struct ThumbnailCache {
    dir: PathBuf,
    client: reqwest::Client,
}

impl ThumbnailCache {
    pub fn new(dir: PathBuf, client: reqwest::Client) -> Self {
        Self { dir, client }
    }

    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(hex::encode(digest))
    }

    /// Return the cached file for `url`, downloading it first if needed.
    /// `None` means the thumbnail is unavailable for any reason.
    pub async fn fetch(&self, url: &str) -> Option<PathBuf> {
        let path = self.cache_path(url);
        if path.exists() {
            return Some(path);
        }

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::debug!(dir = %self.dir.display(), error = %e, "thumbnail cache dir unavailable");
            return None;
        }

        let response = match self
            .client
            .get(url)
            .timeout(Duration::from_secs(secs::THUMBNAIL))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "thumbnail fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "thumbnail fetch non-success");
            return None;
        }

        let bytes = response.bytes().await.ok()?;
        if bytes.is_empty() {
            return None;
        }

        // Only cache bytes that are actually an image.
        if image::guess_format(&bytes).is_err() {
            tracing::debug!(url, "thumbnail body is not a known image format");
            return None;
        }

        if let Err(e) = std::fs::write(&path, &bytes) {
            tracing::debug!(path = %path.display(), error = %e, "thumbnail cache write failed");
            return None;
        }

        Some(path)
    }
}
