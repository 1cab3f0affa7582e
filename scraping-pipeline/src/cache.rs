//! Filesystem cache for fetched content, keyed by caller-supplied stable keys.

use std::path::{Path, PathBuf};

use common::error::AppError;
use tokio::fs;
use tracing::debug;

/// Downloads below this size are treated as truncated and re-fetched.
const MIN_PDF_BYTES: u64 = 1_000;

/// Content-addressable blob store under a single directory. Keys are
/// sanitized file-name stems (`listing_0001`, `post_<slug>`, participant
/// names); repeated runs reuse cached bodies instead of hitting the
/// network.
#[derive(Clone, Debug)]
pub struct ContentCache {
    root: PathBuf,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, key: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{extension}", sanitize_key(key)))
    }

    pub async fn get_html(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key, "html");
        match fs::read_to_string(&path).await {
            Ok(body) => {
                debug!(key, "cache hit");
                Ok(Some(body))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put_html(&self, key: &str, body: &str) -> Result<(), AppError> {
        fs::write(self.path_for(key, "html"), body).await?;
        Ok(())
    }

    pub async fn get_pdf(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.path_for(key, "pdf");
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        // Ignore truncated downloads from interrupted runs.
        if metadata.len() < MIN_PDF_BYTES {
            return Ok(None);
        }

        debug!(key, bytes = metadata.len(), "cache hit");
        Ok(Some(fs::read(&path).await?))
    }

    pub async fn put_pdf(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        fs::write(self.path_for(key, "pdf"), bytes).await?;
        Ok(())
    }
}

/// Collapses anything outside `[A-Za-z0-9._-]` to underscores so keys are
/// always valid file-name stems.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_keys_to_file_name_stems() {
        assert_eq!(sanitize_key("Peggy A. Whitson"), "Peggy_A._Whitson");
        assert_eq!(sanitize_key("listing_0001"), "listing_0001");
        assert_eq!(sanitize_key("post/with?query"), "post_with_query");
    }

    #[tokio::test]
    async fn html_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContentCache::new(dir.path());

        assert!(cache.get_html("listing_0001").await.expect("get").is_none());
        cache
            .put_html("listing_0001", "<html>page one</html>")
            .await
            .expect("put");
        let body = cache.get_html("listing_0001").await.expect("get");
        assert_eq!(body.as_deref(), Some("<html>page one</html>"));
    }

    #[tokio::test]
    async fn short_pdf_is_treated_as_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContentCache::new(dir.path());

        cache.put_pdf("tiny", b"stub").await.expect("put");
        assert!(cache.get_pdf("tiny").await.expect("get").is_none());

        let full = vec![0u8; 4_096];
        cache.put_pdf("full", &full).await.expect("put");
        assert_eq!(cache.get_pdf("full").await.expect("get"), Some(full));
    }
}
