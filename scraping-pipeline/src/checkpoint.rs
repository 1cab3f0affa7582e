//! Durable resume state for the listing-page traversal.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use common::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cursor plus visited set, saved once per completed listing page. The
/// cursor never regresses across successful runs; a crash mid-page only
/// re-fetches that page, which the content cache makes cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_listing_page: u32,
    pub scraped_post_urls: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    fn fresh() -> Self {
        let now = Utc::now();
        Self {
            last_listing_page: 0,
            scraped_post_urls: BTreeSet::new(),
            started_at: now,
            updated_at: now,
        }
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Single-writer store for the one mutable [`Checkpoint`] record.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored checkpoint, or a fresh one when none exists.
    pub fn load(&self) -> Result<Checkpoint, AppError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let checkpoint: Checkpoint = serde_json::from_str(&raw)
                    .map_err(|err| AppError::Checkpoint(format!("corrupt checkpoint: {err}")))?;
                debug!(
                    page = checkpoint.last_listing_page,
                    visited = checkpoint.scraped_post_urls.len(),
                    "loaded checkpoint"
                );
                Ok(checkpoint)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Checkpoint::fresh()),
            Err(err) => Err(AppError::Checkpoint(err.to_string())),
        }
    }

    /// Atomic overwrite: the blob is written to a temp file in the same
    /// directory and renamed over the old one, so a crash leaves either
    /// the old checkpoint or the new one, never a hybrid.
    pub fn save(&self, checkpoint: &mut Checkpoint) -> Result<(), AppError> {
        checkpoint.updated_at = Utc::now();

        let dir = self
            .path
            .parent()
            .ok_or_else(|| AppError::Checkpoint("checkpoint path has no parent".to_string()))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;
        serde_json::to_writer_pretty(&mut tmp, checkpoint)
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;
        tmp.flush()
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|err| AppError::Checkpoint(err.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_file_returns_fresh_checkpoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        let checkpoint = store.load().expect("load");
        assert_eq!(checkpoint.last_listing_page, 0);
        assert!(checkpoint.scraped_post_urls.is_empty());
    }

    #[test]
    fn save_then_reload_survives_a_new_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("checkpoint.json");

        let mut checkpoint = Checkpoint::default();
        checkpoint.last_listing_page = 5;
        checkpoint.scraped_post_urls.insert("a".to_string());
        checkpoint.scraped_post_urls.insert("b".to_string());
        CheckpointStore::new(&path)
            .save(&mut checkpoint)
            .expect("save");

        // Simulated crash: all in-memory state dropped, fresh store.
        let reloaded = CheckpointStore::new(&path).load().expect("load");
        assert_eq!(reloaded.last_listing_page, 5);
        assert_eq!(
            reloaded.scraped_post_urls,
            ["a", "b"].iter().map(|s| (*s).to_string()).collect()
        );
        assert_eq!(reloaded.started_at, checkpoint.started_at);
    }

    #[test]
    fn save_refreshes_updated_at_but_keeps_started_at() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("checkpoint.json");
        let store = CheckpointStore::new(&path);

        let mut checkpoint = Checkpoint::default();
        let started = checkpoint.started_at;
        let first_update = checkpoint.updated_at;
        store.save(&mut checkpoint).expect("save");

        assert_eq!(checkpoint.started_at, started);
        assert!(checkpoint.updated_at >= first_update);
    }

    #[test]
    fn corrupt_blob_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{not json").expect("write");

        let result = CheckpointStore::new(&path).load();
        assert!(matches!(result, Err(AppError::Checkpoint(_))));
    }
}
