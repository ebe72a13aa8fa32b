//! On-disk cache of composition results.
//!
//! Keyed by the ordered pair of stored-photo names with extensions stripped:
//! `user_stem-jewelry_stem.png` under `results/`. The keying is by name, not
//! content hash, so renaming either source photo misses the cache even for
//! identical bytes; that is a recorded limitation of the scheme.

use std::path::{Path, PathBuf};

use tokio::fs;
use tryon_core::constants::RESULT_EXTENSION;

use crate::error::StorageResult;
use crate::store::atomic_write;

#[derive(Clone)]
pub struct ResultCache {
    results_dir: PathBuf,
}

impl ResultCache {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        ResultCache {
            results_dir: results_dir.into(),
        }
    }

    /// Deterministic cache file name for an ordered photo pair.
    pub fn key(user_ref: &str, jewelry_ref: &str) -> String {
        format!(
            "{}-{}.{}",
            stem(user_ref),
            stem(jewelry_ref),
            RESULT_EXTENSION
        )
    }

    /// Cache hit only when the entry exists with non-zero size; a zero-byte
    /// file is a partially written or stale entry and reads as a miss.
    pub async fn lookup(&self, user_ref: &str, jewelry_ref: &str) -> Option<PathBuf> {
        let path = self.results_dir.join(Self::key(user_ref, jewelry_ref));
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                tracing::info!(path = %path.display(), "cached result found");
                Some(path)
            }
            _ => None,
        }
    }

    /// Write a result for the pair, overwriting any previous entry.
    pub async fn store(
        &self,
        user_ref: &str,
        jewelry_ref: &str,
        bytes: &[u8],
    ) -> StorageResult<PathBuf> {
        let key = Self::key(user_ref, jewelry_ref);
        let path = self.results_dir.join(&key);

        atomic_write(&self.results_dir, &path, bytes).await?;

        tracing::info!(
            path = %path.display(),
            size_bytes = bytes.len(),
            "result saved to cache"
        );
        Ok(path)
    }

}

fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
