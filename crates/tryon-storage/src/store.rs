//! Uploads-root management and path containment.
//!
//! Every file this service touches lives under one managed root:
//! stored photos at the top level, thumbnails under `thumbnails/`, cached
//! composition results under `results/`. Names arriving from the outside
//! (form fields, query parameters) pass through `sanitize_name` and a
//! canonicalization containment check before any filesystem access.

use std::path::{Path, PathBuf};

use tokio::fs;
use tryon_core::constants::{
    ACCESS_MARKER_CONTENT, ACCESS_MARKER_FILE, RESULTS_SUBDIR, THUMBNAILS_SUBDIR, THUMBNAIL_PREFIX,
};

use crate::error::{StorageError, StorageResult};

/// Extension used when a declared name carries none from the allow-list.
const FALLBACK_EXTENSION: &str = "png";

#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_name_length: usize,
    allowed_extensions: Vec<String>,
}

/// One gallery entry: a thumbnail name plus the stored photo it points at.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub thumbnail: String,
    pub photo: String,
}

impl UploadStore {
    /// Open (creating if needed) the uploads root, its subfolders, and the
    /// deny-all access marker.
    pub async fn open(
        root: impl Into<PathBuf>,
        max_name_length: usize,
        allowed_extensions: Vec<String>,
    ) -> StorageResult<Self> {
        let root = root.into();

        for dir in [
            root.clone(),
            root.join(THUMBNAILS_SUBDIR),
            root.join(RESULTS_SUBDIR),
        ] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let marker = root.join(ACCESS_MARKER_FILE);
        if !fs::try_exists(&marker).await.unwrap_or(false) {
            fs::write(&marker, ACCESS_MARKER_CONTENT).await?;
        }

        Ok(UploadStore {
            root,
            max_name_length,
            allowed_extensions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_SUBDIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_SUBDIR)
    }

    /// Validate a candidate base name. Rejects empty and over-length names,
    /// dot-prefixed names (the access marker and in-flight temp files), and
    /// anything carrying traversal sequences, separators, or control bytes.
    /// Returns the accepted name unchanged.
    pub fn sanitize_name<'a>(&self, candidate: &'a str) -> StorageResult<&'a str> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(StorageError::InvalidName("empty name".to_string()));
        }
        if candidate.starts_with('.') {
            return Err(StorageError::InvalidName(candidate.to_string()));
        }
        if candidate.len() > self.max_name_length {
            return Err(StorageError::InvalidName(format!(
                "name exceeds {} bytes",
                self.max_name_length
            )));
        }
        if candidate.contains("..")
            || candidate.contains('/')
            || candidate.contains('\\')
            || candidate.contains('\0')
        {
            return Err(StorageError::InvalidName(candidate.to_string()));
        }
        Ok(candidate)
    }

    /// Resolve a candidate name to an existing file directly under the root.
    pub async fn resolve(&self, candidate: &str) -> StorageResult<PathBuf> {
        self.resolve_in(&self.root, candidate).await
    }

    /// Resolve a candidate name inside `thumbnails/`.
    pub async fn resolve_thumbnail(&self, candidate: &str) -> StorageResult<PathBuf> {
        self.resolve_in(&self.thumbnails_dir(), candidate).await
    }

    /// Resolve a candidate name inside `results/`.
    pub async fn resolve_result(&self, candidate: &str) -> StorageResult<PathBuf> {
        self.resolve_in(&self.results_dir(), candidate).await
    }

    /// Resolve a candidate against the root, then thumbnails, then results.
    /// Used by file serving, where the caller only holds a bare name.
    pub async fn resolve_any(&self, candidate: &str) -> StorageResult<PathBuf> {
        match self.resolve(candidate).await {
            Ok(path) => return Ok(path),
            Err(e) if e.is_security() => return Err(e),
            Err(_) => {}
        }
        match self.resolve_thumbnail(candidate).await {
            Ok(path) => return Ok(path),
            Err(e) if e.is_security() => return Err(e),
            Err(_) => {}
        }
        self.resolve_result(candidate).await
    }

    async fn resolve_in(&self, dir: &Path, candidate: &str) -> StorageResult<PathBuf> {
        let name = self.sanitize_name(candidate)?;
        let path = dir.join(name);

        let dir_canonical = fs::canonicalize(dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "failed to canonicalize {}: {}",
                dir.display(),
                e
            ))
        })?;

        // Canonicalization fails for names that do not exist; that is an
        // ordinary miss, not a security rejection.
        let canonical = fs::canonicalize(&path)
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))?;

        if canonical.strip_prefix(&dir_canonical).is_err() {
            return Err(StorageError::OutsideRoot(name.to_string()));
        }

        Ok(canonical)
    }

    /// Generate a fresh collision-resistant stored-photo name: prefix,
    /// timestamp, 128 random bits, and an allow-listed extension derived
    /// from the declared original name (falling back to png).
    pub fn generate_name(&self, original_name: &str, prefix: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| self.allowed_extensions.iter().any(|a| a == e))
            .unwrap_or_else(|| {
                tracing::warn!(
                    original = %original_name,
                    "declared name has no allow-listed extension, defaulting"
                );
                FALLBACK_EXTENSION.to_string()
            });

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let random: u128 = rand::random();
        format!("{}{}_{:032x}.{}", prefix, timestamp, random, extension)
    }

    /// Thumbnail name for a stored photo.
    pub fn thumbnail_name(photo_name: &str) -> String {
        format!("{}{}", THUMBNAIL_PREFIX, photo_name)
    }

    /// Stored-photo name a thumbnail points back at.
    pub fn photo_for_thumbnail(thumbnail_name: &str) -> &str {
        thumbnail_name
            .strip_prefix(THUMBNAIL_PREFIX)
            .unwrap_or(thumbnail_name)
    }

    /// Persist bytes under a (generated, already-safe) name at the root.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let name = self.sanitize_name(name)?;
        let path = self.root.join(name);
        atomic_write(&self.root, &path, bytes).await?;

        tracing::info!(
            path = %path.display(),
            size_bytes = bytes.len(),
            "stored upload"
        );
        Ok(path)
    }

    /// Thumbnails carrying the given prefix, newest first.
    pub async fn list_gallery(&self, thumb_prefix: &str) -> StorageResult<Vec<GalleryEntry>> {
        let dir = self.thumbnails_dir();
        let mut entries = Vec::new();

        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !file_name.starts_with(thumb_prefix) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
            entries.push((modified, file_name));
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries
            .into_iter()
            .map(|(_, thumbnail)| GalleryEntry {
                photo: Self::photo_for_thumbnail(&thumbnail).to_string(),
                thumbnail,
            })
            .collect())
    }
}

/// Exclusive write to a temporary sibling followed by rename, so a concurrent
/// reader never observes a partially written file.
pub(crate) async fn atomic_write(dir: &Path, final_path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    fs::write(&tmp, bytes).await.map_err(|e| {
        StorageError::WriteFailed(format!("failed to write {}: {}", tmp.display(), e))
    })?;

    if let Err(e) = fs::rename(&tmp, final_path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::WriteFailed(format!(
            "failed to move {} into place: {}",
            final_path.display(),
            e
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o644);
        let _ = fs::set_permissions(final_path, perms).await;
    }

    Ok(())
}
