//! In-place image optimization and thumbnailing.
//!
//! Both operations are best-effort from the upload transition's point of
//! view: a failure is logged and the original file keeps being used. Decode
//! and encode are CPU-bound and run under `spawn_blocking`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::sniff::sniff_format;

/// Suffix for the pre-optimization backup copy.
const BACKUP_SUFFIX: &str = "original";

#[derive(Clone)]
pub struct ImageOptimizer {
    max_width: u32,
    max_height: u32,
    jpeg_quality: u8,
    backup_original: bool,
    thumb_max_width: u32,
    thumb_max_height: u32,
}

impl ImageOptimizer {
    pub fn new(
        max_width: u32,
        max_height: u32,
        jpeg_quality: u8,
        backup_original: bool,
        thumb_max_width: u32,
        thumb_max_height: u32,
    ) -> Self {
        Self {
            max_width,
            max_height,
            jpeg_quality,
            backup_original,
            thumb_max_width,
            thumb_max_height,
        }
    }

    /// Resize the image at `path` in place when either dimension exceeds the
    /// configured bound, preserving aspect ratio and re-encoding in the
    /// original format. Returns whether a resize happened.
    pub async fn optimize(&self, path: &Path) -> anyhow::Result<bool> {
        let this = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || this.optimize_sync(&path)).await?
    }

    fn optimize_sync(&self, path: &Path) -> anyhow::Result<bool> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let original_size = data.len();

        let format = sniff_format(&data)
            .ok_or_else(|| anyhow::anyhow!("unsupported image format: {}", path.display()))?;
        let img = image::load_from_memory(&data)?;

        let (width, height) = (img.width(), img.height());
        let Some((new_width, new_height)) =
            fit_dimensions(width, height, self.max_width, self.max_height)
        else {
            tracing::info!(path = %path.display(), width, height, "image already optimal size");
            return Ok(false);
        };

        if self.backup_original {
            let backup = backup_path(path);
            if let Err(e) = std::fs::copy(path, &backup) {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to create pre-optimization backup"
                );
            }
        }

        let resized = img.resize_exact(new_width, new_height, FilterType::Lanczos3);
        let encoded = self.encode(&resized, format)?;
        atomic_write_sync(path, &encoded)?;

        tracing::info!(
            path = %path.display(),
            from = format!("{}x{}", width, height),
            to = format!("{}x{}", new_width, new_height),
            bytes_before = original_size,
            bytes_after = encoded.len(),
            "image optimized"
        );
        Ok(true)
    }

    /// Produce a bounded-box aspect-preserving thumbnail of `source` at
    /// `dest`. Skipped (returns false) when the source is already within the
    /// thumbnail bounds.
    pub async fn thumbnail(&self, source: &Path, dest: &Path) -> anyhow::Result<bool> {
        let this = self.clone();
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || this.thumbnail_sync(&source, &dest)).await?
    }

    fn thumbnail_sync(&self, source: &Path, dest: &Path) -> anyhow::Result<bool> {
        let data = std::fs::read(source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        let format = sniff_format(&data)
            .ok_or_else(|| anyhow::anyhow!("unsupported image format: {}", source.display()))?;
        let img = image::load_from_memory(&data)?;

        if img.width() <= self.thumb_max_width && img.height() <= self.thumb_max_height {
            tracing::info!(path = %source.display(), "image already thumbnail size");
            return Ok(false);
        }

        let thumb = img.thumbnail(self.thumb_max_width, self.thumb_max_height);
        let encoded = self.encode(&thumb, format)?;
        atomic_write_sync(dest, &encoded)?;

        tracing::info!(
            source = %source.display(),
            dest = %dest.display(),
            width = thumb.width(),
            height = thumb.height(),
            "thumbnail created"
        );
        Ok(true)
    }

    /// Re-encode with the format-specific settings the service tunes:
    /// JPEG quality, PNG adaptive filtering; other formats use defaults.
    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut cursor, self.jpeg_quality);
                img.write_with_encoder(encoder)?;
            }
            ImageFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut cursor,
                    CompressionType::Default,
                    PngFilterType::Adaptive,
                );
                img.write_with_encoder(encoder)?;
            }
            other => {
                img.write_to(&mut cursor, other)?;
            }
        }
        Ok(buffer)
    }
}

/// Largest dimensions fitting the bounds while preserving aspect ratio, or
/// `None` when the image is already within them.
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    Some((new_width.min(max_width), new_height.min(max_height)))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Write-then-rename so readers never see a half-written image.
fn atomic_write_sync(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    std::fs::write(&tmp, bytes)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move {} into place", path.display()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644));
    }
    Ok(())
}
