//! Stored-photo statistics for diagnostics and gallery listings.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::sniff::sniff_mime;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Read dimensions, sniffed MIME, size, and mtime of a stored image.
pub fn image_stats(path: &Path) -> anyhow::Result<ImageStats> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mime = sniff_mime(&data)
        .ok_or_else(|| anyhow::anyhow!("not a recognizable image: {}", path.display()))?;
    let img = image::load_from_memory(&data)?;

    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(ImageStats {
        width: img.width(),
        height: img.height(),
        mime,
        size_bytes: metadata.len(),
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_stats_for_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        let img = RgbImage::from_pixel(24, 16, Rgb([5, 6, 7]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        std::fs::write(&path, &buffer).unwrap();

        let stats = image_stats(&path).unwrap();
        assert_eq!((stats.width, stats.height), (24, 16));
        assert_eq!(stats.mime, "image/png");
        assert_eq!(stats.size_bytes, buffer.len() as u64);
    }

    #[test]
    fn test_stats_rejects_non_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(image_stats(&path).is_err());
    }
}
