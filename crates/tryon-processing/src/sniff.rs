//! Content-based MIME sniffing.
//!
//! The client-declared content type is never trusted; formats are detected
//! from the leading bytes.

use image::ImageFormat;

/// Detect the MIME type of image data from its content. Returns `None` when
/// the bytes are not a recognizable image format.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data).ok().map(|f| f.to_mime_type())
}

/// `ImageFormat` for the data, when recognizable.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}
