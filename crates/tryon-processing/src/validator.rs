//! Upload validation.
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! non-empty upload, size limit, declared-extension allow-list, content-
//! sniffed MIME allow-list, and finally a structural decode proving the
//! bytes are a real image with extractable dimensions. Each rejection maps
//! to its own user-safe message; the technical detail stays in the log.

use std::path::Path;

use crate::sniff::sniff_mime;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("empty or truncated upload")]
    EmptyFile,

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("missing file extension: {0}")]
    MissingExtension(String),

    #[error("invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("content type not allowed: {detected}")]
    DisallowedContentType { detected: String },

    #[error("file does not decode as an image")]
    NotAnImage,
}

impl ValidationError {
    /// Distinct, pre-approved user message per rejection reason. Never
    /// includes the detected technical detail verbatim.
    pub fn user_message(&self, max_bytes: usize) -> String {
        match self {
            ValidationError::EmptyFile => {
                "File upload was interrupted or empty. Please try again.".to_string()
            }
            ValidationError::FileTooLarge { .. } => format!(
                "File is too large. Maximum size is {}MB.",
                max_bytes / 1024 / 1024
            ),
            ValidationError::MissingExtension(_) | ValidationError::InvalidExtension { .. } => {
                "Invalid file type. Only jpg, jpeg, png, gif files are allowed.".to_string()
            }
            ValidationError::DisallowedContentType { .. } => {
                "Invalid file format detected. Please ensure you're uploading a valid image."
                    .to_string()
            }
            ValidationError::NotAnImage => {
                "File is not a valid image. Please upload a proper image file.".to_string()
            }
        }
    }
}

/// Dimensions and sniffed MIME of an accepted upload.
#[derive(Debug, Clone)]
pub struct AcceptedImage {
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate an uploaded file against size, extension, sniffed content
    /// type, and structural decodability, in that order.
    pub fn validate(&self, filename: &str, data: &[u8]) -> Result<AcceptedImage, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        if data.len() > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: data.len(),
                max: self.max_file_size,
            });
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        let mime = sniff_mime(data).ok_or_else(|| ValidationError::DisallowedContentType {
            detected: "unknown".to_string(),
        })?;

        if !self.allowed_content_types.iter().any(|ct| ct == mime) {
            return Err(ValidationError::DisallowedContentType {
                detected: mime.to_string(),
            });
        }

        let (width, height) = image::load_from_memory(data)
            .map(|img| (img.width(), img.height()))
            .map_err(|e| {
                tracing::debug!(error = %e, filename = %filename, "image decode failed");
                ValidationError::NotAnImage
            })?;

        Ok(AcceptedImage {
            width,
            height,
            mime,
        })
    }
}
