//! Error taxonomy for the try-on service.
//!
//! Four failure classes cross component boundaries: bad uploads, path
//! security rejections, upstream webhook failures, and storage faults. Every
//! variant carries the technical detail for logging; the user-facing string
//! comes from `user_message()` and is always a bounded, pre-approved message.

use crate::constants::MAX_USER_MESSAGE_LEN;

/// Log level a variant should be reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected failures such as validation rejections.
    Debug,
    /// Suspicious or recoverable issues, including path-security rejections.
    Warn,
    /// Unexpected faults.
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected upload. The payload is already a user-safe reason produced by
    /// the validator; the technical detail was logged at the rejection site.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Traversal attempt or a name resolving outside the uploads root. The
    /// payload (offending name, resolved path) is for logs only.
    #[error("path rejected: {0}")]
    PathSecurity(String),

    /// Webhook failure after retry exhaustion.
    #[error("webhook failed after {attempts} attempts: {detail}")]
    Upstream { attempts: u32, detail: String },

    /// Filesystem write/move failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl AppError {
    /// Short name for log tagging.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::PathSecurity(_) => "PathSecurity",
            AppError::Upstream { .. } => "Upstream",
            AppError::Storage(_) => "Storage",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::Validation(_) => LogLevel::Debug,
            AppError::PathSecurity(_) => LogLevel::Warn,
            AppError::Upstream { .. } => LogLevel::Error,
            AppError::Storage(_) => LogLevel::Error,
        }
    }

    /// User-facing message. Validation carries its own user-safe reason;
    /// every other class maps to a fixed generic string that never exposes
    /// paths, statuses, or attempt detail.
    pub fn user_message(&self) -> String {
        let msg = match self {
            AppError::Validation(reason) => reason.clone(),
            AppError::PathSecurity(_) => {
                "The requested file could not be used. Please upload a new photo.".to_string()
            }
            AppError::Upstream { .. } => {
                "Unable to process your request. Please try again in a few moments.".to_string()
            }
            AppError::Storage(_) => {
                "Failed to save your photo. Please try again.".to_string()
            }
        };
        truncate_message(msg)
    }
}

fn truncate_message(mut msg: String) -> String {
    if msg.len() > MAX_USER_MESSAGE_LEN {
        let mut cut = MAX_USER_MESSAGE_LEN;
        while !msg.is_char_boundary(cut) {
            cut -= 1;
        }
        msg.truncate(cut);
    }
    msg
}
