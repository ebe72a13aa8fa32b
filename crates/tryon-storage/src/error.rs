use std::io;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Candidate name failed sanitization (empty, over-length, traversal
    /// sequences, path separators).
    #[error("invalid file name: {0}")]
    InvalidName(String),

    /// Sanitized name still resolved outside the managed root.
    #[error("name resolves outside the uploads root: {0}")]
    OutsideRoot(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("storage configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Whether this rejection is a security signal (traversal attempt or
    /// containment breach) rather than an ordinary miss.
    pub fn is_security(&self) -> bool {
        matches!(self, StorageError::InvalidName(_) | StorageError::OutsideRoot(_))
    }
}

impl From<StorageError> for tryon_core::AppError {
    fn from(err: StorageError) -> Self {
        if err.is_security() {
            tryon_core::AppError::PathSecurity(err.to_string())
        } else {
            tryon_core::AppError::Storage(err.to_string())
        }
    }
}
