use tryon_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}")]
    Http { status: u16 },

    #[error("upstream returned an empty body")]
    EmptyResponse,

    #[error("compose failed after {attempts} attempts: {}", reasons.join("; "))]
    Exhausted { attempts: u32, reasons: Vec<String> },
}

impl From<reqwest::Error> for ComposeError {
    fn from(e: reqwest::Error) -> Self {
        ComposeError::Transport(e.to_string())
    }
}

/// Only the exhausted form surfaces to users; single-attempt failures are
/// internal to the retry loop but still map sensibly if they escape.
impl From<ComposeError> for AppError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::Exhausted { attempts, reasons } => AppError::Upstream {
                attempts,
                detail: reasons.join("; "),
            },
            other => AppError::Upstream {
                attempts: 1,
                detail: other.to_string(),
            },
        }
    }
}
