//! Retry loop around a compose backend.
//!
//! Backoff is linear in the attempt number: after attempt `n` fails, the
//! loop sleeps `n * backoff_unit` before the next try. No sleep follows the
//! final attempt. Every attempt's failure reason is collected so the
//! exhausted error carries the full history for the log.

use std::time::Duration;

use crate::client::{ComposeBackend, PhotoPart};
use crate::error::ComposeError;

pub async fn send_with_retry<B: ComposeBackend + ?Sized>(
    backend: &B,
    user: &PhotoPart,
    jewelry: &PhotoPart,
    max_attempts: u32,
    backoff_unit: Duration,
) -> Result<Vec<u8>, ComposeError> {
    let max_attempts = max_attempts.max(1);
    let mut reasons = Vec::new();

    for attempt in 1..=max_attempts {
        match backend.compose(user, jewelry).await {
            Ok(image) => {
                tracing::info!(attempt, bytes = image.len(), "compose succeeded");
                return Ok(image);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    "compose attempt failed"
                );
                reasons.push(format!("attempt {attempt}: {e}"));
                if attempt < max_attempts {
                    tokio::time::sleep(backoff_unit * attempt).await;
                }
            }
        }
    }

    Err(ComposeError::Exhausted {
        attempts: max_attempts,
        reasons,
    })
}
