pub mod client;
pub mod error;
pub mod retry;

pub use client::{ComposeBackend, PhotoPart, WebhookClient};
pub use error::ComposeError;
pub use retry::send_with_retry;
