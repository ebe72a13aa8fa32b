//! HTTP client for the external composition webhook.
//!
//! The webhook takes a user photo, a jewelry photo, and a fixed prompt as a
//! multipart POST and responds with the composited image bytes. The
//! `ComposeBackend` trait is the seam the service layer and tests depend on;
//! `WebhookClient` is the real implementation.

use std::time::Duration;

use crate::error::ComposeError;

/// One photo attached to a compose request.
#[derive(Debug, Clone)]
pub struct PhotoPart {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ComposeBackend: Send + Sync {
    /// Single compose attempt. Retry policy lives in the caller.
    async fn compose(
        &self,
        user: &PhotoPart,
        jewelry: &PhotoPart,
    ) -> Result<Vec<u8>, ComposeError>;
}

pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
    prompt: String,
}

impl WebhookClient {
    pub fn new(url: String, prompt: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, prompt })
    }
}

#[async_trait::async_trait]
impl ComposeBackend for WebhookClient {
    async fn compose(
        &self,
        user: &PhotoPart,
        jewelry: &PhotoPart,
    ) -> Result<Vec<u8>, ComposeError> {
        let form = reqwest::multipart::Form::new()
            .part("user_photo", to_part(user)?)
            .part("jewelry_photo", to_part(jewelry)?)
            .text("prompt", self.prompt.clone());

        let response = self.http.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ComposeError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(ComposeError::EmptyResponse);
        }

        tracing::debug!(bytes = body.len(), "compose webhook returned image");
        Ok(body.to_vec())
    }
}

fn to_part(photo: &PhotoPart) -> Result<reqwest::multipart::Part, ComposeError> {
    reqwest::multipart::Part::bytes(photo.bytes.clone())
        .file_name(photo.file_name.clone())
        .mime_str(&photo.mime)
        .map_err(|e| ComposeError::Transport(e.to_string()))
}
