//! Shared application state.

use std::sync::Arc;

use tryon_core::Config;
use tryon_storage::UploadStore;
use tryon_webhook::ComposeBackend;

use crate::service::TryonService;
use crate::session_store::SessionStore;

pub struct AppState {
    pub config: Config,
    pub service: TryonService,
    pub sessions: SessionStore,
}

impl AppState {
    /// Open the uploads root and wire the collaborators together.
    pub async fn build(config: Config, compose: Arc<dyn ComposeBackend>) -> anyhow::Result<Arc<Self>> {
        let store = UploadStore::open(
            config.uploads_dir.clone(),
            config.max_filename_length,
            config.allowed_extensions.clone(),
        )
        .await?;

        tracing::info!(
            uploads_dir = %config.uploads_dir.display(),
            max_file_mb = config.max_file_size_bytes / 1024 / 1024,
            extensions = %config.allowed_extensions.join(","),
            "uploads root ready"
        );

        let service = TryonService::new(&config, store, compose);
        Ok(Arc::new(AppState {
            config,
            service,
            sessions: SessionStore::new(),
        }))
    }
}
