//! Session state machine.
//!
//! One transition per request. An action dispatched in a stage it is not
//! valid in leaves the session where it is and only sets `last_error`. A
//! valid dispatch computes its effects against a working copy of the
//! session; on success the working copy is the new session, on failure the
//! copy is abandoned and the original session is forced to the form stage
//! with a user-safe `last_error`. Either way the caller commits exactly one
//! session value.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tryon_core::constants::{JEWELRY_PHOTO_PREFIX, USER_PHOTO_PREFIX};
use tryon_core::models::session::{PhotoRole, Session, Stage};
use tryon_core::{AppError, Config, LogLevel};
use tryon_processing::sniff::sniff_mime;
use tryon_processing::{ImageOptimizer, UploadValidator};
use tryon_storage::{ResultCache, UploadStore};
use tryon_webhook::{send_with_retry, ComposeBackend, PhotoPart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reset,
    Upload,
    Tryon,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Action> {
        match raw {
            "reset" => Some(Action::Reset),
            "upload" => Some(Action::Upload),
            "tryon" => Some(Action::Tryon),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Reset => "reset",
            Action::Upload => "upload",
            Action::Tryon => "tryon",
        }
    }
}

/// A fresh upload from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything a POST can carry besides the action itself.
#[derive(Debug, Default)]
pub struct ActionInput {
    pub user_photo: Option<UploadedFile>,
    pub jewelry_photo: Option<UploadedFile>,
    /// Gallery selections: stored-photo names of previously uploaded photos.
    pub user_gallery: Option<String>,
    pub jewelry_gallery: Option<String>,
    pub pin_user: Option<bool>,
    pub pin_jewelry: Option<bool>,
}

pub struct TryonService {
    store: UploadStore,
    cache: ResultCache,
    validator: UploadValidator,
    optimizer: ImageOptimizer,
    compose: Arc<dyn ComposeBackend>,
    webhook_max_attempts: u32,
    webhook_backoff_unit: Duration,
}

impl TryonService {
    pub fn new(config: &Config, store: UploadStore, compose: Arc<dyn ComposeBackend>) -> Self {
        let cache = ResultCache::new(store.results_dir());
        let validator = UploadValidator::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
            config.allowed_content_types.clone(),
        );
        let optimizer = ImageOptimizer::new(
            config.image_max_width,
            config.image_max_height,
            config.jpeg_quality,
            config.backup_original,
            config.thumbnail_max_width,
            config.thumbnail_max_height,
        );
        TryonService {
            store,
            cache,
            validator,
            optimizer,
            compose,
            webhook_max_attempts: config.webhook_max_attempts,
            webhook_backoff_unit: config.webhook_backoff_unit(),
        }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Apply one transition and return the session to commit.
    pub async fn apply(&self, session: &Session, action: Action, input: ActionInput) -> Session {
        if let Some(message) = wrong_stage_message(session.stage, action) {
            // Wrong-stage dispatch is not a transition failure: the stage and
            // every ref stay exactly where they were.
            tracing::debug!(
                action = action.as_str(),
                stage = ?session.stage,
                "action not valid in current stage"
            );
            let mut unchanged = session.clone();
            unchanged.last_error = Some(message.to_string());
            unchanged.touch();
            return unchanged;
        }

        let mut working = session.clone();
        if let Some(pin) = input.pin_user {
            working.pin_user = pin;
        }
        if let Some(pin) = input.pin_jewelry {
            working.pin_jewelry = pin;
        }

        let result = match action {
            Action::Reset => {
                working.apply_reset();
                Ok(())
            }
            Action::Upload => self.handle_upload(&mut working, input).await,
            Action::Tryon => self.handle_tryon(&mut working).await,
        };

        match result {
            Ok(()) => {
                working.touch();
                working
            }
            Err(err) => {
                log_transition_failure(action, &err);
                let mut failed = session.clone();
                failed.fail(err.user_message());
                failed
            }
        }
    }

    async fn handle_upload(&self, working: &mut Session, input: ActionInput) -> Result<(), AppError> {
        let user_ref = self
            .resolve_photo(
                working,
                PhotoRole::User,
                input.user_photo,
                input.user_gallery,
            )
            .await?;
        let jewelry_ref = self
            .resolve_photo(
                working,
                PhotoRole::Jewelry,
                input.jewelry_photo,
                input.jewelry_gallery,
            )
            .await?;

        working.user_photo = Some(user_ref);
        working.jewelry_photo = Some(jewelry_ref);
        // New inputs invalidate any previous result.
        working.result_photo = None;
        working.stage = Stage::Uploaded;
        working.last_error = None;
        Ok(())
    }

    /// One photo reference for a role: a fresh upload, a gallery selection,
    /// or the ref already on the session, in that order of precedence.
    async fn resolve_photo(
        &self,
        working: &Session,
        role: PhotoRole,
        fresh: Option<UploadedFile>,
        gallery: Option<String>,
    ) -> Result<String, AppError> {
        if let Some(upload) = fresh {
            return self.store_upload(role, upload).await;
        }

        if let Some(selected) = gallery.filter(|s| !s.trim().is_empty()) {
            return match self.store.resolve(&selected).await {
                Ok(_) => Ok(selected),
                Err(e) if e.is_security() => Err(e.into()),
                Err(_) => Err(AppError::Validation(
                    "Selected photo is no longer available. Please upload a new one.".to_string(),
                )),
            };
        }

        if let Some(existing) = working.photo_ref(role) {
            return Ok(existing.to_string());
        }

        Err(AppError::Validation(format!(
            "Please provide a {} photo.",
            role.as_str()
        )))
    }

    async fn store_upload(&self, role: PhotoRole, upload: UploadedFile) -> Result<String, AppError> {
        let accepted = self
            .validator
            .validate(&upload.file_name, &upload.bytes)
            .map_err(|e| {
                tracing::debug!(
                    role = role.as_str(),
                    filename = %upload.file_name,
                    error = %e,
                    "upload rejected"
                );
                AppError::Validation(e.user_message(self.validator.max_file_size()))
            })?;

        let prefix = match role {
            PhotoRole::User => USER_PHOTO_PREFIX,
            PhotoRole::Jewelry => JEWELRY_PHOTO_PREFIX,
        };
        let name = self.store.generate_name(&upload.file_name, prefix);
        let path = self.store.save(&name, &upload.bytes).await?;

        tracing::info!(
            role = role.as_str(),
            name = %name,
            width = accepted.width,
            height = accepted.height,
            mime = accepted.mime,
            "photo accepted"
        );

        // Optimization and thumbnailing are best-effort; the stored original
        // keeps serving if either fails.
        if let Err(e) = self.optimizer.optimize(&path).await {
            tracing::warn!(name = %name, error = %e, "optimization failed");
        }
        let thumb_path = self
            .store
            .thumbnails_dir()
            .join(UploadStore::thumbnail_name(&name));
        if let Err(e) = self.optimizer.thumbnail(&path, &thumb_path).await {
            tracing::warn!(name = %name, error = %e, "thumbnail generation failed");
        }

        Ok(name)
    }

    async fn handle_tryon(&self, working: &mut Session) -> Result<(), AppError> {
        let (user_ref, jewelry_ref) = match (&working.user_photo, &working.jewelry_photo) {
            (Some(u), Some(j)) => (u.clone(), j.clone()),
            _ => {
                return Err(AppError::Validation(
                    "Please upload both photos before trying on.".to_string(),
                ))
            }
        };

        // Both refs must resolve to files under the root before anything
        // else, cache hit included.
        let user_path = self.store.resolve(&user_ref).await.map_err(AppError::from)?;
        let jewelry_path = self
            .store
            .resolve(&jewelry_ref)
            .await
            .map_err(AppError::from)?;

        if let Some(cached) = self.cache.lookup(&user_ref, &jewelry_ref).await {
            tracing::info!(
                user = %user_ref,
                jewelry = %jewelry_ref,
                path = %cached.display(),
                "serving cached composition"
            );
            working.result_photo = Some(ResultCache::key(&user_ref, &jewelry_ref));
            working.stage = Stage::Processed;
            working.last_error = None;
            return Ok(());
        }

        let user_part = self.load_part(&user_ref, &user_path).await?;
        let jewelry_part = self.load_part(&jewelry_ref, &jewelry_path).await?;

        let composed = send_with_retry(
            self.compose.as_ref(),
            &user_part,
            &jewelry_part,
            self.webhook_max_attempts,
            self.webhook_backoff_unit,
        )
        .await?;

        self.cache.store(&user_ref, &jewelry_ref, &composed).await?;

        working.result_photo = Some(ResultCache::key(&user_ref, &jewelry_ref));
        working.stage = Stage::Processed;
        working.last_error = None;
        Ok(())
    }

    async fn load_part(&self, name: &str, path: &Path) -> Result<PhotoPart, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
        let mime = sniff_mime(&bytes).unwrap_or("application/octet-stream");
        Ok(PhotoPart {
            file_name: name.to_string(),
            mime: mime.to_string(),
            bytes,
        })
    }
}

/// User-safe message when an action is dispatched from a stage it is not
/// valid in. `None` means the pair is valid.
fn wrong_stage_message(stage: Stage, action: Action) -> Option<&'static str> {
    match (action, stage) {
        (Action::Reset, _) => None,
        (Action::Upload, Stage::Form | Stage::Uploaded) => None,
        (Action::Upload, Stage::Processed) => {
            Some("Please reset before uploading new photos.")
        }
        (Action::Tryon, Stage::Uploaded) => None,
        (Action::Tryon, Stage::Form | Stage::Processed) => {
            Some("Please upload both photos before trying on.")
        }
    }
}

fn log_transition_failure(action: Action, err: &AppError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            action = action.as_str(),
            error_type = err.error_type(),
            error = %err,
            "transition failed"
        ),
        LogLevel::Warn => tracing::warn!(
            action = action.as_str(),
            error_type = err.error_type(),
            error = %err,
            "transition failed"
        ),
        LogLevel::Error => tracing::error!(
            action = action.as_str(),
            error_type = err.error_type(),
            error = %err,
            "transition failed"
        ),
    }
}
