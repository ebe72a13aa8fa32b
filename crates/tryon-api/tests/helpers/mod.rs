#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{ImageFormat, Rgb, RgbImage};
use tryon_api::{ActionInput, TryonService, UploadedFile};
use tryon_core::models::session::{Session, Stage};
use tryon_core::Config;
use tryon_storage::UploadStore;
use tryon_webhook::{ComposeBackend, ComposeError, PhotoPart};

/// Config tuned for fast tests: small size limit, tight optimize and
/// thumbnail bounds, millisecond backoff.
pub fn test_config(root: &Path) -> Config {
    Config {
        server_port: 0,
        uploads_dir: PathBuf::from(root),
        max_file_size_bytes: 64 * 1024,
        allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "gif".into()],
        allowed_content_types: vec![
            "image/jpeg".into(),
            "image/png".into(),
            "image/gif".into(),
        ],
        max_filename_length: 255,
        image_max_width: 100,
        image_max_height: 100,
        jpeg_quality: 85,
        backup_original: false,
        thumbnail_max_width: 50,
        thumbnail_max_height: 50,
        webhook_url: "http://localhost:9/unused".to_string(),
        webhook_timeout_secs: 1,
        webhook_max_attempts: 3,
        webhook_backoff_unit_ms: 10,
    }
}

/// Service over a given uploads root; multiple services may share one root
/// to exercise the cache across differently-behaving backends.
pub async fn service_at(root: &Path, compose: Arc<dyn ComposeBackend>) -> TryonService {
    let config = test_config(root);
    let store = UploadStore::open(
        config.uploads_dir.clone(),
        config.max_filename_length,
        config.allowed_extensions.clone(),
    )
    .await
    .unwrap();
    TryonService::new(&config, store, compose)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 60]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn png_upload(file_name: &str, width: u32, height: u32) -> UploadedFile {
    UploadedFile {
        file_name: file_name.to_string(),
        bytes: png_bytes(width, height),
    }
}

/// Input carrying a fresh photo for both roles.
pub fn both_photos(width: u32, height: u32) -> ActionInput {
    ActionInput {
        user_photo: Some(png_upload("me.png", width, height)),
        jewelry_photo: Some(png_upload("bracelet.png", width, height)),
        ..Default::default()
    }
}

pub fn uploaded_session(user: &str, jewelry: &str) -> Session {
    Session {
        stage: Stage::Uploaded,
        user_photo: Some(user.to_string()),
        jewelry_photo: Some(jewelry.to_string()),
        ..Session::new()
    }
}

/// Backend that replays a scripted sequence of outcomes and counts calls.
pub struct ScriptedBackend {
    outcomes: Mutex<Vec<Result<Vec<u8>, ComposeError>>>,
    calls: Mutex<u32>,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<Result<Vec<u8>, ComposeError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            calls: Mutex::new(0),
        }
    }

    pub fn succeeding(bytes: Vec<u8>) -> Self {
        Self::new(vec![Ok(bytes)])
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ComposeBackend for ScriptedBackend {
    async fn compose(
        &self,
        _user: &PhotoPart,
        _jewelry: &PhotoPart,
    ) -> Result<Vec<u8>, ComposeError> {
        *self.calls.lock().unwrap() += 1;
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Err(ComposeError::Http { status: 500 })
        } else {
            outcomes.remove(0)
        }
    }
}

/// Backend that fails every call.
pub fn always_failing() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend::new(vec![]))
}
