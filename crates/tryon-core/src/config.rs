//! Typed configuration loaded from the environment.
//!
//! Every tunable the components need has a named field with a default
//! matching the original deployment; values come from environment variables
//! (a `.env` file is honored via dotenvy).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MiB
const DEFAULT_MAX_FILENAME_LENGTH: usize = 255;
const DEFAULT_IMAGE_MAX_WIDTH: u32 = 1920;
const DEFAULT_IMAGE_MAX_HEIGHT: u32 = 1080;
const DEFAULT_JPEG_QUALITY: u8 = 85;
const DEFAULT_THUMBNAIL_MAX: u32 = 150;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBHOOK_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_WEBHOOK_BACKOFF_UNIT_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    /// Uploads root; thumbnails/ and results/ live underneath it.
    pub uploads_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_filename_length: usize,
    pub image_max_width: u32,
    pub image_max_height: u32,
    pub jpeg_quality: u8,
    pub backup_original: bool,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    pub webhook_url: String,
    pub webhook_timeout_secs: u64,
    pub webhook_max_attempts: u32,
    /// One backoff "time unit"; attempt N waits N of these before retrying.
    pub webhook_backoff_unit_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let webhook_url = env::var("TRYON_WEBHOOK_URL")
            .map_err(|_| anyhow::anyhow!("TRYON_WEBHOOK_URL must be set"))?;

        Ok(Config {
            server_port: env_parse("TRYON_PORT", DEFAULT_PORT)?,
            uploads_dir: PathBuf::from(
                env::var("TRYON_UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            max_file_size_bytes: env_parse("TRYON_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
            allowed_extensions: env_list(
                "TRYON_ALLOWED_EXTENSIONS",
                &["jpg", "jpeg", "png", "gif"],
            ),
            allowed_content_types: env_list(
                "TRYON_ALLOWED_CONTENT_TYPES",
                &["image/jpeg", "image/png", "image/gif"],
            ),
            max_filename_length: env_parse("TRYON_MAX_FILENAME_LENGTH", DEFAULT_MAX_FILENAME_LENGTH)?,
            image_max_width: env_parse("TRYON_IMAGE_MAX_WIDTH", DEFAULT_IMAGE_MAX_WIDTH)?,
            image_max_height: env_parse("TRYON_IMAGE_MAX_HEIGHT", DEFAULT_IMAGE_MAX_HEIGHT)?,
            jpeg_quality: env_parse("TRYON_JPEG_QUALITY", DEFAULT_JPEG_QUALITY)?,
            backup_original: env_parse("TRYON_BACKUP_ORIGINAL", true)?,
            thumbnail_max_width: env_parse("TRYON_THUMBNAIL_MAX_WIDTH", DEFAULT_THUMBNAIL_MAX)?,
            thumbnail_max_height: env_parse("TRYON_THUMBNAIL_MAX_HEIGHT", DEFAULT_THUMBNAIL_MAX)?,
            webhook_url,
            webhook_timeout_secs: env_parse("TRYON_WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT_SECS)?,
            webhook_max_attempts: env_parse("TRYON_WEBHOOK_MAX_ATTEMPTS", DEFAULT_WEBHOOK_MAX_ATTEMPTS)?,
            webhook_backoff_unit_ms: env_parse(
                "TRYON_WEBHOOK_BACKOFF_UNIT_MS",
                DEFAULT_WEBHOOK_BACKOFF_UNIT_MS,
            )?,
        })
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn webhook_backoff_unit(&self) -> Duration {
        Duration::from_millis(self.webhook_backoff_unit_ms)
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}
