pub mod action;
pub mod page;

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tryon_core::constants::{
    JEWELRY_PHOTO_PREFIX, SESSION_COOKIE, THUMBNAIL_PREFIX, USER_PHOTO_PREFIX,
};
use tryon_core::models::session::{Session, Stage};
use tryon_core::AppError;
use tryon_processing::stats::{image_stats, ImageStats};
use tryon_storage::UploadStore;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Session state plus galleries, as rendered to the client.
#[derive(Serialize)]
pub struct StateView {
    pub stage: Stage,
    pub user_photo: Option<String>,
    pub jewelry_photo: Option<String>,
    pub result_photo: Option<String>,
    pub pin_user: bool,
    pub pin_jewelry: bool,
    pub last_error: Option<String>,
    pub user_gallery: Vec<GalleryItem>,
    pub jewelry_gallery: Vec<GalleryItem>,
}

#[derive(Serialize)]
pub struct GalleryItem {
    pub thumbnail: String,
    pub photo: String,
    /// Thumbnail dimensions/MIME/size; absent when the file cannot be read.
    pub stats: Option<ImageStats>,
}

/// Gallery entries for one role, decorated with thumbnail stats. The stat
/// decode is CPU-bound and runs off the request thread.
async fn gallery_items(store: &UploadStore, prefix: &str) -> Result<Vec<GalleryItem>, HttpAppError> {
    let entries = store.list_gallery(prefix).await?;
    let thumbnails_dir = store.thumbnails_dir();

    tokio::task::spawn_blocking(move || {
        entries
            .into_iter()
            .map(|e| GalleryItem {
                stats: image_stats(&thumbnails_dir.join(&e.thumbnail)).ok(),
                thumbnail: e.thumbnail,
                photo: e.photo,
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| HttpAppError(AppError::Storage(format!("gallery listing failed: {}", e))))
}

/// Extract the session id from the request's cookies, if present and valid.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            Uuid::parse_str(value.trim()).ok()
        } else {
            None
        }
    })
}

fn session_cookie_value(id: Uuid) -> HeaderValue {
    // The value is a UUID plus fixed attributes, always a valid header.
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Render the committed session (plus both galleries) as JSON, attaching the
/// session cookie when newly issued.
pub async fn render_state(
    state: &AppState,
    session_id: Uuid,
    session: &Session,
    set_cookie: bool,
) -> Result<Response, HttpAppError> {
    let thumb_user = format!("{}{}", THUMBNAIL_PREFIX, USER_PHOTO_PREFIX);
    let thumb_jewel = format!("{}{}", THUMBNAIL_PREFIX, JEWELRY_PHOTO_PREFIX);

    let user_gallery = gallery_items(state.service.store(), &thumb_user).await?;
    let jewelry_gallery = gallery_items(state.service.store(), &thumb_jewel).await?;

    let view = StateView {
        stage: session.stage,
        user_photo: session.user_photo.clone(),
        jewelry_photo: session.jewelry_photo.clone(),
        result_photo: session.result_photo.clone(),
        pin_user: session.pin_user,
        pin_jewelry: session.pin_jewelry,
        last_error: session.last_error.clone(),
        user_gallery,
        jewelry_gallery,
    };

    let mut response = axum::Json(view).into_response();
    if set_cookie {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, session_cookie_value(session_id));
    }
    Ok(response)
}
