//! GET handler: secure file serving and state rendering.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tryon_core::AppError;
use tryon_processing::sniff_mime;

use crate::error::HttpAppError;
use crate::handlers::{render_state, session_id_from_headers};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    pub file: Option<String>,
}

pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    if let Some(name) = query.file.as_deref() {
        return serve_file(&state, name).await;
    }

    let cookie_id = session_id_from_headers(&headers);
    let (id, session, created) = state.sessions.load_or_create(cookie_id).await;
    render_state(&state, id, &session, created).await
}

/// Serve a stored file by bare name, probing the root, thumbnails, and
/// results folders. Every rejection, security or plain miss, renders as a
/// 404; path detail stays in the log.
async fn serve_file(state: &AppState, name: &str) -> Result<Response, HttpAppError> {
    let path = match state.service.store().resolve_any(name).await {
        Ok(path) => path,
        Err(e) if e.is_security() => {
            tracing::warn!(name = %name, error = %e, "file request rejected");
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
        Err(e) => {
            tracing::debug!(name = %name, error = %e, "file not found");
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
    };

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
    let content_type = sniff_mime(&bytes).unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(bytes))
        .map_err(|e| HttpAppError(AppError::Storage(format!("failed to build response: {}", e))))
}
