//! POST handler: one state-machine transition per request.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::Response;

use crate::error::HttpAppError;
use crate::handlers::{render_state, session_id_from_headers};
use crate::service::{Action, ActionInput, UploadedFile};
use crate::state::AppState;

pub async fn post_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let cookie_id = session_id_from_headers(&headers);
    let (id, session, created) = state.sessions.load_or_create(cookie_id).await;

    let committed = match parse_form(&mut multipart).await {
        Ok((Some(action), input)) => state.service.apply(&session, action, input).await,
        Ok((None, _)) => {
            // Unknown or missing action: the stage stays where it was.
            let mut unchanged = session.clone();
            unchanged.last_error = Some("Unknown action.".to_string());
            unchanged.touch();
            unchanged
        }
        Err(user_message) => {
            let mut failed = session.clone();
            failed.fail(user_message);
            failed
        }
    };

    state.sessions.commit(id, committed.clone()).await;
    render_state(&state, id, &committed, created).await
}

/// Pull the action and its inputs out of the multipart form. Errors are
/// already user-safe messages; the technical detail is logged here.
async fn parse_form(multipart: &mut Multipart) -> Result<(Option<Action>, ActionInput), String> {
    const READ_ERROR: &str = "Upload could not be read. Please try again.";

    let mut action = None;
    let mut input = ActionInput::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "multipart parse failed");
                return Err(READ_ERROR.to_string());
            }
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "action" => {
                let raw = field.text().await.map_err(|e| {
                    tracing::debug!(error = %e, "failed to read action field");
                    READ_ERROR.to_string()
                })?;
                action = Action::parse(raw.trim());
            }
            "user_photo" | "jewelry_photo" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::debug!(field = %name, error = %e, "failed to read file field");
                    READ_ERROR.to_string()
                })?;
                // Browsers post an empty part for an untouched file input.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let upload = UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                };
                match name.as_str() {
                    "user_photo" => input.user_photo = Some(upload),
                    _ => input.jewelry_photo = Some(upload),
                }
            }
            "user_gallery" => {
                input.user_gallery = Some(read_text(field, &name).await?);
            }
            "jewelry_gallery" => {
                input.jewelry_gallery = Some(read_text(field, &name).await?);
            }
            "pin_user" => {
                input.pin_user = Some(parse_flag(&read_text(field, &name).await?));
            }
            "pin_jewelry" => {
                input.pin_jewelry = Some(parse_flag(&read_text(field, &name).await?));
            }
            other => {
                tracing::debug!(field = %other, "ignoring unknown form field");
            }
        }
    }

    Ok((action, input))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, String> {
    field.text().await.map_err(|e| {
        tracing::debug!(field = %name, error = %e, "failed to read form field");
        "Upload could not be read. Please try again.".to_string()
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "on" | "yes")
}
