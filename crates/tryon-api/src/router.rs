use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{action, page};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Room for two photos plus form overhead; per-file limits are enforced
    // by the validator.
    let body_limit = state.config.max_file_size_bytes * 2 + 1024 * 1024;

    Router::new()
        .route("/", get(page::get_page).post(action::post_action))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
