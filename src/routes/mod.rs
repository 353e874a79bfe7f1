pub mod pages;
pub mod posts;
pub mod uploads;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application: JSON API, uploads, and the static shell.
pub fn build_router(state: AppState) -> Router {
    let public_dir = state.config.public_path().clone();
    let uploads_dir = state.config.uploads_path();
    let max_upload = state.config.max_upload_bytes();

    Router::new()
        .merge(posts::router())
        .merge(uploads::router(max_upload))
        .merge(pages::router(&public_dir, &uploads_dir))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
