use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;
use crate::uploads::URL_PREFIX;

/// Entry pages plus the uploads directory. Everything else in the public
/// directory is served by the fallback in [`super::build_router`].
pub fn router(public_dir: &Path, uploads_dir: &Path) -> Router<AppState> {
    let index = public_dir.join("index.html");

    Router::new()
        .route_service("/", ServeFile::new(&index))
        .route_service("/index.html", ServeFile::new(&index))
        .route_service("/blog.html", ServeFile::new(public_dir.join("blog.html")))
        .nest_service(URL_PREFIX, ServeDir::new(uploads_dir))
}
