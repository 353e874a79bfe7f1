use std::path::PathBuf;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::uploads::{MediaRef, UploadStore};

/// Multipart field carrying the uploaded files.
const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<MediaRef>,
}

pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_files))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let store = state.uploads.as_deref().ok_or(AppError::UploadsUnavailable)?;
    let mut multipart = multipart.map_err(|e| AppError::UploadFailed(e.body_text()))?;

    let mut written = Vec::new();
    match receive_files(store, &mut multipart, &mut written).await {
        Ok(files) => {
            tracing::info!("Stored {} uploaded file(s)", files.len());
            Ok(Json(UploadResponse { files }))
        }
        Err(e) => {
            discard(&written).await;
            Err(e)
        }
    }
}

/// Stream every `files` part to its destination, recording each path as soon
/// as it exists on disk.
async fn receive_files(
    store: &UploadStore,
    multipart: &mut Multipart,
    written: &mut Vec<PathBuf>,
) -> AppResult<Vec<MediaRef>> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(upload_failed)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        // Browsers send an empty filename for an untouched file input
        let Some(original) = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
        else {
            continue;
        };
        let mime = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&original)
                    .first_or_octet_stream()
                    .to_string()
            });

        let (dest, mut file) = store.create_file(&original).await.map_err(upload_failed)?;
        written.push(dest.path.clone());

        while let Some(chunk) = field.chunk().await.map_err(upload_failed)? {
            file.write_all(&chunk).await.map_err(upload_failed)?;
        }
        file.flush().await.map_err(upload_failed)?;

        tracing::debug!("Saved upload {} as {}", original, dest.file_name);
        files.push(MediaRef {
            url: dest.url,
            original,
            mime,
        });
    }

    Ok(files)
}

fn upload_failed(err: impl std::fmt::Display) -> AppError {
    AppError::UploadFailed(err.to_string())
}

async fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove partial upload {}: {}", path.display(), e);
        }
    }
}
