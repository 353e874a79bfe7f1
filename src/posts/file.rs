use std::path::{Path, PathBuf};

use super::model::Post;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize the whole collection as an indented JSON array.
pub fn encode(posts: &[Post]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(posts)?)
}

/// Parse a posts file. Blank content is an empty collection.
pub fn decode(raw: &str) -> Result<Vec<Post>, StorageError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// The JSON file backing the post store.
#[derive(Debug, Clone)]
pub struct PostFile {
    path: PathBuf,
}

impl PostFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the data directory and file exist, seeding `[]` when missing.
    pub fn initialize(&self) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        if !self.path.exists() {
            std::fs::write(&self.path, "[]").map_err(|e| StorageError::io(&self.path, e))?;
            tracing::info!("Created posts file at {}", self.path.display());
        }
        Ok(())
    }

    /// Read the collection, falling back to empty on any failure.
    pub fn load(&self) -> Vec<Post> {
        let result = std::fs::read_to_string(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))
            .and_then(|raw| decode(&raw));

        match result {
            Ok(posts) => {
                tracing::info!("Loaded {} posts from {}", posts.len(), self.path.display());
                posts
            }
            Err(e) => {
                tracing::error!("Failed to load posts: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the file with the full collection.
    pub async fn save(&self, posts: &[Post]) -> Result<(), StorageError> {
        let json = encode(posts)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StorageError::io(&self.path, e))
    }
}
