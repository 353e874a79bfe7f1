use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs::{File, OpenOptions};

use crate::ids::{self, Clock, Entropy, SystemClock, ThreadRngEntropy};

/// Public URL prefix under which stored uploads are served.
pub const URL_PREFIX: &str = "/uploads";

const MAX_NAME_ATTEMPTS: usize = 8;

/// Metadata returned for each stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub url: String,
    pub original: String,
    pub mime: String,
}

/// Produces `<millis>-<random><ext>` names that keep the original extension.
#[derive(Clone)]
pub struct UploadNamer {
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn Entropy>,
}

impl Default for UploadNamer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadRngEntropy))
    }
}

impl UploadNamer {
    pub fn new(clock: Arc<dyn Clock>, entropy: Arc<dyn Entropy>) -> Self {
        Self { clock, entropy }
    }

    pub fn name_for(&self, original: &str) -> String {
        format!(
            "{}-{}{}",
            self.clock.now().timestamp_millis(),
            ids::base36(self.entropy.next_u64(), ids::SUFFIX_LEN),
            extension(original)
        )
    }
}

/// Final extension of `original` including the dot, or empty.
///
/// Dotfiles have no extension. Extensions with anything beyond
/// `[A-Za-z0-9_-]` are dropped so the stored name stays one path component.
fn extension(original: &str) -> String {
    let ext = Path::new(original)
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| {
            let dot = name.rfind('.')?;
            (dot > 0).then(|| &name[dot + 1..])
        });

    match ext {
        Some(ext)
            if ext
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
        {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}

/// Where an incoming file should be written and how it will be reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
}

/// Upload capability: a directory plus a namer. Opens destinations but never
/// writes bytes itself.
pub struct UploadStore {
    dir: PathBuf,
    namer: UploadNamer,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, namer: UploadNamer) -> Self {
        Self {
            dir: dir.into(),
            namer,
        }
    }

    pub fn destination(&self, original: &str) -> Destination {
        let file_name = self.namer.name_for(original);
        Destination {
            path: self.dir.join(&file_name),
            url: format!("{}/{}", URL_PREFIX, file_name),
            file_name,
        }
    }

    /// Pick a destination and open it exclusively, drawing a fresh name if
    /// the generated one already exists on disk.
    pub async fn create_file(&self, original: &str) -> std::io::Result<(Destination, File)> {
        let mut attempts = 0;
        loop {
            let dest = self.destination(original);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&dest.path)
                .await
            {
                Ok(file) => return Ok((dest, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempts < MAX_NAME_ATTEMPTS => {
                    tracing::warn!("Upload name {} already taken, retrying", dest.file_name);
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
