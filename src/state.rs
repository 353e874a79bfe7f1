use std::sync::Arc;

use crate::config::Config;
use crate::posts::PostStore;
use crate::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostStore>,
    /// `None` when the server runs without upload support.
    pub uploads: Option<Arc<UploadStore>>,
    pub config: Config,
}
