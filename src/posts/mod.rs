mod file;
mod model;
mod store;

pub use self::file::{decode, encode, PostFile, StorageError};
pub use self::model::{Post, PostInput, DEFAULT_AUTHOR};
pub use self::store::{PostError, PostStore};
