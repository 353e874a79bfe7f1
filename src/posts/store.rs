use std::sync::Arc;

use tokio::sync::Mutex;

use super::file::{PostFile, StorageError};
use super::model::{Post, PostInput, DEFAULT_AUTHOR};
use crate::ids::{self, Clock, Entropy, SystemClock, ThreadRngEntropy};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PostError {
    #[error("Post not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),
}

/// In-memory post collection mirrored to a [`PostFile`].
///
/// All mutations take the collection lock, change memory, and write the
/// whole collection before releasing it. A failed write is logged and the
/// in-memory change stays.
pub struct PostStore {
    posts: Mutex<Vec<Post>>,
    file: PostFile,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn Entropy>,
}

impl PostStore {
    /// Prepare the backing file and load whatever it holds.
    pub fn open(file: PostFile) -> Result<Self, StorageError> {
        file.initialize()?;
        let posts = file.load();
        Ok(Self {
            posts: Mutex::new(posts),
            file,
            clock: Arc::new(SystemClock),
            entropy: Arc::new(ThreadRngEntropy),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn Entropy>) -> Self {
        self.entropy = entropy;
        self
    }

    pub async fn list(&self) -> Vec<Post> {
        self.posts.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Post, PostError> {
        let posts = self.posts.lock().await;
        posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(PostError::NotFound)
    }

    pub async fn create(&self, input: PostInput) -> Result<Post, PostError> {
        let (title, content) = match (input.title(), input.content()) {
            (Some(title), Some(content)) => (title, content),
            _ => {
                return Err(PostError::Validation(
                    "Title and Content are required".into(),
                ))
            }
        };

        let mut posts = self.posts.lock().await;
        let now = self.clock.now();
        let id = ids::unique_id(now, self.entropy.as_ref(), |candidate| {
            posts.iter().any(|p| p.id == candidate)
        });

        let post = Post {
            id,
            title,
            author: input
                .author()
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            content,
            media: input.media().cloned().unwrap_or_default(),
            created_at: ids::timestamp(now),
            updated_at: None,
        };

        posts.insert(0, post.clone());
        self.persist(&posts).await;
        tracing::info!(id = %post.id, "Created post");
        Ok(post)
    }

    pub async fn update(&self, id: &str, input: PostInput) -> Result<Post, PostError> {
        let mut posts = self.posts.lock().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PostError::NotFound)?;

        if let Some(title) = input.title() {
            post.title = title;
        }
        if let Some(author) = input.author() {
            post.author = author;
        }
        if let Some(content) = input.content() {
            post.content = content;
        }
        if let Some(media) = input.media() {
            post.media = media.clone();
        }
        post.updated_at = Some(ids::timestamp(self.clock.now()));

        let updated = post.clone();
        self.persist(&posts).await;
        tracing::info!(id = %updated.id, "Updated post");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), PostError> {
        let mut posts = self.posts.lock().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Err(PostError::NotFound);
        }

        self.persist(&posts).await;
        tracing::info!(id, "Deleted post");
        Ok(())
    }

    async fn persist(&self, posts: &[Post]) {
        if let Err(e) = self.file.save(posts).await {
            tracing::error!("Failed to save posts: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

    /// Clock that advances by `step_ms` on every read.
    struct SteppingClock {
        millis: AtomicI64,
        step_ms: i64,
    }

    impl SteppingClock {
        fn new(start_ms: i64, step_ms: i64) -> Arc<Self> {
            Arc::new(Self {
                millis: AtomicI64::new(start_ms),
                step_ms,
            })
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let ms = self.millis.fetch_add(self.step_ms, Ordering::SeqCst);
            Utc.timestamp_millis_opt(ms).unwrap()
        }
    }

    struct Counter(AtomicU64);

    impl Entropy for Counter {
        fn next_u64(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn input(v: serde_json::Value) -> PostInput {
        serde_json::from_value(v).unwrap()
    }

    fn open_store(dir: &std::path::Path) -> PostStore {
        PostStore::open(PostFile::new(dir.join("posts.json")))
            .unwrap()
            .with_clock(SteppingClock::new(1_760_000_000_000, 1))
    }

    #[tokio::test]
    async fn create_requires_title_and_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());

        for body in [
            json!({}),
            json!({"title": "only title"}),
            json!({"content": "only content"}),
            json!({"title": "", "content": "x"}),
            json!({"title": "x", "content": ""}),
        ] {
            let err = store.create(input(body)).await.unwrap_err();
            assert_eq!(
                err,
                PostError::Validation("Title and Content are required".into())
            );
        }
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn create_treats_falsy_values_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());

        for body in [
            json!({"title": 0, "content": "x"}),
            json!({"title": "x", "content": false}),
            json!({"title": null, "content": "x"}),
        ] {
            let err = store.create(input(body)).await.unwrap_err();
            assert_eq!(
                err,
                PostError::Validation("Title and Content are required".into())
            );
        }

        let post = store
            .create(input(json!({"title": "T", "content": "C", "author": false})))
            .await
            .unwrap();
        assert_eq!(post.author, "Anonymous");

        let post = store
            .create(input(json!({"title": "T", "content": "C", "author": 0})))
            .await
            .unwrap();
        assert_eq!(post.author, "Anonymous");
    }

    #[tokio::test]
    async fn create_stores_truthy_non_strings_as_text() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());

        let post = store
            .create(input(json!({"title": 2026, "content": true})))
            .await
            .unwrap();
        assert_eq!(post.title, "2026");
        assert_eq!(post.content, "true");
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());

        let post = store
            .create(input(json!({"title": "A", "content": "B", "media": "nope"})))
            .await
            .unwrap();

        assert_eq!(post.author, "Anonymous");
        assert!(post.media.is_empty());
        assert!(!post.id.is_empty());
        assert_eq!(post.created_at, "2025-10-09T08:53:20.000Z");
        assert!(post.updated_at.is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());

        let mut ids = Vec::new();
        for n in 0..4 {
            let post = store
                .create(input(json!({"title": format!("t{}", n), "content": "c"})))
                .await
                .unwrap();
            ids.push(post.id);
        }
        ids.reverse();

        let listed: Vec<String> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn same_millisecond_still_yields_distinct_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PostStore::open(PostFile::new(tmp.path().join("posts.json")))
            .unwrap()
            .with_clock(SteppingClock::new(1_760_000_000_000, 0))
            .with_entropy(Arc::new(Counter(AtomicU64::new(0))));

        let a = store.create(input(json!({"title": "a", "content": "c"}))).await.unwrap();
        let b = store.create(input(json!({"title": "b", "content": "c"}))).await.unwrap();
        let c = store.create(input(json!({"title": "c", "content": "c"}))).await.unwrap();

        assert_eq!(a.id, "1760000000000");
        assert_eq!(b.id, "1760000000000-000000");
        assert_eq!(c.id, "1760000000000-000001");
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let media = json!([{"url": "/uploads/x.png", "original": "x.png", "mime": "image/png"}]);
        let created = store
            .create(input(json!({"title": "T", "author": "Ada", "content": "C", "media": media})))
            .await
            .unwrap();

        let updated = store
            .update(&created.id, input(json!({"title": "X"})))
            .await
            .unwrap();

        assert_eq!(updated.title, "X");
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.content, created.content);
        assert_eq!(updated.media, created.media);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_ignores_falsy_fields_but_accepts_empty_media() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let created = store
            .create(input(json!({"title": "T", "content": "C", "media": [{"url": "/u"}]})))
            .await
            .unwrap();

        let updated = store
            .update(
                &created.id,
                input(json!({"title": "", "author": "", "content": null, "media": []})),
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "T");
        assert_eq!(updated.author, "Anonymous");
        assert_eq!(updated.content, "C");
        assert!(updated.media.is_empty());
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_ignores_falsy_non_strings() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let created = store
            .create(input(json!({"title": "T", "author": "Ada", "content": "C"})))
            .await
            .unwrap();

        let updated = store
            .update(
                &created.id,
                input(json!({"title": false, "author": 0, "content": null})),
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "T");
        assert_eq!(updated.author, "Ada");
        assert_eq!(updated.content, "C");
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_keeps_creation_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let first = store.create(input(json!({"title": "1", "content": "c"}))).await.unwrap();
        let second = store.create(input(json!({"title": "2", "content": "c"}))).await.unwrap();

        store.update(&first.id, input(json!({"content": "new"}))).await.unwrap();

        let listed: Vec<String> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let err = store.update("nope", input(json!({"title": "x"}))).await.unwrap_err();
        assert_eq!(err, PostError::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        let keep = store.create(input(json!({"title": "k", "content": "c"}))).await.unwrap();
        let gone = store.create(input(json!({"title": "g", "content": "c"}))).await.unwrap();

        assert_eq!(store.delete("missing").await, Err(PostError::NotFound));
        assert_eq!(store.list().await.len(), 2);

        store.delete(&gone.id).await.unwrap();
        assert_eq!(store.list().await.len(), 1);
        assert_eq!(store.get(&gone.id).await, Err(PostError::NotFound));
        assert_eq!(store.get(&keep.id).await.unwrap(), keep);
    }

    #[tokio::test]
    async fn reopen_sees_persisted_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_store(tmp.path());
        store.create(input(json!({"title": "1", "content": "c"}))).await.unwrap();
        let second = store.create(input(json!({"title": "2", "content": "c"}))).await.unwrap();
        store.update(&second.id, input(json!({"author": "Grace"}))).await.unwrap();
        let before = store.list().await;

        let reopened = PostStore::open(PostFile::new(tmp.path().join("posts.json"))).unwrap();
        assert_eq!(reopened.list().await, before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_are_serialized() {
        const WRITERS: usize = 32;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("posts.json");
        let store = Arc::new(
            PostStore::open(PostFile::new(path.clone()))
                .unwrap()
                .with_clock(SteppingClock::new(1_760_000_000_000, 0)),
        );

        let handles: Vec<_> = (0..WRITERS)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(input(json!({"title": format!("t{}", n), "content": "c"})))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), WRITERS);
        assert_eq!(store.list().await.len(), WRITERS);

        let on_disk = PostFile::new(path).load();
        assert_eq!(on_disk.len(), WRITERS);
        assert_eq!(on_disk, store.list().await);
    }

    #[tokio::test]
    async fn save_failure_keeps_memory_state() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let store = open_store(&data);
        std::fs::remove_dir_all(&data).unwrap();

        let post = store
            .create(input(json!({"title": "kept", "content": "c"})))
            .await
            .unwrap();

        assert_eq!(store.list().await, vec![post]);
        assert!(!data.join("posts.json").exists());
    }

    #[tokio::test]
    async fn updated_at_tracks_clock() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        let store = PostStore::open(PostFile::new(tmp.path().join("posts.json")))
            .unwrap()
            .with_clock(SteppingClock::new(start.timestamp_millis(), 60_000));

        let post = store.create(input(json!({"title": "t", "content": "c"}))).await.unwrap();
        let updated = store.update(&post.id, input(json!({}))).await.unwrap();

        assert_eq!(
            updated.updated_at.as_deref(),
            Some(ids::timestamp(start + Duration::minutes(1)).as_str())
        );
    }
}
