use async_trait::async_trait;

use crate::config::HarvestConfig;
use crate::error::StorageError;
use crate::models;
use crate::records::PostRecord;

pub mod db;
pub mod file;

pub use db::DbStore;
pub use file::FileStore;

/// Outcome of one `save_posts` batch. Saves are best-effort: a record that
/// fails to persist lands in `failures` and the rest of the batch proceeds.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub comments: usize,
    pub failures: Vec<(String, StorageError)>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Capability contract both storage backends implement.
///
/// The two implementations intentionally diverge in two places: the file
/// store skips the write when a known post is unchanged and matches
/// subreddit names case-insensitively, while the relational store writes on
/// every save and matches exactly. See the backend modules.
#[async_trait]
pub trait Storage {
    /// Persists a batch of posts with insert-or-update semantics.
    async fn save_posts(&self, posts: Vec<PostRecord>) -> Result<SaveReport, StorageError>;

    /// Exact-key lookup. An unknown ID is `Ok(None)`, never an error.
    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StorageError>;

    /// Existence predicate, independent of retrieving the full record.
    async fn post_exists(&self, post_id: &str) -> Result<bool, StorageError>;

    /// All stored posts for one subreddit.
    async fn get_posts_by_subreddit(
        &self,
        subreddit: &str,
    ) -> Result<Vec<PostRecord>, StorageError>;
}

/// The closed set of storage backends, decided once at process start.
pub enum StorageBackend {
    File(FileStore),
    Db(DbStore),
}

impl StorageBackend {
    /// Backend factory: a configured database URL selects the relational
    /// store (connecting and migrating up front), its absence selects the
    /// file-backed store.
    pub async fn from_config(config: &HarvestConfig) -> Self {
        if config.database_url.is_some() {
            let db = models::open_or_create_db(config).await;
            models::migrate_up(db.clone()).await;
            StorageBackend::Db(DbStore::new(db, config.remote_timeout_secs))
        } else {
            StorageBackend::File(FileStore::new(config.posts_path.clone()))
        }
    }
}

#[async_trait]
impl Storage for StorageBackend {
    async fn save_posts(&self, posts: Vec<PostRecord>) -> Result<SaveReport, StorageError> {
        match self {
            StorageBackend::File(store) => store.save_posts(posts).await,
            StorageBackend::Db(store) => store.save_posts(posts).await,
        }
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StorageError> {
        match self {
            StorageBackend::File(store) => store.get_post(post_id).await,
            StorageBackend::Db(store) => store.get_post(post_id).await,
        }
    }

    async fn post_exists(&self, post_id: &str) -> Result<bool, StorageError> {
        match self {
            StorageBackend::File(store) => store.post_exists(post_id).await,
            StorageBackend::Db(store) => store.post_exists(post_id).await,
        }
    }

    async fn get_posts_by_subreddit(
        &self,
        subreddit: &str,
    ) -> Result<Vec<PostRecord>, StorageError> {
        match self {
            StorageBackend::File(store) => store.get_posts_by_subreddit(subreddit).await,
            StorageBackend::Db(store) => store.get_posts_by_subreddit(subreddit).await,
        }
    }
}
