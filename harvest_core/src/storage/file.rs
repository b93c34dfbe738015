use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::records::{now_rfc3339, PostRecord};
use crate::storage::{SaveReport, Storage};

/// File-backed store: one pretty-printed JSON document mapping post ID to
/// the full record, read fully and rewritten fully on every mutating call.
///
/// Embedded `top_comments` are stored opaquely as part of the post record;
/// unlike the relational backend, nothing is detached.
///
/// Mutations are serialized through `write_lock` so concurrent `save_posts`
/// calls cannot interleave their load-modify-store cycles and drop each
/// other's updates.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the whole document. A missing file reads as an empty map; a
    /// present but unparseable file is surfaced as `CorruptStore` rather
    /// than silently discarded.
    async fn load(&self) -> Result<BTreeMap<String, PostRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&contents).map_err(|source| StorageError::CorruptStore {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrites the whole document, creating it (and its parent directory)
    /// on first use.
    async fn persist(&self, data: &BTreeMap<String, PostRecord>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Every stored record, keys discarded. Feeds the migration utility.
    pub async fn dump_all(&self) -> Result<Vec<PostRecord>, StorageError> {
        Ok(self.load().await?.into_values().collect())
    }
}

#[async_trait]
impl Storage for FileStore {
    async fn save_posts(&self, posts: Vec<PostRecord>) -> Result<SaveReport, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut data = self.load().await?;
        let mut report = SaveReport::default();

        for post in posts {
            let mut post = post.sanitize();
            match data.get(&post.id) {
                None => {
                    post.collected_at = Some(now_rfc3339());
                    data.insert(post.id.clone(), post);
                    report.inserted += 1;
                }
                Some(existing) => {
                    // Only a changed score or comment count triggers a
                    // merge; a read-only re-fetch leaves the stored record
                    // untouched.
                    if existing.score != post.score || existing.num_comments != post.num_comments {
                        post.collected_at = existing.collected_at.clone();
                        post.last_updated = Some(now_rfc3339());
                        data.insert(post.id.clone(), post);
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
            }
        }

        self.persist(&data).await?;
        Ok(report)
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StorageError> {
        Ok(self.load().await?.get(post_id).cloned())
    }

    async fn post_exists(&self, post_id: &str) -> Result<bool, StorageError> {
        Ok(self.load().await?.contains_key(post_id))
    }

    /// Case-insensitive subreddit match, unlike the relational backend.
    async fn get_posts_by_subreddit(
        &self,
        subreddit: &str,
    ) -> Result<Vec<PostRecord>, StorageError> {
        let wanted = subreddit.to_lowercase();
        Ok(self
            .load()
            .await?
            .into_values()
            .filter(|post| post.subreddit.to_lowercase() == wanted)
            .collect())
    }
}
