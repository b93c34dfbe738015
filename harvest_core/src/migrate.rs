use crate::error::StorageError;
use crate::storage::{DbStore, FileStore, SaveReport, Storage};

/// One-shot batch move of every record in the file-backed store into the
/// relational store, through the same save path live collection uses.
///
/// There is no chunking or checkpointing; a partial failure is recovered by
/// re-running the whole migration, which is safe because `save_posts` is
/// idempotent per record.
pub async fn migrate_file_store(
    source: &FileStore,
    target: &DbStore,
) -> Result<SaveReport, StorageError> {
    let posts = source.dump_all().await?;
    target.save_posts(posts).await
}
