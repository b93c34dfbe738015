use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use sea_orm::sea_query::OnConflict;
use sea_orm::SqlErr;

use crate::entity::prelude::*;
use crate::error::StorageError;
use crate::records::{epoch_to_rfc3339, now_rfc3339, PostRecord};
use crate::storage::{SaveReport, Storage};

/// Relational store: posts and comments live in separate tables, embedded
/// top comments are detached from the post payload at save time.
///
/// Unlike the file store there is no diff-and-skip branch; every save of a
/// known post writes the row and stamps `last_updated`.
pub struct DbStore {
    db: DatabaseConnection,
    remote_timeout: Duration,
}

enum SaveOutcome {
    Inserted,
    Updated,
}

impl DbStore {
    pub fn new(db: DatabaseConnection, remote_timeout_secs: u64) -> Self {
        Self {
            db,
            remote_timeout: Duration::from_secs(remote_timeout_secs),
        }
    }

    /// Bounds a remote call. The upstream service gives no latency
    /// guarantees, so an elapsed timeout is reported as a retryable
    /// `StorageError::Timeout` instead of hanging the batch.
    async fn call<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, DbErr>> + Send,
    {
        match tokio::time::timeout(self.remote_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StorageError::Timeout),
        }
    }

    fn post_row(post: &PostRecord) -> PostActiveModel {
        PostActiveModel {
            id: Set(post.id.clone()),
            title: Set(post.title.clone()),
            author: Set(post.author.clone()),
            created_utc: Set(epoch_to_rfc3339(post.created_utc)),
            score: Set(post.score),
            upvote_ratio: Set(post.upvote_ratio),
            num_comments: Set(post.num_comments),
            permalink: Set(post.permalink.clone()),
            url: Set(post.url.clone()),
            is_self: Set(post.is_self),
            selftext: Set(post.selftext.clone()),
            link_flair_text: Set(post.link_flair_text.clone()),
            subreddit: Set(post.subreddit.clone()),
            collected_at: NotSet,
            last_updated: NotSet,
        }
    }

    /// Full-column update keyed by ID. `collected_at` stays `NotSet` so the
    /// first-seen stamp is never overwritten.
    async fn update_post(&self, post: &PostRecord) -> Result<(), StorageError> {
        let mut row = Self::post_row(post);
        row.id = Unchanged(post.id.clone());
        row.last_updated = Set(Some(now_rfc3339()));
        self.call(row.update(&self.db)).await?;
        Ok(())
    }

    async fn save_post(&self, post: &PostRecord) -> Result<SaveOutcome, StorageError> {
        if self.post_exists(&post.id).await? {
            self.update_post(post).await?;
            return Ok(SaveOutcome::Updated);
        }

        let mut row = Self::post_row(post);
        row.collected_at = Set(now_rfc3339());
        match self
            .call(Post::insert(row).exec_without_returning(&self.db))
            .await
        {
            Ok(_) => Ok(SaveOutcome::Inserted),
            // A concurrent writer can insert between our existence check
            // and this insert; the record now exists, so retry as an update.
            Err(StorageError::Db(err))
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.update_post(post).await?;
                Ok(SaveOutcome::Updated)
            }
            Err(err) => Err(err),
        }
    }

    /// Upserts one detached comment, keyed on the synthesized composite ID.
    /// A re-submission with the same author and timestamp replaces the row.
    async fn save_comment(
        &self,
        post_id: &str,
        comment: &crate::records::CommentRecord,
    ) -> Result<(), StorageError> {
        let row = CommentActiveModel {
            id: Set(comment.storage_id(post_id)),
            post_id: Set(post_id.to_string()),
            author: Set(comment.author.clone()),
            body: Set(comment.body.clone()),
            score: Set(comment.score),
            created_utc: Set(epoch_to_rfc3339(comment.created_utc)),
            collected_at: Set(now_rfc3339()),
        };
        self.call(
            Comment::insert(row)
                .on_conflict(
                    OnConflict::column(CommentColumn::Id)
                        .update_columns([
                            CommentColumn::Author,
                            CommentColumn::Body,
                            CommentColumn::Score,
                            CommentColumn::CreatedUtc,
                            CommentColumn::CollectedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&self.db),
        )
        .await?;
        Ok(())
    }
}

fn record_from_model(model: PostModel) -> PostRecord {
    // Stored timestamps are RFC 3339; anything unparseable reads as epoch 0
    // rather than failing the lookup.
    let created_utc = DateTime::parse_from_rfc3339(&model.created_utc)
        .map(|dt| dt.timestamp())
        .unwrap_or(0);

    PostRecord {
        id: model.id,
        title: model.title,
        author: model.author,
        created_utc,
        score: model.score,
        upvote_ratio: model.upvote_ratio,
        num_comments: model.num_comments,
        permalink: model.permalink,
        url: model.url,
        is_self: model.is_self,
        selftext: model.selftext,
        link_flair_text: model.link_flair_text,
        subreddit: model.subreddit,
        // Comments are detached into their own table and not re-attached.
        top_comments: Vec::new(),
        collected_at: Some(model.collected_at),
        last_updated: model.last_updated,
    }
}

#[async_trait]
impl Storage for DbStore {
    /// Best-effort batch save: a record that fails is reported and the rest
    /// of the batch continues.
    async fn save_posts(&self, posts: Vec<PostRecord>) -> Result<SaveReport, StorageError> {
        let mut report = SaveReport::default();

        for post in posts {
            let mut post = post.sanitize();
            let comments = std::mem::take(&mut post.top_comments);

            match self.save_post(&post).await {
                Ok(SaveOutcome::Inserted) => report.inserted += 1,
                Ok(SaveOutcome::Updated) => report.updated += 1,
                Err(err) => {
                    report.failures.push((post.id.clone(), err));
                    continue;
                }
            }

            for comment in &comments {
                match self.save_comment(&post.id, comment).await {
                    Ok(()) => report.comments += 1,
                    Err(err) => report.failures.push((post.id.clone(), err)),
                }
            }
        }

        Ok(report)
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StorageError> {
        let found = self
            .call(Post::find_by_id(post_id).one(&self.db))
            .await?;
        Ok(found.map(record_from_model))
    }

    async fn post_exists(&self, post_id: &str) -> Result<bool, StorageError> {
        let found = self
            .call(Post::find_by_id(post_id).one(&self.db))
            .await?;
        Ok(found.is_some())
    }

    /// Exact subreddit match (case-sensitive, unlike the file store),
    /// newest first.
    async fn get_posts_by_subreddit(
        &self,
        subreddit: &str,
    ) -> Result<Vec<PostRecord>, StorageError> {
        let models = self
            .call(
                Post::find()
                    .filter(PostColumn::Subreddit.eq(subreddit))
                    .order_by_desc(PostColumn::CreatedUtc)
                    .all(&self.db),
            )
            .await?;
        Ok(models.into_iter().map(record_from_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::migrator::Migrator;
    use crate::records::CommentRecord;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn setup_test_store() -> DbStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        DbStore::new(db, 30)
    }

    fn test_post(id: &str, subreddit: &str, score: i64) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            title: format!("Post {}", id),
            author: Some("alice".to_string()),
            created_utc: 1700000000,
            score,
            upvote_ratio: 0.97,
            num_comments: 2,
            permalink: format!("/r/{}/comments/{}", subreddit, id),
            url: format!("https://reddit.com/r/{}/comments/{}", subreddit, id),
            is_self: true,
            selftext: Some("body".to_string()),
            link_flair_text: None,
            subreddit: subreddit.to_string(),
            top_comments: Vec::new(),
            collected_at: None,
            last_updated: None,
        }
    }

    fn test_comment(author: Option<&str>, created_utc: i64) -> CommentRecord {
        CommentRecord {
            author: author.map(String::from),
            body: "a comment".to_string(),
            score: 3,
            created_utc,
        }
    }

    #[tokio::test]
    async fn test_insert_stamps_collected_at() {
        let store = setup_test_store().await;

        let report = store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert!(report.is_complete());

        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert!(stored.collected_at.is_some());
        assert!(stored.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_idempotent_insert_keeps_one_row() {
        let store = setup_test_store().await;

        store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();
        let first = store.get_post("p1").await.unwrap().unwrap();

        store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();

        let count = Post::find().count(&store.db).await.unwrap();
        assert_eq!(count, 1);

        let second = store.get_post("p1").await.unwrap().unwrap();
        assert_eq!(first.collected_at, second.collected_at);
    }

    #[tokio::test]
    async fn test_resave_always_writes() {
        let store = setup_test_store().await;

        store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();

        // Same score and comment count; the relational store updates anyway.
        let report = store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.inserted, 0);

        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert!(stored.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_update_refreshes_mutable_fields() {
        let store = setup_test_store().await;

        store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();
        store.save_posts(vec![test_post("p1", "rust", 42)]).await.unwrap();

        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert_eq!(stored.score, 42);
    }

    #[tokio::test]
    async fn test_comments_are_detached_and_upserted() {
        let store = setup_test_store().await;

        let mut post = test_post("p1", "rust", 10);
        post.top_comments = vec![
            test_comment(Some("bob"), 1700000100),
            test_comment(Some("carol"), 1700000200),
        ];

        let report = store.save_posts(vec![post.clone()]).await.unwrap();
        assert_eq!(report.comments, 2);

        // Comments never land on the post row
        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert!(stored.top_comments.is_empty());

        // Re-saving the same batch collapses onto the same composite IDs
        store.save_posts(vec![post]).await.unwrap();
        let count = Comment::find().count(&store.db).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_comment_identity_collisions_collapse() {
        let store = setup_test_store().await;

        let mut post = test_post("p1", "rust", 10);
        post.top_comments = vec![
            test_comment(Some("bob"), 1700000100),
            test_comment(Some("bob"), 1700000100),
        ];

        store.save_posts(vec![post]).await.unwrap();

        // Same author and timestamp under the same post: one stored row
        let count = Comment::find().count(&store.db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_deleted_comment_author_stored_as_null() {
        let store = setup_test_store().await;

        let mut post = test_post("p1", "rust", 10);
        post.top_comments = vec![test_comment(None, 1700000100)];

        store.save_posts(vec![post]).await.unwrap();

        let comment = Comment::find().one(&store.db).await.unwrap().unwrap();
        assert_eq!(comment.author, None);
        assert_eq!(comment.id, "p1_[deleted]_1700000100");
    }

    #[tokio::test]
    async fn test_subreddit_lookup_is_case_sensitive() {
        let store = setup_test_store().await;

        store.save_posts(vec![test_post("p1", "python", 10)]).await.unwrap();

        assert!(store.get_posts_by_subreddit("Python").await.unwrap().is_empty());
        assert_eq!(store.get_posts_by_subreddit("python").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subreddit_listing_is_newest_first() {
        let store = setup_test_store().await;

        let mut older = test_post("p1", "rust", 10);
        older.created_utc = 1700000000;
        let mut newer = test_post("p2", "rust", 10);
        newer.created_utc = 1700005000;

        store.save_posts(vec![older, newer]).await.unwrap();

        let posts = store.get_posts_by_subreddit("rust").await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "p2");
        assert_eq!(posts[1].id, "p1");
    }

    #[tokio::test]
    async fn test_get_post_absent_is_none() {
        let store = setup_test_store().await;
        assert!(store.get_post("missing").await.unwrap().is_none());
        assert!(!store.post_exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_post_converts_timestamp_back() {
        let store = setup_test_store().await;

        store.save_posts(vec![test_post("p1", "rust", 10)]).await.unwrap();

        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert_eq!(stored.created_utc, 1700000000);
    }

    #[tokio::test]
    async fn test_selftext_cleared_on_link_posts() {
        let store = setup_test_store().await;

        let mut post = test_post("p1", "rust", 10);
        post.is_self = false;
        post.selftext = Some("stray text".to_string());
        store.save_posts(vec![post]).await.unwrap();

        let stored = store.get_post("p1").await.unwrap().unwrap();
        assert_eq!(stored.selftext, None);
    }
}
