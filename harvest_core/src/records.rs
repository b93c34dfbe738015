use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when rendering a deleted author into a comment's
/// synthesized storage key. The stored `author` column stays NULL.
const DELETED_AUTHOR: &str = "[deleted]";

/// A post as handed over by the collector, top comments embedded.
///
/// `created_utc` stays in source epoch seconds here; backends convert it to
/// RFC 3339 at persistence time where their schema wants a timestamp string.
/// `collected_at` and `last_updated` are storage-derived and never set by
/// the collector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub created_utc: i64,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub permalink: String,
    pub url: String,
    pub is_self: bool,
    pub selftext: Option<String>,
    pub link_flair_text: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub top_comments: Vec<CommentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl PostRecord {
    /// Drops `selftext` on link posts. Only self posts carry body text;
    /// anything else the source put there is noise.
    pub fn sanitize(mut self) -> Self {
        if !self.is_self {
            self.selftext = None;
        }
        self
    }
}

/// A top comment embedded in a [`PostRecord`].
///
/// The source never retrieves the platform's native comment ID, so identity
/// is synthesized from the owning post, the author, and the created
/// timestamp. A deleted author is a true `None`, not a placeholder string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
}

impl CommentRecord {
    /// Composite storage key: `{post_id}_{author}_{created_utc}`.
    ///
    /// Deterministic by construction; two comments under the same post with
    /// the same author and timestamp collapse to one stored row.
    pub fn storage_id(&self, post_id: &str) -> String {
        let author = self.author.as_deref().unwrap_or(DELETED_AUTHOR);
        format!("{}_{}_{}", post_id, author, self.created_utc)
    }
}

/// Epoch seconds to an RFC 3339 string. Out-of-range values clamp to the
/// Unix epoch rather than failing the whole record.
pub fn epoch_to_rfc3339(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339()
}

/// Current wall clock as an RFC 3339 string, used for `collected_at` and
/// `last_updated` stamps.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
