use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    /// Platform-assigned ID, stable across fetches. Never rewritten.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    /// RFC 3339; converted from source epoch seconds at persistence time.
    pub created_utc: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub permalink: String,
    pub url: String,
    pub is_self: bool,
    pub selftext: Option<String>,
    pub link_flair_text: Option<String>,
    pub subreddit: String,
    /// Stamped once at first insert, untouched by updates.
    pub collected_at: String,
    pub last_updated: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
