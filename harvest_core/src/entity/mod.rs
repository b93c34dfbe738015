// SeaORM entities backing the relational store.

pub mod comment;
pub mod post;

pub mod prelude {
    pub use super::comment::{
        ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comment,
        Model as CommentModel,
    };
    pub use super::post::{
        ActiveModel as PostActiveModel, Column as PostColumn, Entity as Post, Model as PostModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbConn,
        DbErr, EntityTrait, ModelTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
        QuerySelect, Related, RelationTrait, Set, Unchanged,
    };
}
