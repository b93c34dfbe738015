use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .col(string(Post::Id).primary_key())
                    .col(string(Post::Title))
                    .col(string_null(Post::Author))
                    .col(timestamp(Post::CreatedUtc))
                    .col(big_integer(Post::Score))
                    .col(double(Post::UpvoteRatio))
                    .col(big_integer(Post::NumComments))
                    .col(string(Post::Permalink))
                    .col(string(Post::Url))
                    .col(boolean(Post::IsSelf))
                    .col(string_null(Post::Selftext))
                    .col(string_null(Post::LinkFlairText))
                    .col(string(Post::Subreddit))
                    .col(timestamp(Post::CollectedAt))
                    .col(timestamp_null(Post::LastUpdated))
                    .to_owned(),
            )
            .await?;

        // Create index on subreddit for partition scans
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_subreddit")
                    .table(Post::Table)
                    .col(Post::Subreddit)
                    .to_owned(),
            )
            .await?;

        // Create index on created_utc for ordered listings
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created_utc")
                    .table(Post::Table)
                    .col(Post::CreatedUtc)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Post {
    Table,
    Id,
    Title,
    Author,
    CreatedUtc,
    Score,
    UpvoteRatio,
    NumComments,
    Permalink,
    Url,
    IsSelf,
    Selftext,
    LinkFlairText,
    Subreddit,
    CollectedAt,
    LastUpdated,
}
