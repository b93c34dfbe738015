use sea_orm_migration::prelude::*;

mod m20260830_000001_create_posts_table;
mod m20260830_000002_create_comments_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260830_000001_create_posts_table::Migration),
            Box::new(m20260830_000002_create_comments_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite:file::memory:?cache=shared").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    assert!(schema_manager.has_table("post").await?);
    assert!(schema_manager.has_table("comment").await?);

    Ok(())
}
