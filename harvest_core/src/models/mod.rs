use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::config::HarvestConfig;

pub mod migrator;

pub async fn open_or_create_db(config: &HarvestConfig) -> DatabaseConnection {
    let connection_string = config
        .database_url
        .as_deref()
        .expect("no database URL configured");

    Database::connect(connection_string)
        .await
        .expect("Failed to connect to database")
}

pub async fn migrate_up(db: DatabaseConnection) {
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
}
