use harvest_core::config;
use harvest_core::migrate::migrate_file_store;
use harvest_core::models;
use harvest_core::storage::{DbStore, FileStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::get_or_init().await?;
    if config.database_url.is_none() {
        eprintln!("No database URL configured; nothing to migrate into");
        std::process::exit(1);
    }

    let source = FileStore::new(config.posts_path.clone());

    let db = models::open_or_create_db(&config).await;
    models::migrate_up(db.clone()).await;
    let target = DbStore::new(db, config.remote_timeout_secs);

    println!("Migrating posts from {} ...", config.posts_path.display());
    let report = migrate_file_store(&source, &target).await?;

    println!(
        "Done: {} inserted, {} updated, {} comments",
        report.inserted, report.updated, report.comments
    );
    for (post_id, err) in &report.failures {
        eprintln!("failed to migrate post {}: {}", post_id, err);
    }
    if !report.is_complete() {
        eprintln!(
            "{} record(s) failed; re-run to retry (saves are idempotent)",
            report.failures.len()
        );
        std::process::exit(1);
    }

    Ok(())
}
