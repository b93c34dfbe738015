pub mod entity;
pub mod records;
use tokio::sync::OnceCell;

use std::sync::Arc;

use crate::storage::StorageBackend;

pub mod storage;

pub mod error;

pub mod config;

pub mod migrate;

pub mod models;

static HARVEST_CORE: OnceCell<Arc<HarvestCore>> = OnceCell::const_new();

pub async fn core() -> Arc<HarvestCore> {
    HARVEST_CORE
        .get_or_init(|| async move { Arc::new(HarvestCore::start().await.expect("failed to init")) })
        .await
        .clone()
}

/// Main runtime handle for the harvester.
pub struct HarvestCore {
    pub config: config::HarvestConfig,

    /// Storage backend selected from the config at startup; every consumer
    /// talks to it through the `Storage` port.
    pub storage: StorageBackend,
}

impl HarvestCore {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::get_or_init().await?;

        // Backend selection happens once here; a configured database URL
        // means relational, otherwise the local document store.
        let storage = StorageBackend::from_config(&config).await;

        Ok(Self { config, storage })
    }
}

pub mod prelude {
    pub use super::entity;
    pub use super::records;

    pub use super::storage;
    pub use super::storage::Storage;

    pub use super::error;

    pub use super::config;

    pub use super::migrate;

    pub use super::models;
}
