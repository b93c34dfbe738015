use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "harvest";
static POSTS_FILE_NAME: &str = "posts.json";
static CONFIG_FILE_NAME: &str = "config.json";

// For now this directory structure should be like
// data_dir_path
// |- harvest
//    |- posts.json
//    |- config.json

fn default_remote_timeout_secs() -> u64 {
    30
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HarvestConfig {
    /// Connection URL for the relational backend. When absent the process
    /// runs against the file-backed store instead.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Path of the file-backed store's document.
    pub posts_path: PathBuf,

    /// Upper bound on any single remote storage call.
    ///
    /// `serde(default)` keeps backward compatibility with old config.json files.
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
}

impl HarvestConfig {
    /// Creates a new HarvestConfig pointing at the specified data directory,
    /// file-backed by default.
    fn new(data_dir: PathBuf) -> Self {
        HarvestConfig {
            database_url: None,
            posts_path: data_dir.join(POSTS_FILE_NAME),
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<HarvestConfig, Box<dyn std::error::Error>> {
    let data_dir = dirs::data_dir().expect("failed to find a data directory on this platform");

    let harvest_dir = data_dir.join(DATA_DIR_NAME);
    let config_path = harvest_dir.join(CONFIG_FILE_NAME);

    // Create the harvest directory if it doesn't exist
    fs::create_dir_all(&harvest_dir).await?;

    // Check if config file exists
    if config_path.exists() {
        // Read and deserialize existing config
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let config: HarvestConfig = serde_json::from_str(&contents)?;
        Ok(config)
    } else {
        // Create new config
        let config = HarvestConfig::new(harvest_dir.clone());

        // Serialize and write to file
        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        Ok(config)
    }
}
