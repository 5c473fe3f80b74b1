//! Shared bootstrap for the credchain binaries

use crate::config::{load_config_from, Config, DEFAULT_CONFIG_PATH};
use crate::credentials::CredentialService;
use crate::images::ImageStore;
use crate::persistence::JsonFileStore;
use std::path::{Path, PathBuf};

/// Load `config.toml` (or `config_path`) and apply an optional ledger path
/// override from the command line. Ledger paths must be valid UTF-8.
pub fn load_config_with_overrides(
    config_path: Option<&Path>,
    ledger: Option<PathBuf>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let mut config = load_config_from(path)?;
    if let Some(ledger) = ledger {
        config.ledger.path = ledger.into_os_string().into_string().map_err(|raw| {
            format!(
                "ledger path {} is not valid UTF-8",
                PathBuf::from(raw).display()
            )
        })?;
    }
    Ok(config)
}

pub fn open_store(config: &Config) -> JsonFileStore {
    JsonFileStore::with_options(&config.ledger.path, config.ledger.store_options())
}

pub fn open_service(config: &Config) -> CredentialService {
    CredentialService::new(Box::new(open_store(config)))
}

/// Image archive written with the ledger's durability options.
pub fn open_image_store(config: &Config) -> ImageStore {
    ImageStore::with_options(&config.images.path, config.ledger.store_options())
}

/// Install the global `tracing` subscriber at the configured level.
pub fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .init();
}
