//! Configuration management for credchain

use crate::persistence::FileStoreOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Largest accepted request body, sized for inline image uploads.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Verbose request logging for the HTTP layer.
    #[serde(default)]
    pub debug: bool,
    /// Directory of static front-end files served for unmatched routes.
    #[serde(default)]
    pub static_dir: Option<String>,
    /// Origins allowed by CORS. Empty allows any origin, without credentials.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub atomic_writes: bool,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub verify_on_load: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    #[serde(default = "default_images_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            static_dir: None,
            allowed_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            atomic_writes: true,
            backup: false,
            verify_on_load: false,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            path: default_images_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LedgerConfig {
    pub fn store_options(&self) -> FileStoreOptions {
        FileStoreOptions {
            atomic_writes: self.atomic_writes,
            backup: self.backup,
            verify_on_load: self.verify_on_load,
        }
    }
}

impl Config {
    /// Effective tracing level; `server.debug` forces `debug`.
    pub fn log_level(&self) -> tracing::Level {
        if self.server.debug {
            return tracing::Level::DEBUG;
        }
        self.logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Ok(path) = std::env::var("CREDCHAIN_LEDGER_PATH") {
            if !path.is_empty() {
                self.ledger.path = path;
            }
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.ledger.path.trim().is_empty() {
            return Err("ledger.path must be set in config.toml".into());
        }
        if self.images.path.trim().is_empty() {
            return Err("images.path must not be empty".into());
        }
        if self.server.max_body_bytes == 0 {
            return Err("server.max_body_bytes must be greater than zero".into());
        }
        if self.server.host.trim().is_empty() {
            return Err("server.host must not be empty".into());
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(format!("logging.level '{}' is not a valid level", self.logging.level).into());
        }
        Ok(())
    }
}

/// Parse a configuration document without touching the environment.
pub fn parse_config(config_str: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(config_str)?
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(format!("Failed to read {}: {}", path.display(), e).into()),
    };
    let mut config = parse_config(&config_str)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_ledger_path() -> String {
    "credentials.json".to_string()
}

fn default_images_path() -> String {
    "images.json".to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
