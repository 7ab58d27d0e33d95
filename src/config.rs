use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Service settings: optional JSON file named by `TOMATO_CONFIG`, then
/// environment overrides (`MODELS_DIR`, `MARKET_DATA`, `BIND_ADDR`, `PORT`).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub models_dir: PathBuf,
    /// JSON array of market weeks to seed the ledger with.
    pub market_data: Option<PathBuf>,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            market_data: None,
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// `load` with an injectable variable lookup.
    pub fn load_with<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match var("TOMATO_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(dir) = var("MODELS_DIR") {
            cfg.models_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("MARKET_DATA") {
            cfg.market_data = Some(PathBuf::from(path));
        }
        if let Some(addr) = var("BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        if let Some(port) = var("PORT") {
            cfg.port = port.parse().map_err(|_| ConfigError::Env {
                key: "PORT",
                value: port,
            })?;
        }
        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
