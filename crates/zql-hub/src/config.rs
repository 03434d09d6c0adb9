//! # Configuration
//!
//! Loaded once at startup from a TOML file; every field has a default, and a
//! missing file means "all defaults".
//!
//! ```toml
//! [server]
//! address = "0.0.0.0"
//! port = 80
//! static_root = "./"
//!
//! [mongodb]
//! database = "dbname"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mongodb: MongoConfig,
    #[serde(default)]
    pub influxdb: InfluxConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for every path other than `/convert`.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            static_root: default_static_root(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MongoConfig {
    /// Database the emitted shell query selects.
    #[serde(default = "default_mongo_database")]
    pub database: String,
    /// Collection override; empty means "take it from the query".
    #[serde(default)]
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            database: default_mongo_database(),
            collection: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct InfluxConfig {
    /// Measurement override; empty means "take it from the query".
    #[serde(default)]
    pub measurement: String,
}

fn default_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    80
}
fn default_static_root() -> PathBuf {
    PathBuf::from("./")
}
fn default_cors_permissive() -> bool {
    true
}
fn default_mongo_database() -> String {
    "dbname".into()
}

impl Config {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
