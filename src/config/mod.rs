//! Configuration module for the plant tracker.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which durable layout backs the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Single `plants` table in a SQLite file
    Sqlite,
    /// Whole collection serialized to one JSON file
    Json,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StorageBackend::Sqlite),
            "json" => Some(StorageBackend::Json),
            _ => None,
        }
    }
}

/// A configuration value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid value for {}: '{}'", self.variable, self.value)
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Record store backend
    pub backend: StorageBackend,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to the JSON slot file
    pub json_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend_raw = env::var("PLANTS_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
        let backend = StorageBackend::parse(&backend_raw).ok_or(ConfigError {
            variable: "PLANTS_BACKEND",
            value: backend_raw.clone(),
        })?;

        let db_path = env::var("PLANTS_DB_PATH")
            .unwrap_or_else(|_| "./data/plants.sqlite".to_string())
            .into();

        let json_path = env::var("PLANTS_JSON_PATH")
            .unwrap_or_else(|_| "./data/plants.json".to_string())
            .into();

        let bind_raw = env::var("PLANTS_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError {
            variable: "PLANTS_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let log_level = env::var("PLANTS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            backend,
            db_path,
            json_path,
            bind_addr,
            log_level,
        })
    }
}
