use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::directory::DEFAULT_GRAPH_BASE_URL;
use crate::error::{Error, Result};

/// Environment variable consulted for the token secret when the config file
/// does not set one.
pub const JWT_SECRET_ENV: &str = "SCOPEGATE_JWT_SECRET";

/// File under the data directory holding the secret written by `init`.
pub const JWT_SECRET_FILE: &str = ".jwt_secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Maximum number of files in one upload request.
    pub file_count_limit: usize,
    /// Maximum size of a single uploaded file, in bytes.
    pub file_size_limit: u64,
    /// Maximum size of a request body, in bytes.
    pub request_size_limit: usize,
    pub memory_index_name: String,
    pub document_memory_name: String,
    pub directory_base_url: String,
    pub directory_timeout_secs: u64,
    pub roster_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim. Audience is not checked when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_audience: Option<String>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: ServerConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_count_limit == 0 {
            return Err(Error::Config("file_count_limit must be positive".to_string()));
        }
        if self.file_size_limit == 0 {
            return Err(Error::Config("file_size_limit must be positive".to_string()));
        }
        if self.memory_index_name.trim().is_empty() {
            return Err(Error::Config("memory_index_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("scopegate.db")
    }

    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(JWT_SECRET_FILE)
    }

    #[must_use]
    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    #[must_use]
    pub fn roster_timeout(&self) -> Duration {
        Duration::from_secs(self.roster_timeout_secs)
    }

    /// Token secret from the config, then the environment, then the data
    /// directory.
    pub fn resolve_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            return Ok(secret.to_string());
        }
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                return Ok(secret);
            }
        }

        let path = self.secret_path();
        match std::fs::read_to_string(&path) {
            Ok(secret) if !secret.trim().is_empty() => Ok(secret.trim().to_string()),
            _ => Err(Error::Config(format!(
                "no token secret configured: set jwt_secret, {JWT_SECRET_ENV}, or run 'scopegate init'"
            ))),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            file_count_limit: 100,
            file_size_limit: 50 * 1024 * 1024,
            request_size_limit: 100_000_000,
            memory_index_name: "chatmemory".to_string(),
            document_memory_name: "DocumentMemory".to_string(),
            directory_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            directory_timeout_secs: 10,
            roster_timeout_secs: 5,
            jwt_secret: None,
            jwt_audience: None,
        }
    }
}
