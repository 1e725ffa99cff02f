use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::import::{BatchLimits, DEFAULT_MAX_BYTES, DEFAULT_MAX_FILES};

/// Settings for the bulk import command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub service_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_token: Option<String>,
    pub max_files: usize,
    pub max_bytes: u64,
    pub concurrency: usize,
}

impl ImportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: ImportConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        if config.max_files == 0 || config.max_bytes == 0 {
            return Err(Error::Config(
                "max_files and max_bytes must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    #[must_use]
    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            max_count: self.max_files,
            max_bytes: self.max_bytes,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            service_uri: "http://127.0.0.1:8080".to_string(),
            access_token: None,
            directory_token: None,
            max_files: DEFAULT_MAX_FILES,
            max_bytes: DEFAULT_MAX_BYTES,
            concurrency: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_import_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("import.toml");
        std::fs::write(
            &path,
            "service_uri = \"https://memory.example.com\"\naccess_token = \"t\"\nconcurrency = 4\n",
        )
        .unwrap();

        let config = ImportConfig::load(&path).unwrap();
        assert_eq!(config.service_uri, "https://memory.example.com");
        assert_eq!(config.access_token.as_deref(), Some("t"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.limits(), BatchLimits::default());
    }
}
