//! Repository configuration management
//!
//! Stores repository configuration in `~/.config/chartdex/repositories.yaml`

use chartdex_core::urlutil::urls_equal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};

/// Repository configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this file was last written
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    /// Configured repositories
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: Utc::now(),
            repositories: Vec::new(),
        }
    }
}

impl RepositoryConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file is an empty configuration, not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no repository configuration at {}, using empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(RepoError::FileAccess {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        chartdex_core::atomic_write_file(path, content.as_bytes(), 0o600)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("chartdex").join("repositories.yaml"))
    }

    /// Get default repository cache directory
    pub fn default_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine cache directory".to_string(),
        })?;
        Ok(cache_dir.join("chartdex").join("repository"))
    }

    /// Get a repository by name
    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Whether a repository with this name is configured
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add a repository, replacing any existing one with the same name
    pub fn update(&mut self, repo: Repository) {
        match self.repositories.iter_mut().find(|r| r.name == repo.name) {
            Some(existing) => *existing = repo,
            None => self.repositories.push(repo),
        }
    }

    /// Remove a repository by name, returning whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.repositories.len();
        self.repositories.retain(|r| r.name != name);
        self.repositories.len() != before
    }

    /// List all repository names
    pub fn names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Repository definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Unique name for this repository
    pub name: String,

    /// Repository URL
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Client certificate for mutual TLS
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_file: String,

    /// Client key for mutual TLS
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_file: String,

    /// CA bundle for TLS verification
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_file: String,

    /// Skip TLS verification (insecure, not recommended)
    #[serde(default, rename = "insecure_skip_tls_verify")]
    pub insecure_skip_tls_verify: bool,

    /// Send credentials to every domain serving this repository's charts
    #[serde(default, rename = "pass_credentials_all")]
    pub pass_credentials_all: bool,
}

impl Repository {
    /// Create a repository with no credentials
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Whether this repository is served from `url`, ignoring cosmetic URL differences
    pub fn has_url(&self, url: &str) -> bool {
        urls_equal(&self.url, url)
    }
}
