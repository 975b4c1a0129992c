//! CLI commands

use chartdex_repo::{ChartRepositories, RepositoryConfig};
use std::path::PathBuf;

use crate::error::{CliError, Result};

pub mod index;
pub mod repo;
pub mod resolve;
pub mod show;

/// Locations of the repository configuration and index cache
#[derive(Debug, Clone)]
pub struct Settings {
    pub repository_config: PathBuf,
    pub repository_cache: PathBuf,
}

impl Settings {
    /// Fill unset locations with the platform defaults
    pub fn resolve(config: Option<PathBuf>, cache: Option<PathBuf>) -> Result<Self> {
        let repository_config = match config {
            Some(path) => path,
            None => RepositoryConfig::default_path()?,
        };
        let repository_cache = match cache {
            Some(path) => path,
            None => RepositoryConfig::default_cache_dir()?,
        };
        Ok(Self {
            repository_config,
            repository_cache,
        })
    }

    pub fn load_config(&self) -> Result<RepositoryConfig> {
        Ok(RepositoryConfig::load_from(&self.repository_config)?)
    }

    pub fn repositories(&self) -> Result<ChartRepositories> {
        ChartRepositories::new(&self.repository_config, &self.repository_cache).map_err(|e| {
            CliError::from(e).with_help(format!(
                "Check {} for syntax errors",
                self.repository_config.display()
            ))
        })
    }
}
