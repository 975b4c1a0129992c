//! chartdex Repository Management
//!
//! This crate provides the repository metadata layer for chartdex:
//!
//! - **Index engine**: parse, validate, query, merge and write Helm-compatible
//!   `index.yaml` files
//! - **Directory indexing**: build an index from a directory of packaged charts
//! - **Repository registry**: resolve names, aliases and URLs to configured
//!   repositories and cache their indices
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartdex_repo::{ChartRepositories, RepositoryConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = ChartRepositories::new(
//!     &RepositoryConfig::default_path()?,
//!     RepositoryConfig::default_cache_dir()?,
//! )?;
//!
//! let name = repos.get_for_ref("stable/nginx");
//! if let Some(index) = repos.get_index(&name)? {
//!     let latest = index.get("nginx", "")?;
//!     println!("{} {}", latest.name(), latest.version());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod index;
pub mod registry;

// Re-exports for convenience
pub use config::{Repository, RepositoryConfig};
pub use directory::{index_directory, index_directory_with};
pub use error::{PartialIndex, RepoError, Result};
pub use index::{ChartVersion, ChartVersions, IndexFile, load_index};
pub use registry::{
    ChartRepositories, FsIndexSource, IndexSource, MANAGER_KEY_PREFIX, cache_index_file,
};
