//! chartdex Core - Core types and utilities for the chart repository tooling
//!
//! This crate provides the foundational pieces used by the repository layer:
//! - `ChartMetadata`: the chart manifest (Chart.yaml) and its validation rules
//! - `version`: lenient semantic version parsing and constraint matching
//! - `archive`: reading metadata out of packaged `.tgz` charts
//! - `digest`: content digests recorded in repository indices
//! - `urlutil`: URL joining and normalization-aware comparison
//! - `fsutil`: atomic file writes

pub mod archive;
pub mod chart;
pub mod digest;
pub mod error;
pub mod fsutil;
pub mod urlutil;
pub mod version;

pub use archive::{ChartLoader, TarballLoader, load_archive};
pub use chart::{API_VERSION_V1, API_VERSION_V2, ChartMetadata, Dependency, Maintainer};
pub use digest::{Digester, Sha256Digester, digest_bytes, digest_file};
pub use error::{CoreError, Result, ValidationError};
pub use fsutil::{DEFAULT_FILE_MODE, atomic_write_file};
pub use version::{Constraint, parse_version};
