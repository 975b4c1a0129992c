//! Reading chart metadata from packaged archives
//!
//! A packaged chart is a gzip-compressed tarball whose entries live under a
//! single top-level directory named after the chart, with the manifest at
//! `<chart>/Chart.yaml`.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};
use tar::Archive;

use crate::chart::{API_VERSION_V1, ChartMetadata};
use crate::error::{CoreError, Result};

/// Loads chart metadata from a packaged archive
pub trait ChartLoader: Send + Sync {
    fn load_metadata(&self, path: &Path) -> Result<ChartMetadata>;
}

/// Loader for `.tgz` chart archives
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballLoader;

impl ChartLoader for TarballLoader {
    fn load_metadata(&self, path: &Path) -> Result<ChartMetadata> {
        load_archive(path)
    }
}

/// Read and validate `Chart.yaml` from a chart archive
///
/// Charts written before API versions existed omit `apiVersion`; those are
/// treated as `v1`.
pub fn load_archive(path: &Path) -> Result<ChartMetadata> {
    read_chart_yaml(path).map_err(|e| match e {
        CoreError::Validation(_) | CoreError::InvalidArchive { .. } => e,
        other => CoreError::InvalidArchive {
            path: path.display().to_string(),
            message: other.to_string(),
        },
    })
}

fn read_chart_yaml(path: &Path) -> Result<ChartMetadata> {
    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();

        // Only the top-level chart's manifest, never a subchart's
        let mut components = entry_path
            .components()
            .filter(|c| !matches!(c, Component::CurDir));
        let (Some(_), Some(file_name), None) =
            (components.next(), components.next(), components.next())
        else {
            continue;
        };
        if file_name.as_os_str() != "Chart.yaml" {
            continue;
        }

        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        let mut metadata: ChartMetadata = serde_yaml::from_str(&content)?;
        if metadata.api_version.is_empty() {
            metadata.api_version = API_VERSION_V1.to_string();
        }
        metadata.validate()?;
        return Ok(metadata);
    }

    Err(CoreError::InvalidArchive {
        path: path.display().to_string(),
        message: "Chart.yaml file is missing".to_string(),
    })
}
