//! Repository index types
//!
//! Helm-compatible repository index format (`index.yaml` / `index.json`).

use chartdex_core::urlutil::join_or_concat;
use chartdex_core::{
    API_VERSION_V1, ChartMetadata, Constraint, Dependency, Maintainer, ValidationError,
    parse_version,
};
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::error::{PartialIndex, RepoError, Result};

/// Top-level keys accepted in a YAML index
const INDEX_FIELDS: &[&str] = &[
    "serverInfo",
    "apiVersion",
    "generated",
    "entries",
    "publicKeys",
    "annotations",
];

/// Keys accepted on a chart version in a YAML index: chart metadata plus
/// the per-artifact fields
const CHART_VERSION_FIELDS: &[&str] = &[
    "name",
    "home",
    "sources",
    "version",
    "description",
    "keywords",
    "maintainers",
    "icon",
    "apiVersion",
    "condition",
    "tags",
    "appVersion",
    "deprecated",
    "annotations",
    "kubeVersion",
    "dependencies",
    "type",
    "urls",
    "created",
    "removed",
    "digest",
    "checksum",
    "engine",
    "tillerVersion",
    "url",
];

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    /// API version
    pub api_version: String,

    /// When this index was generated
    pub generated: DateTime<Utc>,

    /// Chart versions keyed by chart name
    pub entries: BTreeMap<String, ChartVersions>,

    /// Keys used to verify chart provenance
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub public_keys: Vec<String>,

    /// Free-form annotations for other tooling
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Wire form of an index, before entry cleanup
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndex {
    /// Chartmuseum metadata, accepted and dropped
    #[serde(default, rename = "serverInfo")]
    _server_info: Option<IgnoredAny>,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    generated: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: Option<BTreeMap<String, Option<Vec<Option<ChartVersion>>>>>,
    #[serde(default)]
    public_keys: Option<Vec<String>>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
}

impl IndexFile {
    /// Create an empty index stamped with the current time
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION_V1.to_string(),
            generated: Utc::now(),
            ..Default::default()
        }
    }

    /// Load an index from a file on disk
    pub fn load_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| RepoError::FileAccess {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        load_index(&data, &path.display().to_string())
            .map_err(|partial| RepoError::load(path.display().to_string(), partial))
    }

    /// Add a chart version to the index
    ///
    /// `filename` is the archive path relative to the repository root; the
    /// published URL is its base name joined onto `base_url`, or `filename`
    /// itself when there is no base URL. The index may be left unsorted.
    pub fn must_add(
        &mut self,
        mut metadata: ChartMetadata,
        filename: &str,
        base_url: &str,
        digest: &str,
    ) -> Result<()> {
        if metadata.api_version.is_empty() {
            metadata.api_version = API_VERSION_V1.to_string();
        }
        metadata
            .validate()
            .map_err(|source| RepoError::InvalidEntry {
                filename: filename.to_string(),
                source,
            })?;

        let url = if base_url.is_empty() {
            filename.to_string()
        } else {
            let file = Path::new(filename)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| filename.to_string());
            join_or_concat(base_url, &file)
        };

        let name = metadata.name.clone();
        self.entries.entry(name).or_default().push(ChartVersion {
            metadata,
            urls: vec![url],
            created: Some(Utc::now()),
            digest: digest.to_string(),
            ..Default::default()
        });
        Ok(())
    }

    /// Add a chart version, logging and skipping it when invalid
    pub fn add(&mut self, metadata: ChartMetadata, filename: &str, base_url: &str, digest: &str) {
        let (name, version) = (metadata.name.clone(), metadata.version.clone());
        if let Err(e) = self.must_add(metadata, filename, base_url, digest) {
            tracing::warn!(
                "skipping loading invalid entry for chart {:?} {:?} from {}: {}",
                name,
                version,
                filename,
                e
            );
        }
    }

    /// Whether a version of `name` satisfies `version`
    pub fn has(&self, name: &str, version: &str) -> bool {
        self.get(name, version).is_ok()
    }

    /// Resolve a chart version by name and constraint
    ///
    /// An empty constraint picks the first parseable version, which is the
    /// latest stable release once the index is sorted.
    pub fn get(&self, name: &str, version: &str) -> Result<&ChartVersion> {
        self.get_versions(name)?.get(name, version)
    }

    /// All versions of a chart
    pub fn get_versions(&self, name: &str) -> Result<&ChartVersions> {
        let versions = self
            .entries
            .get(name)
            .ok_or_else(|| RepoError::ChartNotFound {
                name: name.to_string(),
            })?;
        if versions.is_empty() {
            return Err(RepoError::NoChartVersions {
                name: name.to_string(),
            });
        }
        Ok(versions)
    }

    /// Sort every chart's versions newest first
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort();
        }
    }

    /// Merge another index into this one
    ///
    /// Versions missing here (by exact name and version) are appended;
    /// existing records are kept as they are. The index may be left unsorted.
    pub fn merge(&mut self, other: &IndexFile) {
        for versions in other.entries.values() {
            for version in versions.iter() {
                let existing = self.entries.entry(version.name().to_string()).or_default();
                if !existing.iter().any(|v| v.version() == version.version()) {
                    existing.push(version.clone());
                }
            }
        }
    }

    /// Write the index as YAML
    pub fn write_file(&self, dest: &Path, mode: u32) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        chartdex_core::atomic_write_file(dest, content.as_bytes(), mode)?;
        Ok(())
    }

    /// Write the index as indented JSON
    pub fn write_json_file(&self, dest: &Path, mode: u32) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        chartdex_core::atomic_write_file(dest, content.as_bytes(), mode)?;
        Ok(())
    }

    /// Number of chart versions across all charts
    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse index content and drop entries that fail validation
///
/// `data` may be JSON or YAML. `source` names the content in log messages.
/// The index comes back sorted. When the document lacks an `apiVersion` the
/// cleaned index is still returned inside the error.
pub fn load_index(data: &[u8], source: &str) -> std::result::Result<IndexFile, PartialIndex> {
    if data.is_empty() {
        return Err(PartialIndex::new(IndexFile::default(), RepoError::EmptyIndex));
    }

    let raw = decode(data).map_err(|message| {
        PartialIndex::new(
            IndexFile::default(),
            RepoError::IndexParseError { message },
        )
    })?;

    let mut index = IndexFile {
        api_version: raw.api_version.unwrap_or_default(),
        generated: raw.generated.unwrap_or_default(),
        entries: BTreeMap::new(),
        public_keys: raw.public_keys.unwrap_or_default(),
        annotations: raw.annotations.unwrap_or_default(),
    };

    for (name, versions) in raw.entries.unwrap_or_default() {
        let mut kept = Vec::new();
        for version in versions.unwrap_or_default() {
            let Some(mut version) = version else {
                tracing::warn!(
                    "skipping loading invalid entry for chart {:?} from {}: empty entry",
                    name,
                    source
                );
                continue;
            };
            if version.metadata.api_version.is_empty() {
                version.metadata.api_version = API_VERSION_V1.to_string();
            }
            match version.metadata.validate() {
                // Some index generators strip aliases, leaving duplicate names
                Ok(()) | Err(ValidationError::DuplicateDependency(_)) => kept.push(version),
                Err(e) => tracing::warn!(
                    "skipping loading invalid entry for chart {:?} {:?} from {}: {}",
                    name,
                    version.metadata.version,
                    source,
                    e
                ),
            }
        }
        index.entries.insert(name, ChartVersions(kept));
    }

    index.sort_entries();

    if index.api_version.is_empty() {
        return Err(PartialIndex::new(index, RepoError::NoApiVersion));
    }
    Ok(index)
}

/// JSON when the bytes are valid JSON, strict YAML otherwise
fn decode(data: &[u8]) -> std::result::Result<RawIndex, String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        if value.is_null() {
            return Ok(RawIndex::default());
        }
        return serde_json::from_value(value).map_err(|e| e.to_string());
    }

    let value: serde_yaml::Value = serde_yaml::from_slice(data).map_err(|e| e.to_string())?;
    if value.is_null() {
        return Ok(RawIndex::default());
    }
    check_known_fields(&value)?;
    // Decoded again from the bytes so untagged scalars stay text
    serde_yaml::from_slice(data).map_err(|e| e.to_string())
}

/// Reject unknown keys at the index and chart version levels
fn check_known_fields(doc: &serde_yaml::Value) -> std::result::Result<(), String> {
    let Some(top) = doc.as_mapping() else {
        return Ok(());
    };
    check_keys(top, INDEX_FIELDS, "index")?;

    let Some(entries) = top.get("entries").and_then(|e| e.as_mapping()) else {
        return Ok(());
    };
    for (name, versions) in entries {
        let Some(versions) = versions.as_sequence() else {
            continue;
        };
        let context = format!("chart {}", name.as_str().unwrap_or("?"));
        for fields in versions.iter().filter_map(|v| v.as_mapping()) {
            check_keys(fields, CHART_VERSION_FIELDS, &context)?;
        }
    }
    Ok(())
}

fn check_keys(
    map: &serde_yaml::Mapping,
    known: &[&str],
    context: &str,
) -> std::result::Result<(), String> {
    for key in map.keys() {
        match key.as_str() {
            Some(key) if known.contains(&key) => {}
            Some(key) => return Err(format!("unknown field `{}` in {}", key, context)),
            None => return Err(format!("non-string key in {}", context)),
        }
    }
    Ok(())
}

/// Published versions of one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartVersions(pub Vec<ChartVersion>);

impl ChartVersions {
    /// Resolve a version
    ///
    /// An entry whose version string equals `version` wins outright, which
    /// keeps legacy non-semver versions reachable. Otherwise `version` is
    /// compiled as a constraint and the first satisfying entry in the current
    /// order is returned; entries with unparseable versions are skipped.
    pub fn get(&self, name: &str, version: &str) -> Result<&ChartVersion> {
        if !version.is_empty() {
            if let Some(exact) = self.0.iter().find(|v| v.version() == version) {
                return Ok(exact);
            }
        }

        let constraint = Constraint::parse(version)?;
        self.0
            .iter()
            .find(|v| parse_version(v.version()).is_some_and(|parsed| constraint.matches(&parsed)))
            .ok_or_else(|| RepoError::VersionNotFound {
                name: name.to_string(),
                constraint: version.to_string(),
            })
    }

    /// Order newest first, unparseable versions last, ties kept in place
    pub fn sort(&mut self) {
        self.0.sort_by_cached_key(|v| {
            Reverse(parse_version(v.version()).map(|p| (p.major, p.minor, p.patch, p.pre)))
        });
    }
}

impl Deref for ChartVersions {
    type Target = Vec<ChartVersion>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ChartVersions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<ChartVersion>> for ChartVersions {
    fn from(versions: Vec<ChartVersion>) -> Self {
        Self(versions)
    }
}

impl IntoIterator for ChartVersions {
    type Item = ChartVersion;
    type IntoIter = std::vec::IntoIter<ChartVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A published chart archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChartVersionFields")]
pub struct ChartVersion {
    #[serde(flatten)]
    pub metadata: ChartMetadata,

    /// Download URLs, first one canonical
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Tombstone for a version pulled from the repository
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,

    /// SHA256 of the archive
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,

    // Legacy fields, carried through but never consulted
    #[serde(default, rename = "checksum", skip_serializing_if = "String::is_empty")]
    pub checksum_deprecated: String,

    #[serde(default, rename = "engine", skip_serializing_if = "String::is_empty")]
    pub engine_deprecated: String,

    #[serde(default, rename = "tillerVersion", skip_serializing_if = "String::is_empty")]
    pub tiller_version_deprecated: String,

    #[serde(default, rename = "url", skip_serializing_if = "String::is_empty")]
    pub url_deprecated: String,
}

/// Wire form of a chart version with the metadata keys inlined
///
/// Reading the keys directly (rather than through `flatten`) lets plain YAML
/// scalars such as `version: 1.10` arrive as their literal text.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartVersionFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    home: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    maintainers: Vec<Option<Maintainer>>,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    condition: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    app_version: String,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    kube_version: String,
    #[serde(default)]
    dependencies: Vec<Option<Dependency>>,
    #[serde(default, rename = "type")]
    chart_type: String,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    removed: bool,
    #[serde(default)]
    digest: String,
    #[serde(default)]
    checksum: String,
    #[serde(default)]
    engine: String,
    #[serde(default)]
    tiller_version: String,
    #[serde(default)]
    url: String,
}

impl From<ChartVersionFields> for ChartVersion {
    fn from(f: ChartVersionFields) -> Self {
        Self {
            metadata: ChartMetadata {
                name: f.name,
                home: f.home,
                sources: f.sources,
                version: f.version,
                description: f.description,
                keywords: f.keywords,
                maintainers: f.maintainers,
                icon: f.icon,
                api_version: f.api_version,
                condition: f.condition,
                tags: f.tags,
                app_version: f.app_version,
                deprecated: f.deprecated,
                annotations: f.annotations,
                kube_version: f.kube_version,
                dependencies: f.dependencies,
                chart_type: f.chart_type,
            },
            urls: f.urls,
            created: f.created,
            removed: f.removed,
            digest: f.digest,
            checksum_deprecated: f.checksum,
            engine_deprecated: f.engine,
            tiller_version_deprecated: f.tiller_version,
            url_deprecated: f.url,
        }
    }
}

impl ChartVersion {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn api_version(&self) -> &str {
        &self.metadata.api_version
    }

    /// Get the primary download URL
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(|s| s.as_str())
    }
}
