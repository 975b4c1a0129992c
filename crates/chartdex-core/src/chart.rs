//! Chart metadata definition and validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::Path;

use crate::error::ValidationError;
use crate::version::parse_version;

/// API version for charts that predate dependency declarations in Chart.yaml
pub const API_VERSION_V1: &str = "v1";

/// API version for charts declaring dependencies inline
pub const API_VERSION_V2: &str = "v2";

static ALIAS_NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("alias pattern is valid"));

/// Chart metadata (the contents of Chart.yaml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart name (required)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Home URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home: String,

    /// Source URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Chart version (required). Kept verbatim so legacy non-SemVer strings
    /// survive a load/save cycle.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Maintainers. Null nodes are kept so validation can reject them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Option<Maintainer>>,

    /// Icon URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,

    /// Chart API version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Condition path used by parent charts
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,

    /// Comma separated tags used by parent charts
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tags: String,

    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_version: String,

    /// Whether the chart is deprecated
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    /// Free-form annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Kubernetes version constraint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kube_version: String,

    /// Dependencies. Null nodes are kept so validation can reject them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Option<Dependency>>,

    /// Chart type: empty, `application` or `library`
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub chart_type: String,
}

/// Maintainer information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Chart dependency as declared in Chart.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Dependency name
    pub name: String,

    /// Version constraint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Repository reference: URL, `@name`, `alias:name`, `file://` or `oci://`
    #[serde(default)]
    pub repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enabled: bool,

    #[serde(
        default,
        rename = "import-values",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub import_values: Vec<serde_json::Value>,

    /// Alias name (overrides dependency name in parent charts)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
}

impl Dependency {
    /// Create a dependency on `name` from `repository`
    pub fn new(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            ..Default::default()
        }
    }

    /// Get the effective name (alias if set, otherwise name)
    #[inline]
    pub fn effective_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    fn validate(&mut self) -> Result<(), ValidationError> {
        sanitize(&mut self.name);
        sanitize(&mut self.version);
        sanitize(&mut self.repository);
        sanitize(&mut self.condition);
        for tag in &mut self.tags {
            sanitize(tag);
        }
        if !self.alias.is_empty() && !ALIAS_NAME_FORMAT.is_match(&self.alias) {
            return Err(ValidationError::InvalidAlias(self.name.clone()));
        }
        Ok(())
    }
}

impl Maintainer {
    fn validate(&mut self) {
        sanitize(&mut self.name);
        sanitize(&mut self.email);
        sanitize(&mut self.url);
    }
}

impl ChartMetadata {
    /// Create metadata with the given name and version and the current API version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            api_version: API_VERSION_V2.to_string(),
            ..Default::default()
        }
    }

    /// Validate and sanitize the metadata in place
    ///
    /// Strings are normalized first (whitespace folded to a space,
    /// non-printable characters removed), then checked in a fixed order so
    /// the first failure reported is stable.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        for field in [
            &mut self.name,
            &mut self.description,
            &mut self.home,
            &mut self.icon,
            &mut self.condition,
            &mut self.tags,
            &mut self.app_version,
            &mut self.kube_version,
        ] {
            sanitize(field);
        }
        for value in self
            .sources
            .iter_mut()
            .chain(self.keywords.iter_mut())
            .chain(self.annotations.values_mut())
        {
            sanitize(value);
        }

        if self.api_version.is_empty() {
            return Err(ValidationError::MissingApiVersion);
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if Path::new(&self.name).file_name() != Some(OsStr::new(&self.name)) {
            return Err(ValidationError::InvalidName(self.name.clone()));
        }
        if self.version.is_empty() {
            return Err(ValidationError::MissingVersion);
        }
        if parse_version(&self.version).is_none() {
            return Err(ValidationError::InvalidVersion(self.version.clone()));
        }
        if !matches!(self.chart_type.as_str(), "" | "application" | "library") {
            return Err(ValidationError::InvalidType(self.chart_type.clone()));
        }

        for maintainer in &mut self.maintainers {
            maintainer
                .as_mut()
                .ok_or(ValidationError::EmptyMaintainer)?
                .validate();
        }

        let mut seen = HashSet::new();
        for dependency in &mut self.dependencies {
            let dependency = dependency.as_mut().ok_or(ValidationError::EmptyDependency)?;
            dependency.validate()?;
            let key = dependency.effective_name().to_string();
            if !seen.insert(key.clone()) {
                return Err(ValidationError::DuplicateDependency(key));
            }
        }

        Ok(())
    }

    /// Iterate over the non-null dependencies
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().flatten()
    }
}

/// Fold whitespace to a plain space and drop control characters
fn sanitize(value: &mut String) {
    if value.chars().all(|c| c == ' ' || !(c.is_whitespace() || c.is_control())) {
        return;
    }
    *value = value
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ChartMetadata {
        ChartMetadata::new("nginx", "15.0.0")
    }

    #[test]
    fn test_chart_deserialize() {
        let yaml = r#"
apiVersion: v2
name: myapp
version: 1.0.0
description: My application
type: application
appVersion: "2.4"
maintainers:
  - name: ops
    email: ops@example.com
dependencies:
  - name: redis
    version: ^17.0.0
    repository: "@bitnami"
"#;
        let md: ChartMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(md.name, "myapp");
        assert_eq!(md.version, "1.0.0");
        assert_eq!(md.chart_type, "application");
        assert_eq!(md.app_version, "2.4");
        assert_eq!(md.dependencies().count(), 1);
        assert_eq!(md.dependencies().next().unwrap().repository, "@bitnami");
    }

    #[test]
    fn test_validate_ok() {
        let mut md = valid();
        assert!(md.validate().is_ok());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut md = valid();
        md.api_version.clear();
        assert_eq!(md.validate(), Err(ValidationError::MissingApiVersion));

        let mut md = valid();
        md.name.clear();
        assert_eq!(md.validate(), Err(ValidationError::MissingName));

        let mut md = valid();
        md.version.clear();
        assert_eq!(md.validate(), Err(ValidationError::MissingVersion));
    }

    #[test]
    fn test_validate_name_must_be_single_component() {
        let mut md = valid();
        md.name = "../evil".to_string();
        assert!(matches!(md.validate(), Err(ValidationError::InvalidName(_))));

        let mut md = valid();
        md.name = "nested/name".to_string();
        assert!(matches!(md.validate(), Err(ValidationError::InvalidName(_))));
    }

    #[test]
    fn test_validate_version_must_parse() {
        let mut md = valid();
        md.version = "not-a-version".to_string();
        assert_eq!(
            md.validate(),
            Err(ValidationError::InvalidVersion("not-a-version".to_string()))
        );

        // Lenient forms are accepted
        let mut md = valid();
        md.version = "v1.2".to_string();
        assert!(md.validate().is_ok());
    }

    #[test]
    fn test_validate_chart_type() {
        let mut md = valid();
        md.chart_type = "library".to_string();
        assert!(md.validate().is_ok());

        md.chart_type = "plugin".to_string();
        assert!(matches!(md.validate(), Err(ValidationError::InvalidType(_))));
    }

    #[test]
    fn test_validate_null_nodes() {
        let mut md = valid();
        md.maintainers.push(None);
        assert_eq!(md.validate(), Err(ValidationError::EmptyMaintainer));

        let mut md = valid();
        md.dependencies.push(None);
        assert_eq!(md.validate(), Err(ValidationError::EmptyDependency));
    }

    #[test]
    fn test_validate_alias_format() {
        let mut md = valid();
        let mut dep = Dependency::new("redis", "https://charts.example.com");
        dep.alias = "cache!".to_string();
        md.dependencies.push(Some(dep));
        assert_eq!(
            md.validate(),
            Err(ValidationError::InvalidAlias("redis".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_dependency() {
        let mut md = valid();
        let mut aliased = Dependency::new("postgresql", "@bitnami");
        aliased.alias = "redis".to_string();
        md.dependencies.push(Some(Dependency::new("redis", "@bitnami")));
        md.dependencies.push(Some(aliased));
        assert_eq!(
            md.validate(),
            Err(ValidationError::DuplicateDependency("redis".to_string()))
        );
    }

    #[test]
    fn test_sanitize() {
        let mut md = valid();
        md.description = "line one\nline\ttwo\u{7}".to_string();
        md.validate().unwrap();
        assert_eq!(md.description, "line one line two");
    }

    #[test]
    fn test_effective_name() {
        let mut dep = Dependency::new("postgresql", "@bitnami");
        assert_eq!(dep.effective_name(), "postgresql");
        dep.alias = "db".to_string();
        assert_eq!(dep.effective_name(), "db");
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let yaml = serde_yaml::to_string(&valid()).unwrap();
        assert!(yaml.contains("name: nginx"));
        assert!(!yaml.contains("home"));
        assert!(!yaml.contains("deprecated"));
    }
}
