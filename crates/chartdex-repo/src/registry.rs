//! Registry of configured repositories and their cached indices
//!
//! Resolves the many ways a chart can point at a repository (a name, an
//! `@name` or `alias:name` reference, a bare URL) to one canonical name, and
//! lazily loads each repository's cached `index.yaml` at most once.
//!
//! Two locks guard the state: an `RwLock` over the repository table and a
//! `Mutex` over the index cache. When both are needed the index cache is
//! taken first.

use chartdex_core::urlutil::{is_absolute_url, is_oci};
use chartdex_core::{Dependency, digest_bytes};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{Repository, RepositoryConfig};
use crate::error::{RepoError, Result};
use crate::index::{IndexFile, load_index};

/// Name prefix for repositories registered on the fly from a URL
pub const MANAGER_KEY_PREFIX: &str = "chartdex-manager-";

/// File name of a repository's cached index
pub fn cache_index_file(name: &str) -> String {
    format!("{}-index.yaml", name)
}

/// Where cached index bytes come from
pub trait IndexSource: Send + Sync {
    /// Read the index at `path`, or `None` when there is none
    fn read_index(&self, path: &Path) -> Result<Option<Vec<u8>>>;
}

/// Reads cached indices from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsIndexSource;

impl IndexSource for FsIndexSource {
    fn read_index(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepoError::FileAccess {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Configured repositories plus a lazily populated index cache
pub struct ChartRepositories {
    cache_root: PathBuf,
    source: Box<dyn IndexSource>,
    indices: Mutex<HashMap<String, Arc<IndexFile>>>,
    repos: RwLock<HashMap<String, Arc<Repository>>>,
}

impl std::fmt::Debug for ChartRepositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRepositories")
            .field("cache_root", &self.cache_root)
            .field("repos", &self.keys())
            .finish_non_exhaustive()
    }
}

impl ChartRepositories {
    /// Load the repository configuration at `config_path`
    pub fn new(config_path: &Path, cache_root: impl Into<PathBuf>) -> Result<Self> {
        let config = RepositoryConfig::load_from(config_path)?;
        Ok(Self::from_config(config, cache_root))
    }

    pub fn from_config(config: RepositoryConfig, cache_root: impl Into<PathBuf>) -> Self {
        let repos = config
            .repositories
            .into_iter()
            .map(|repo| (repo.name.clone(), Arc::new(repo)))
            .collect();

        Self {
            cache_root: cache_root.into(),
            source: Box::new(FsIndexSource),
            indices: Mutex::new(HashMap::new()),
            repos: RwLock::new(repos),
        }
    }

    /// Replace the filesystem reader used to load cached indices
    pub fn with_source(mut self, source: impl IndexSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Path of the cached index for a repository
    pub fn index_path(&self, name: &str) -> PathBuf {
        self.cache_root.join(cache_index_file(name))
    }

    fn repos(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Repository>>> {
        self.repos.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn repos_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Repository>>> {
        self.repos.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn indices(&self) -> MutexGuard<'_, HashMap<String, Arc<IndexFile>>> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Repository with exactly this name
    pub fn get_info(&self, name: &str) -> Option<Arc<Repository>> {
        if name.is_empty() {
            return None;
        }
        self.repos().get(name).cloned()
    }

    /// Names of all known repositories, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.repos().keys().cloned().collect()
    }

    /// First repository matching `pred`
    pub fn find_info(&self, pred: impl Fn(&Repository) -> bool) -> Option<Arc<Repository>> {
        self.repos().values().find(|repo| pred(repo)).cloned()
    }

    /// Names of all repositories matching `pred`
    pub fn find_keys(&self, pred: impl Fn(&Repository) -> bool) -> Vec<String> {
        self.repos()
            .values()
            .filter(|repo| pred(repo))
            .map(|repo| repo.name.clone())
            .collect()
    }

    /// Repository served from `url`
    ///
    /// When none is configured, a repository named after the URL's digest is
    /// registered and returned, so the same URL always maps to the same name.
    pub fn get_info_by_url(&self, url: &str) -> Arc<Repository> {
        let mut repos = self.repos_mut();
        if let Some(repo) = repos.values().find(|repo| repo.has_url(url)) {
            return Arc::clone(repo);
        }

        let name = format!("{}{}", MANAGER_KEY_PREFIX, digest_bytes(url.as_bytes()));
        tracing::info!("registering repository {} for {}", name, url);
        let repo = Arc::new(Repository::new(name.clone(), url));
        repos.insert(name, Arc::clone(&repo));
        repo
    }

    /// Canonical repository name for a reference, or `""` when it has none
    ///
    /// Accepts a name, `@name`, `alias:name`, or an absolute URL. Blank,
    /// `file://` and `oci://` references never resolve.
    pub fn canonicalize_repo_name(&self, reference: &str) -> String {
        if reference.is_empty() || reference.starts_with("file://") || is_oci(reference) {
            return String::new();
        }

        {
            let repos = self.repos();
            for prefix in ["@", "alias:"] {
                let trimmed = reference.strip_prefix(prefix).unwrap_or(reference);
                if !trimmed.is_empty() && repos.contains_key(trimmed) {
                    return trimmed.to_string();
                }
            }
        }

        if is_absolute_url(reference) {
            return self.get_info_by_url(reference).name.clone();
        }
        String::new()
    }

    /// Canonical repository for each dependency, keyed by dependency name
    ///
    /// Dependencies whose repository does not resolve are left out.
    pub fn get_for_deps<'a>(
        &self,
        deps: impl IntoIterator<Item = &'a Dependency>,
    ) -> HashMap<String, String> {
        deps.into_iter()
            .filter_map(|dep| {
                let name = self.canonicalize_repo_name(&dep.repository);
                (!name.is_empty()).then(|| (dep.name.clone(), name))
            })
            .collect()
    }

    /// Canonical repository of a `repo/chart` reference
    pub fn get_for_ref(&self, reference: &str) -> String {
        match reference.rfind('/') {
            Some(i) if i > 0 => self.canonicalize_repo_name(&reference[..i]),
            _ => String::new(),
        }
    }

    /// Cached index of a repository, loaded on first use
    ///
    /// Blank and unknown names give `Ok(None)`, as does a known repository
    /// with no cached index on disk. An index that exists but cannot be read
    /// or parsed is an error and is not cached.
    pub fn get_index(&self, name: &str) -> Result<Option<Arc<IndexFile>>> {
        if name.is_empty() {
            return Ok(None);
        }

        let mut indices = self.indices();
        if let Some(index) = indices.get(name) {
            return Ok(Some(Arc::clone(index)));
        }

        let Some(repo) = self.get_info(name) else {
            return Ok(None);
        };

        let path = self.index_path(&repo.name);
        let Some(data) = self.source.read_index(&path)? else {
            tracing::debug!("no cached index for {} at {}", name, path.display());
            return Ok(None);
        };

        let source = path.display().to_string();
        let index = Arc::new(
            load_index(&data, &source).map_err(|partial| RepoError::load(source.clone(), partial))?,
        );
        tracing::debug!(
            "loaded index for {} from {} ({} chart versions)",
            name,
            path.display(),
            index.len()
        );
        indices.insert(name.to_string(), Arc::clone(&index));
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const STABLE_INDEX: &str = r#"
apiVersion: v1
entries:
  nginx:
    - name: nginx
      version: 1.0.0
      urls: [https://charts.example.com/stable/nginx-1.0.0.tgz]
    - name: nginx
      version: 2.0.0
      urls: [https://charts.example.com/stable/nginx-2.0.0.tgz]
"#;

    fn registry(cache_root: &Path) -> ChartRepositories {
        let mut config = RepositoryConfig::default();
        config.update(Repository::new("stable", "https://charts.example.com/stable"));
        config.update(Repository::new("myrepo", "https://myrepo.example.com/charts/"));
        ChartRepositories::from_config(config, cache_root)
    }

    /// Serves fixed content and counts reads
    struct CountingSource {
        data: Option<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl IndexSource for CountingSource {
        fn read_index(&self, _path: &Path) -> Result<Option<Vec<u8>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            std::thread::yield_now();
            Ok(self.data.clone())
        }
    }

    #[test]
    fn test_cache_index_file() {
        assert_eq!(cache_index_file("stable"), "stable-index.yaml");
        let reg = registry(Path::new("/cache"));
        assert_eq!(
            reg.index_path("stable"),
            PathBuf::from("/cache/stable-index.yaml")
        );
    }

    #[test]
    fn test_get_info() {
        let reg = registry(Path::new("/cache"));
        assert_eq!(
            reg.get_info("stable").unwrap().url,
            "https://charts.example.com/stable"
        );
        assert!(reg.get_info("").is_none());
        assert!(reg.get_info("unknown").is_none());
    }

    #[test]
    fn test_find_info_and_keys() {
        let reg = registry(Path::new("/cache"));
        let mut keys = reg.keys();
        keys.sort();
        assert_eq!(keys, vec!["myrepo", "stable"]);

        let found = reg.find_info(|r| r.url.contains("myrepo")).unwrap();
        assert_eq!(found.name, "myrepo");
        assert!(reg.find_info(|r| r.name == "none").is_none());

        let mut https = reg.find_keys(|r| r.url.starts_with("https://"));
        https.sort();
        assert_eq!(https, vec!["myrepo", "stable"]);
    }

    #[test]
    fn test_canonicalize_blank_file_and_oci() {
        let reg = registry(Path::new("/cache"));
        assert_eq!(reg.canonicalize_repo_name(""), "");
        assert_eq!(reg.canonicalize_repo_name("file:///tmp/x"), "");
        assert_eq!(reg.canonicalize_repo_name("file://../charts/sub"), "");
        assert_eq!(reg.canonicalize_repo_name("oci://ghcr.io/org/charts"), "");
        assert_eq!(reg.keys().len(), 2);
    }

    #[test]
    fn test_canonicalize_names_and_aliases() {
        let reg = registry(Path::new("/cache"));
        assert_eq!(reg.canonicalize_repo_name("stable"), "stable");
        assert_eq!(reg.canonicalize_repo_name("@myrepo"), "myrepo");
        assert_eq!(reg.canonicalize_repo_name("alias:myrepo"), "myrepo");
        assert_eq!(reg.canonicalize_repo_name("@"), "");
        assert_eq!(reg.canonicalize_repo_name("unknown"), "");
    }

    #[test]
    fn test_canonicalize_registered_url() {
        let reg = registry(Path::new("/cache"));
        assert_eq!(
            reg.canonicalize_repo_name("https://charts.example.com/stable"),
            "stable"
        );
        assert_eq!(
            reg.canonicalize_repo_name("https://MyRepo.example.com/charts"),
            "myrepo"
        );
        assert_eq!(reg.keys().len(), 2);
    }

    #[test]
    fn test_canonicalize_unregistered_url_is_stable() {
        let reg = registry(Path::new("/cache"));
        let url = "https://other.example.com/charts";

        let first = reg.canonicalize_repo_name(url);
        let second = reg.canonicalize_repo_name(url);

        assert_eq!(first, second);
        assert_eq!(
            first,
            format!("{}{}", MANAGER_KEY_PREFIX, digest_bytes(url.as_bytes()))
        );
        assert_eq!(reg.keys().len(), 3);
        assert_eq!(reg.get_info(&first).unwrap().url, url);
        // Now registered, so the name alone resolves too
        assert_eq!(reg.canonicalize_repo_name(&first), first);
    }

    #[test]
    fn test_get_info_by_url_concurrent_registers_once() {
        let reg = registry(Path::new("/cache"));
        let barrier = Barrier::new(8);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    reg.get_info_by_url("https://race.example.com/charts")
                });
            }
        });
        assert_eq!(reg.keys().len(), 3);
    }

    #[test]
    fn test_get_for_ref() {
        let reg = registry(Path::new("/cache"));
        assert_eq!(reg.get_for_ref("stable/mychart"), "stable");
        assert_eq!(reg.get_for_ref("mychart"), "");
        assert_eq!(reg.get_for_ref("/mychart"), "");
        assert_eq!(reg.get_for_ref("unknown/mychart"), "");
        assert_eq!(
            reg.get_for_ref("https://charts.example.com/stable/mychart"),
            "stable"
        );
    }

    #[test]
    fn test_get_for_deps() {
        let reg = registry(Path::new("/cache"));
        let deps = vec![
            Dependency::new("nginx", "@stable"),
            Dependency::new("redis", "https://myrepo.example.com/charts"),
            Dependency::new("local", "file://../local"),
            Dependency::new("oci", "oci://ghcr.io/org"),
            Dependency::new("none", ""),
        ];

        let resolved = reg.get_for_deps(&deps);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["nginx"], "stable");
        assert_eq!(resolved["redis"], "myrepo");
    }

    #[test]
    fn test_get_index_from_disk() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("stable-index.yaml"), STABLE_INDEX).unwrap();
        let reg = registry(temp.path());

        let index = reg.get_index("stable").unwrap().unwrap();
        assert_eq!(index.get("nginx", "").unwrap().version(), "2.0.0");

        let again = reg.get_index("stable").unwrap().unwrap();
        assert!(Arc::ptr_eq(&index, &again));
    }

    #[test]
    fn test_get_index_soft_misses() {
        let temp = TempDir::new().unwrap();
        let reg = registry(temp.path());

        assert!(reg.get_index("").unwrap().is_none());
        assert!(reg.get_index("unknown").unwrap().is_none());
        // Known repository, nothing cached on disk yet
        assert!(reg.get_index("myrepo").unwrap().is_none());
    }

    #[test]
    fn test_get_index_parse_error_not_cached() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stable-index.yaml");
        std::fs::write(&path, "").unwrap();
        let reg = registry(temp.path());

        let err = reg.get_index("stable").unwrap_err();
        match &err {
            RepoError::Load { path: loaded, source } => {
                assert_eq!(loaded, &path.display().to_string());
                assert!(matches!(**source, RepoError::EmptyIndex));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("stable-index.yaml"));

        std::fs::write(&path, "entries: {}\n").unwrap();
        let err = reg.get_index("stable").unwrap_err();
        assert!(matches!(
            err,
            RepoError::Load { ref source, .. } if matches!(**source, RepoError::NoApiVersion)
        ));
        assert!(err.to_string().starts_with("error loading "));

        std::fs::write(&path, STABLE_INDEX).unwrap();
        assert!(reg.get_index("stable").unwrap().is_some());
    }

    #[test]
    fn test_get_index_loads_at_most_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reg = registry(Path::new("/cache")).with_source(CountingSource {
            data: Some(STABLE_INDEX.as_bytes().to_vec()),
            reads: Arc::clone(&reads),
        });

        let barrier = Barrier::new(16);
        let loaded: Vec<Arc<IndexFile>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        reg.get_index("stable").unwrap().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_get_index_missing_is_retried() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reg = registry(Path::new("/cache")).with_source(CountingSource {
            data: None,
            reads: Arc::clone(&reads),
        });

        assert!(reg.get_index("stable").unwrap().is_none());
        assert!(reg.get_index("stable").unwrap().is_none());
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_index_for_synthetic_repository() {
        let temp = TempDir::new().unwrap();
        let reg = registry(temp.path());
        let name = reg.canonicalize_repo_name("https://other.example.com/charts");

        std::fs::write(reg.index_path(&name), STABLE_INDEX).unwrap();
        let index = reg.get_index(&name).unwrap().unwrap();
        assert!(index.has("nginx", "1.0.0"));
    }

    #[test]
    fn test_new_with_missing_config() {
        let temp = TempDir::new().unwrap();
        let reg =
            ChartRepositories::new(&temp.path().join("repositories.yaml"), temp.path()).unwrap();
        assert!(reg.keys().is_empty());
        assert_eq!(reg.cache_root(), temp.path());
    }
}
