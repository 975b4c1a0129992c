//! Building an index from a directory of packaged charts

use chartdex_core::urlutil::join_or_concat;
use chartdex_core::{ChartLoader, Digester, Sha256Digester, TarballLoader};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

use crate::error::{PartialIndex, RepoError};
use crate::index::IndexFile;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Index the chart archives in `dir`
///
/// Archives directly in `dir` and in its immediate subdirectories are
/// picked up; anything nested deeper is not. Files that do not load as
/// charts are skipped. The returned index is unsorted.
pub fn index_directory(dir: &Path, base_url: &str) -> Result<IndexFile, PartialIndex> {
    index_directory_with(dir, base_url, &TarballLoader, &Sha256Digester)
}

/// [`index_directory`] with explicit archive loader and digester
pub fn index_directory_with(
    dir: &Path,
    base_url: &str,
    loader: &dyn ChartLoader,
    digester: &dyn Digester,
) -> Result<IndexFile, PartialIndex> {
    let archives = match find_archives(dir) {
        Ok(archives) => archives,
        Err(e) => return Err(PartialIndex::new(IndexFile::new(), e)),
    };

    let mut index = IndexFile::new();
    for archive in archives {
        let relative = match archive.strip_prefix(dir) {
            Ok(relative) => relative,
            Err(e) => {
                return Err(PartialIndex::new(
                    index,
                    RepoError::FileAccess {
                        path: archive.display().to_string(),
                        message: e.to_string(),
                    },
                ));
            }
        };

        let file_name = relative
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let parent_url = join_or_concat(base_url, &parent);

        let metadata = match loader.load_metadata(&archive) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!("skipping {}, not a chart: {}", archive.display(), e);
                continue;
            }
        };

        let digest = match digester.digest_file(&archive) {
            Ok(digest) => digest,
            Err(e) => return Err(PartialIndex::new(index, e)),
        };

        if let Err(e) = index.must_add(metadata, &file_name, &parent_url, &digest) {
            return Err(PartialIndex::new(index, e));
        }
    }

    Ok(index)
}

/// `<dir>/*.tgz` followed by `<dir>/*/*.tgz`
fn find_archives(dir: &Path) -> Result<Vec<PathBuf>, RepoError> {
    let root = Pattern::escape(&dir.to_string_lossy());
    let mut archives = Vec::new();
    for pattern in [format!("{}/*.tgz", root), format!("{}/*/*.tgz", root)] {
        for entry in glob::glob_with(&pattern, GLOB_OPTIONS)? {
            match entry {
                Ok(path) => archives.push(path),
                Err(e) => tracing::debug!("skipping unreadable path: {}", e),
            }
        }
    }
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdex_core::{ChartMetadata, CoreError};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    fn write_chart(path: &Path, name: &str, version: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let chart_yaml = format!("apiVersion: v2\nname: {}\nversion: {}\n", name, version);
        let mut builder = Builder::new(GzEncoder::new(
            File::create(path).unwrap(),
            Compression::default(),
        ));
        let mut header = Header::new_gnu();
        header.set_size(chart_yaml.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(
                &mut header,
                format!("{}/Chart.yaml", name),
                chart_yaml.as_bytes(),
            )
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    struct FailingDigester;

    impl Digester for FailingDigester {
        fn digest_file(&self, path: &Path) -> chartdex_core::Result<String> {
            Err(CoreError::FileAccess {
                path: path.display().to_string(),
                message: "permission denied".to_string(),
            })
        }
    }

    struct FixedLoader;

    impl ChartLoader for FixedLoader {
        fn load_metadata(&self, _path: &Path) -> chartdex_core::Result<ChartMetadata> {
            Ok(ChartMetadata::new("fixed", "1.0.0"))
        }
    }

    #[test]
    fn test_index_directory() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("nginx-1.0.0.tgz"), "nginx", "1.0.0");
        write_chart(&temp.path().join("stable/redis-2.0.0.tgz"), "redis", "2.0.0");

        let index = index_directory(temp.path(), "https://charts.example.com").unwrap();

        let nginx = index.get("nginx", "1.0.0").unwrap();
        assert_eq!(nginx.urls, vec!["https://charts.example.com/nginx-1.0.0.tgz"]);
        assert_eq!(nginx.digest.len(), 64);

        let redis = index.get("redis", "2.0.0").unwrap();
        assert_eq!(
            redis.urls,
            vec!["https://charts.example.com/stable/redis-2.0.0.tgz"]
        );
    }

    #[test]
    fn test_index_directory_without_base_url() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("a-1.0.0.tgz"), "a", "1.0.0");
        write_chart(&temp.path().join("sub/b-1.0.0.tgz"), "b", "1.0.0");

        let index = index_directory(temp.path(), "").unwrap();
        assert_eq!(index.get("a", "").unwrap().urls, vec!["a-1.0.0.tgz"]);
        assert_eq!(index.get("b", "").unwrap().urls, vec!["sub/b-1.0.0.tgz"]);
    }

    #[test]
    fn test_index_directory_stops_at_one_level() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("one/shallow-1.0.0.tgz"), "shallow", "1.0.0");
        write_chart(&temp.path().join("one/two/deep-1.0.0.tgz"), "deep", "1.0.0");

        let index = index_directory(temp.path(), "https://charts.example.com").unwrap();
        assert!(index.has("shallow", "1.0.0"));
        assert!(!index.has("deep", "1.0.0"));
    }

    #[test]
    fn test_index_directory_skips_non_charts() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("good-1.0.0.tgz"), "good", "1.0.0");
        std::fs::write(temp.path().join("junk.tgz"), b"not an archive").unwrap();
        std::fs::write(temp.path().join("README.md"), b"# charts").unwrap();

        let index = index_directory(temp.path(), "").unwrap();
        assert_eq!(index.entries.len(), 1);
        assert!(index.has("good", "1.0.0"));
    }

    #[test]
    fn test_index_directory_digest_failure_aborts() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("a-1.0.0.tgz"), "a", "1.0.0");

        let partial =
            index_directory_with(temp.path(), "", &TarballLoader, &FailingDigester).unwrap_err();
        assert!(matches!(partial.error, RepoError::FileAccess { .. }));
        assert!(partial.index.is_empty());
    }

    #[test]
    fn test_index_directory_with_custom_loader() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("anything.tgz"), b"opaque").unwrap();

        let index =
            index_directory_with(temp.path(), "", &FixedLoader, &Sha256Digester).unwrap();
        assert_eq!(
            index.get("fixed", "").unwrap().digest,
            chartdex_core::digest_bytes(b"opaque")
        );
    }

    #[test]
    fn test_index_directory_is_unsorted() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("app-1.0.0.tgz"), "app", "1.0.0");
        write_chart(&temp.path().join("app-2.0.0.tgz"), "app", "2.0.0");

        let mut index = index_directory(temp.path(), "").unwrap();
        // Glob order: 1.0.0 then 2.0.0
        assert_eq!(index.entries["app"][0].version(), "1.0.0");
        index.sort_entries();
        assert_eq!(index.entries["app"][0].version(), "2.0.0");
    }
}
