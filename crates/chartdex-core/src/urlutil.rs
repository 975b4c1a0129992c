//! URL helpers shared by the index engine and the repository registry

use url::Url;

use crate::error::{CoreError, Result};

/// Join path segments onto the path of a base URL
///
/// The base path is treated as a directory, so `https://x/charts` joined
/// with `a.tgz` gives `https://x/charts/a.tgz`. Fails when the base is not
/// an absolute URL; callers fall back to [`naive_join`].
pub fn url_join(base: &str, paths: &[&str]) -> Result<String> {
    let mut url = Url::parse(base).map_err(|source| CoreError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;

    let mut path = url.path().trim_end_matches('/').to_string();
    for segment in paths {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    url.set_path(&path);
    Ok(url.to_string())
}

/// Plain `/` concatenation used when the base is not a URL
pub fn naive_join(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    match (base.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, segment),
    }
}

/// Join with [`url_join`], falling back to [`naive_join`] on failure
pub fn join_or_concat(base: &str, segment: &str) -> String {
    url_join(base, &[segment]).unwrap_or_else(|_| naive_join(base, segment))
}

/// Compare two repository URLs ignoring cosmetic differences
///
/// Scheme and host case, default ports and trailing slashes do not matter.
/// Strings that are not URLs (plain paths) only match when identical after
/// trailing slashes are removed.
pub fn urls_equal(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => normalize(a) == normalize(b),
        (Err(_), Err(_)) => trim_path(a) == trim_path(b),
        _ => false,
    }
}

fn normalize(mut url: Url) -> String {
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(if path.is_empty() { "/" } else { &path });
    url.to_string()
}

fn trim_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { path } else { trimmed }
}

/// Whether a reference points at an OCI registry
pub fn is_oci(reference: &str) -> bool {
    reference.starts_with("oci://")
}

/// Whether a reference is an absolute URL (has a scheme)
pub fn is_absolute_url(reference: &str) -> bool {
    Url::parse(reference).is_ok()
}
