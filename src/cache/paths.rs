// Cache path utilities.
// Resolves where a repository's cache file lives on disk.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Get the base cache directory (~/.cache/ghstats on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ghstats").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the cache file for `owner/name` under `base`.
///
/// Each half of the identity becomes one path component, so `owner/name`
/// lands at `<base>/owner/name.json`.
pub fn store_path(base: &Path, repository: &str) -> PathBuf {
    let (owner, name) = repository.split_once('/').unwrap_or(("", repository));
    let mut path = base.to_path_buf();
    if !owner.is_empty() {
        path.push(sanitize_name(owner));
    }
    path.push(format!("{}.json", sanitize_name(name)));
    path
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
