use crate::config::DeadweightConfig;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Component, Path};
use url::Url;

/// Lists the candidate source files under `root`, relative to it and sorted.
///
/// Hidden directories, the configured excluded directories and anything whose
/// name contains the mock marker are pruned. Test files are skipped.
///
/// # Examples
/// ```no_run
/// use deadweight::config::DeadweightConfig;
/// use deadweight::utils::discover_source_files;
/// use std::path::Path;
///
/// let files = discover_source_files(Path::new("."), &DeadweightConfig::default()).unwrap();
/// ```
pub fn discover_source_files(root: &Path, config: &DeadweightConfig) -> Result<Vec<String>> {
    let excluded_dirs = config.excluded_dirs.clone();
    let mock_marker = config.mock_marker.clone();
    let extension = config.source_extension.trim_start_matches('.').to_string();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if !mock_marker.is_empty() && name.contains(mock_marker.as_str()) {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && (name.starts_with('.') || excluded_dirs.iter().any(|d| *d == name)))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension.as_str()) {
            continue;
        }
        let relative = match path.strip_prefix(root) {
            Ok(relative) => to_slash(relative),
            Err(_) => continue,
        };
        if !config.test_suffix.is_empty() && relative.ends_with(config.test_suffix.as_str()) {
            continue;
        }
        files.push(relative);
    }

    files.sort();
    Ok(files)
}

/// Reduces a document URI to the root-relative file it names, or the full URI
/// when it lies outside the root.
pub fn relative_file_id(root: &Path, uri: &Url) -> String {
    uri.to_file_path()
        .ok()
        .and_then(|path| path.strip_prefix(root).ok().map(to_slash))
        .unwrap_or_else(|| uri.to_string())
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
