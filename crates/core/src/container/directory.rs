use super::ContainerStats;
use crate::error::{RescopeError, Result};
use crate::pattern::InclusionPatterns;
use crate::registry::ResourceRegistry;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily walk every non-directory entry under `root`, depth first and in
/// file name order, yielding its `/`-joined path relative to `root`.
/// The relative path is `None` when a segment is not valid UTF-8.
///
/// Symbolic links are followed, so link loops surface as errors.
pub(crate) fn leaves(
    root: &Path,
) -> impl Iterator<Item = walkdir::Result<(Option<String>, PathBuf)>> + '_ {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => {
                let relative = relative_path(root, entry.path());
                Some(Ok((relative, entry.into_path())))
            }
            Err(e) => Some(Err(e)),
        })
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let segments = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// Scan a directory tree, registering every leaf whose relative path
/// matches. Any listing failure aborts the scan.
pub fn scan(
    root: &Path,
    patterns: &InclusionPatterns,
    registry: &ResourceRegistry,
) -> Result<ContainerStats> {
    let mut stats = ContainerStats::default();

    for leaf in leaves(root) {
        let (relative, path) = leaf.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            RescopeError::DirectoryUnreadable { path, source: e }
        })?;
        let relative = relative.ok_or_else(|| RescopeError::ClasspathElement {
            path: root.to_path_buf(),
            reason: format!("resource name is not valid UTF-8: {}", path.display()),
        })?;

        stats.candidates += 1;
        if !patterns.matches(&relative) {
            continue;
        }

        let unreadable = |e: std::io::Error| RescopeError::ClasspathElement {
            path: root.to_path_buf(),
            reason: format!("cannot read {}: {}", path.display(), e),
        };
        let mut file = File::open(&path).map_err(unreadable)?;
        registry.register(&relative, &mut file).map_err(unreadable)?;
        stats.registered += 1;
    }

    Ok(stats)
}

/// Read one file of a directory tree by its `/`-separated relative path.
pub fn read_entry(root: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let path = name
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment));
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read(path)?))
}
