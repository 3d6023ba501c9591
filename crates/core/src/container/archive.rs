use super::ContainerStats;
use crate::error::{RescopeError, Result};
use crate::pattern::InclusionPatterns;
use crate::registry::ResourceRegistry;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

fn unusable(path: &Path, reason: impl std::fmt::Display) -> RescopeError {
    RescopeError::ClasspathElement {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| unusable(path, e))?;
    ZipArchive::new(file).map_err(|e| unusable(path, e))
}

/// Scan a zip/jar archive. Directory markers (names ending in `/`) are
/// skipped; every other entry name is its resource path.
pub fn scan(
    path: &Path,
    patterns: &InclusionPatterns,
    registry: &ResourceRegistry,
) -> Result<ContainerStats> {
    let mut archive = open(path)?;
    let mut stats = ContainerStats::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| unusable(path, e))?;
        if entry.name().ends_with('/') {
            continue;
        }

        stats.candidates += 1;
        let name = entry.name().to_string();
        if !patterns.matches(&name) {
            continue;
        }

        registry
            .register(&name, &mut entry)
            .map_err(|e| unusable(path, format!("cannot read entry {name}: {e}")))?;
        stats.registered += 1;
    }

    Ok(stats)
}

/// Read one entry of an archive by name.
pub fn read_entry(path: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open(path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(unusable(path, e)),
    };
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| unusable(path, format!("cannot read entry {name}: {e}")))?;
    Ok(Some(content))
}
