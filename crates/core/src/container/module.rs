//! Module containers backed by a Java runtime image.
//!
//! Two layouts are supported:
//! - a jimage file (`lib/modules`), read through `ristretto_jimage`
//! - an exploded image: one directory per module (recognized by its
//!   `module-info.class`), resources below it
//!
//! Module metadata promises that every listed resource exists, so read
//! failures here are internal errors, not user errors.

use super::{ContainerStats, directory};
use crate::error::{RescopeError, Result};
use crate::pattern::InclusionPatterns;
use crate::registry::ResourceRegistry;
use ristretto_jimage::Image;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Top-level jimage directories that are not modules
const RESERVED_IMAGE_DIRS: [&str; 2] = ["modules", "packages"];

pub enum RuntimeImage {
    Jimage {
        path: PathBuf,
        image: Image,
        /// Module name → module-relative resource names
        listing: BTreeMap<String, Vec<String>>,
    },
    Exploded {
        root: PathBuf,
    },
}

impl std::fmt::Debug for RuntimeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeImage::Jimage { path, .. } => f.debug_tuple("Jimage").field(path).finish(),
            RuntimeImage::Exploded { root } => f.debug_tuple("Exploded").field(root).finish(),
        }
    }
}

/// Group every resource of the image by its owning module.
///
/// Walking the image decodes each entry, so this runs once per image and
/// scans work from the listing.
fn list_jimage(image: &Image) -> ristretto_jimage::Result<BTreeMap<String, Vec<String>>> {
    let mut listing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for resource in image.iter() {
        let resource = resource?;
        let module = resource.module();
        if module.is_empty() || RESERVED_IMAGE_DIRS.contains(&module) {
            continue;
        }
        listing
            .entry(module.to_string())
            .or_default()
            .push(resource.name());
    }
    Ok(listing)
}

impl RuntimeImage {
    /// Open a runtime image from a jimage file, a JDK home containing
    /// `lib/modules`, or an exploded image directory.
    pub fn open(location: &Path) -> Result<Arc<Self>> {
        let jimage = if location.is_dir() {
            let modules = location.join("lib/modules");
            if !modules.is_file() {
                debug!("Using exploded runtime image at {}", location.display());
                return Ok(Arc::new(RuntimeImage::Exploded {
                    root: location.to_path_buf(),
                }));
            }
            modules
        } else {
            location.to_path_buf()
        };

        let image = Image::from_file(&jimage).map_err(|e| RescopeError::ClasspathElement {
            path: location.to_path_buf(),
            reason: format!("not a runtime image: {e:?}"),
        })?;
        let listing = list_jimage(&image).map_err(|e| RescopeError::ModuleRead {
            module: jimage.display().to_string(),
            reason: format!("{e:?}"),
        })?;
        debug!(
            "Using jimage runtime image at {} ({} modules)",
            jimage.display(),
            listing.len()
        );
        Ok(Arc::new(RuntimeImage::Jimage {
            path: jimage,
            image,
            listing,
        }))
    }

    pub fn location(&self) -> &Path {
        match self {
            RuntimeImage::Jimage { path, .. } => path,
            RuntimeImage::Exploded { root } => root,
        }
    }

    /// Names of the modules in the image, sorted
    pub fn module_names(&self) -> Result<Vec<String>> {
        match self {
            RuntimeImage::Jimage { listing, .. } => Ok(listing.keys().cloned().collect()),
            RuntimeImage::Exploded { root } => {
                let unreadable = |reason: String| RescopeError::ModuleRead {
                    module: root.display().to_string(),
                    reason,
                };
                let mut names = BTreeSet::new();
                let entries = std::fs::read_dir(root).map_err(|e| unreadable(e.to_string()))?;
                for entry in entries {
                    let entry = entry.map_err(|e| unreadable(e.to_string()))?;
                    if entry.path().join("module-info.class").is_file() {
                        names.insert(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                Ok(names.into_iter().collect())
            }
        }
    }

    /// One handle per module of the image
    pub fn modules(self: &Arc<Self>) -> Result<Vec<ModuleHandle>> {
        Ok(self
            .module_names()?
            .into_iter()
            .map(|name| ModuleHandle {
                name,
                image: self.clone(),
            })
            .collect())
    }
}

/// A single module of a runtime image.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    name: String,
    image: Arc<RuntimeImage>,
}

impl ModuleHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &RuntimeImage {
        &self.image
    }
}

/// Scan one module: list its resources, register the matching ones.
pub fn scan(
    module: &ModuleHandle,
    patterns: &InclusionPatterns,
    registry: &ResourceRegistry,
) -> Result<ContainerStats> {
    let unreadable = |reason: String| RescopeError::ModuleRead {
        module: module.name.clone(),
        reason,
    };
    let mut stats = ContainerStats::default();

    match module.image.as_ref() {
        RuntimeImage::Jimage { image, listing, .. } => {
            for path in listing.get(&module.name).into_iter().flatten() {
                stats.candidates += 1;
                if !patterns.matches(path) {
                    continue;
                }

                let resource = image
                    .get_resource(&format!("/{}/{}", module.name, path))
                    .map_err(|e| unreadable(format!("{path}: {e:?}")))?;
                registry.register_bytes(path, resource.data().to_vec());
                stats.registered += 1;
            }
        }
        RuntimeImage::Exploded { root } => {
            let module_root = root.join(&module.name);
            for leaf in directory::leaves(&module_root) {
                let (relative, path) = leaf.map_err(|e| unreadable(e.to_string()))?;
                let relative = relative.ok_or_else(|| {
                    unreadable(format!("resource name is not valid UTF-8: {}", path.display()))
                })?;

                stats.candidates += 1;
                if !patterns.matches(&relative) {
                    continue;
                }

                let mut file = File::open(&path)
                    .map_err(|e| unreadable(format!("{}: {}", path.display(), e)))?;
                registry
                    .register(&relative, &mut file)
                    .map_err(|e| unreadable(format!("{}: {}", path.display(), e)))?;
                stats.registered += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exploded_image() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        for (module, relative, content) in [
            ("java.base", "java/lang/Object.class", "cafebabe"),
            ("java.base", "module-info.class", "cafebabe"),
            ("java.base", "jdk/internal/icu/nfc.nrm", "nrm"),
            ("app.core", "config/defaults.json", "{}"),
            ("app.core", "module-info.class", "cafebabe"),
        ] {
            let path = temp.path().join(module).join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    #[test]
    fn test_exploded_image_modules() {
        let temp = exploded_image();
        let image = RuntimeImage::open(temp.path()).unwrap();
        assert!(matches!(image.as_ref(), RuntimeImage::Exploded { .. }));

        fs::create_dir_all(temp.path().join("not-a-module/conf")).unwrap();

        let names: Vec<_> = image
            .modules()
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["app.core", "java.base"]);
    }

    #[test]
    fn test_scan_exploded_module() {
        let temp = exploded_image();
        let image = RuntimeImage::open(temp.path()).unwrap();
        let modules = image.modules().unwrap();
        let app = modules.iter().find(|m| m.name() == "app.core").unwrap();

        let registry = ResourceRegistry::new();
        let patterns = InclusionPatterns::compile(&[r".*\.json", r".*\.nrm"]).unwrap();
        let stats = scan(app, &patterns, &registry).unwrap();

        // Only resources of the scanned module, paths relative to the module
        assert_eq!(stats.candidates, 2);
        assert_eq!(registry.paths(), vec!["config/defaults.json"]);
    }

    #[test]
    fn test_scan_host_jimage() {
        // Needs a real JDK; skipped on machines without one
        let Some(jdk) = crate::discovery::locate_jdk() else {
            return;
        };
        let image = RuntimeImage::open(&jdk.home).unwrap();
        assert!(matches!(image.as_ref(), RuntimeImage::Jimage { .. }));

        let modules = image.modules().unwrap();
        let names: Vec<&str> = modules.iter().map(ModuleHandle::name).collect();
        assert!(names.contains(&"java.base"));
        // Package roots are not modules
        assert!(!names.contains(&"java"));
        assert!(!names.contains(&"META-INF"));

        let base = modules.iter().find(|m| m.name() == "java.base").unwrap();
        let registry = ResourceRegistry::new();
        let patterns = InclusionPatterns::compile(&[r"java/lang/Object\.class"]).unwrap();
        let stats = scan(base, &patterns, &registry).unwrap();

        assert_eq!(stats.registered, 1);
        assert_eq!(registry.paths(), vec!["java/lang/Object.class"]);
        let class = registry.content("java/lang/Object.class").unwrap();
        assert_eq!(&class[..4], &[0xca, 0xfe, 0xba, 0xbe]);
    }

    #[test]
    fn test_bogus_jimage_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let bogus = temp.path().join("modules");
        fs::write(&bogus, b"not an image").unwrap();

        let err = RuntimeImage::open(&bogus).unwrap_err();
        assert!(matches!(err, RescopeError::ClasspathElement { .. }));
    }
}
