//! Build-wide resource registry.
//!
//! Holds the resources matched so far (path → content) together with the
//! pattern set that feeds discovery. Registration of patterns and bundles
//! closes when the registry is sealed; matched resources stay valid and are
//! handed downstream as [`ImageResources`].

use crate::error::{RescopeError, Result};
use crate::pattern::PatternSet;
use dashmap::DashMap;
use rescope_api::{BundleSink, RegistrationError, RegistrationResult, ResourcesRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

pub struct ResourceRegistry {
    patterns: PatternSet,
    /// Resource path ('/'-separated) → content
    resources: DashMap<String, Vec<u8>>,
    bundles: Option<Arc<dyn BundleSink>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            patterns: PatternSet::new(),
            resources: DashMap::new(),
            bundles: None,
        }
    }

    /// Create with a sink receiving localization bundle names
    pub fn with_bundle_sink(sink: Arc<dyn BundleSink>) -> Self {
        Self {
            bundles: Some(sink),
            ..Self::new()
        }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Read a resource to the end and record it under `name`.
    ///
    /// Returns `true` when an earlier resource with the same name was
    /// replaced.
    pub fn register(&self, name: &str, reader: &mut dyn Read) -> std::io::Result<bool> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(self.register_bytes(name, content))
    }

    pub fn register_bytes(&self, name: &str, content: Vec<u8>) -> bool {
        debug!("Registered resource {} ({} bytes)", name, content.len());
        self.resources.insert(name.to_string(), content).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.resources.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.resources.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn is_sealed(&self) -> bool {
        self.patterns.is_sealed()
    }

    /// Seal the registry unless patterns are still pending.
    pub(crate) fn try_seal(&self) -> bool {
        self.patterns.try_seal()
    }

    /// Read-only snapshot for the image writer. Only available once sealed.
    pub fn image_resources(&self) -> Result<ImageResources> {
        if !self.is_sealed() {
            return Err(RescopeError::NotSealed);
        }
        let entries = self
            .resources
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        Ok(ImageResources { entries })
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            resources: self.resources.len(),
            total_bytes: self.resources.iter().map(|e| e.value().len()).sum(),
            pending_patterns: self.patterns.pending_len(),
            applied_patterns: self.patterns.applied_len(),
            sealed: self.is_sealed(),
        }
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcesRegistry for ResourceRegistry {
    fn add_resources(&self, pattern: &str) -> RegistrationResult<()> {
        self.patterns.add(pattern).map(|_| ())
    }

    fn add_resource_bundles(&self, name: &str) -> RegistrationResult<()> {
        if self.is_sealed() {
            return Err(RegistrationError::LateBundle {
                name: name.to_string(),
            });
        }
        match &self.bundles {
            Some(sink) => sink.add_bundle(name),
            None => warn!("No bundle sink registered, dropping bundle {}", name),
        }
        Ok(())
    }
}

/// Registry statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub resources: usize,
    pub total_bytes: usize,
    pub pending_patterns: usize,
    pub applied_patterns: usize,
    pub sealed: bool,
}

/// The sealed resource set handed to the image writer.
#[derive(Debug, Clone, Default)]
pub struct ImageResources {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ImageResources {
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Per-resource size and xxh3 digest, sorted by path
    pub fn summaries(&self) -> Vec<ResourceSummary> {
        self.iter()
            .map(|(path, content)| ResourceSummary {
                path: path.to_string(),
                size: content.len(),
                digest: format!("{:016x}", xxh3_64(content)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub path: String,
    pub size: usize,
    pub digest: String,
}

/// Bundle sink that keeps the names it receives, in arrival order.
#[derive(Debug, Default)]
pub struct BundleCollector {
    names: std::sync::Mutex<Vec<String>>,
}

impl BundleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl BundleSink for BundleCollector {
    fn add_bundle(&self, name: &str) {
        debug!("Resource bundle registered: {}", name);
        let mut names = self
            .names
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
}
