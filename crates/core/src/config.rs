//! Scan options and resource configuration files.
//!
//! A resource configuration is a JSON document:
//!
//! ```json
//! {
//!   "resources": [{ "pattern": "config/.*\\.json" }],
//!   "bundles": [{ "name": "messages.Labels" }]
//! }
//! ```
//!
//! Both keys are optional. Configurations come from explicit files, from
//! named resources looked up in the classpath, and from
//! [`DEFAULT_CONFIG_RESOURCE`] in any classpath element.

use crate::container::{ClasspathElement, archive, directory};
use crate::error::{RescopeError, Result};
use rescope_api::ResourcesRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Resource name probed in every classpath element
pub const DEFAULT_CONFIG_RESOURCE: &str = "META-INF/rescope/resource-config.json";

pub const DEFAULT_MAX_ITERATIONS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Effective classpath, in order
    pub classpath: Vec<PathBuf>,
    /// Raw patterns of the multi-value include option
    pub include: Vec<String>,
    /// Resource configuration files
    pub config_files: Vec<PathBuf>,
    /// Resource configuration names looked up in the classpath
    pub config_resources: Vec<String>,
    /// Runtime image providing the module graph
    pub runtime_image: Option<PathBuf>,
    /// Locate the host JDK when no runtime image is given
    pub system_modules: bool,
    /// Analysis iterations before giving up on a fixpoint
    pub max_iterations: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            classpath: Vec::new(),
            include: Vec::new(),
            config_files: Vec::new(),
            config_resources: Vec::new(),
            runtime_image: None,
            system_modules: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfiguration {
    #[serde(default)]
    pub resources: Vec<PatternEntry>,
    #[serde(default)]
    pub bundles: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
}

impl ResourceConfiguration {
    pub fn parse(content: &[u8], origin: &str) -> Result<Self> {
        serde_json::from_slice(content).map_err(|e| RescopeError::Config {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Hand every pattern and bundle to the registry.
    pub fn register(&self, registry: &dyn ResourcesRegistry) -> Result<()> {
        for entry in &self.resources {
            registry.add_resources(&entry.pattern)?;
        }
        for entry in &self.bundles {
            registry.add_resource_bundles(&entry.name)?;
        }
        Ok(())
    }
}

/// Load every configuration source into `registry`.
///
/// Returns the number of sources loaded. A source that exists but does not
/// parse is a fatal configuration error.
pub fn load_configurations(
    options: &ScanOptions,
    classpath: &[ClasspathElement],
    registry: &dyn ResourcesRegistry,
) -> Result<usize> {
    let mut loaded = 0;

    for path in &options.config_files {
        let origin = path.display().to_string();
        let content = std::fs::read(path).map_err(|e| RescopeError::Config {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        ResourceConfiguration::parse(&content, &origin)?.register(registry)?;
        debug!("Loaded resource configuration {}", origin);
        loaded += 1;
    }

    let mut names: Vec<&str> = options.config_resources.iter().map(String::as_str).collect();
    if !names.contains(&DEFAULT_CONFIG_RESOURCE) {
        names.push(DEFAULT_CONFIG_RESOURCE);
    }

    for name in names {
        for element in classpath {
            let content = match element {
                ClasspathElement::DirectoryTree(root) => directory::read_entry(root, name)?,
                // An unusable archive is reported by the scan that needs it
                ClasspathElement::ArchiveContainer(path) => archive::read_entry(path, name)
                    .unwrap_or_else(|e| {
                        debug!("No configuration probe in {}: {}", path.display(), e);
                        None
                    }),
                ClasspathElement::ModuleContainer(_) => None,
            };
            let Some(content) = content else {
                continue;
            };
            let origin = format!("{}!/{}", element.location(), name);
            ResourceConfiguration::parse(&content, &origin)?.register(registry)?;
            debug!("Loaded resource configuration {}", origin);
            loaded += 1;
        }
    }

    if loaded > 0 {
        info!("Loaded {} resource configuration sources", loaded);
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BundleCollector, ResourceRegistry};
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn test_parse_full_document() {
        let config = ResourceConfiguration::parse(
            br#"{"resources":[{"pattern":"a/.*"},{"pattern":"b\\.txt"}],"bundles":[{"name":"msg.Labels"}]}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.resources.len(), 2);
        assert_eq!(config.resources[1].pattern, r"b\.txt");
        assert_eq!(config.bundles[0].name, "msg.Labels");
    }

    #[test]
    fn test_parse_empty_and_partial() {
        assert_eq!(
            ResourceConfiguration::parse(b"{}", "inline").unwrap(),
            ResourceConfiguration::default()
        );
        let config = ResourceConfiguration::parse(br#"{"bundles":[]}"#, "inline").unwrap();
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_malformed_config_names_origin() {
        let err = ResourceConfiguration::parse(b"{\"resources\": [", "conf/bad.json").unwrap_err();
        match err {
            RescopeError::Config { origin, .. } => assert_eq!(origin, "conf/bad.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_files_and_classpath_resources() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("resource-config.json");
        fs::write(&file, r#"{"resources":[{"pattern":"from-file/.*"}]}"#).unwrap();

        let cp = temp.path().join("classes");
        fs::create_dir_all(cp.join("META-INF/rescope")).unwrap();
        fs::write(
            cp.join("META-INF/rescope/resource-config.json"),
            r#"{"resources":[{"pattern":"from-default/.*"}],"bundles":[{"name":"msg.Labels"}]}"#,
        )
        .unwrap();
        fs::write(
            cp.join("extra-config.json"),
            r#"{"resources":[{"pattern":"from-named/.*"}]}"#,
        )
        .unwrap();

        let options = ScanOptions {
            config_files: vec![file],
            config_resources: vec!["extra-config.json".to_string(), "absent.json".to_string()],
            ..Default::default()
        };
        let classpath = vec![ClasspathElement::DirectoryTree(cp)];
        let bundles = Arc::new(BundleCollector::new());
        let registry = ResourceRegistry::with_bundle_sink(bundles.clone());

        let loaded = load_configurations(&options, &classpath, &registry).unwrap();

        assert_eq!(loaded, 3);
        let mut pending = registry.patterns().drain();
        pending.sort();
        assert_eq!(pending, vec!["from-default/.*", "from-file/.*", "from-named/.*"]);
        assert_eq!(bundles.names(), vec!["msg.Labels"]);
    }

    #[test]
    fn test_missing_config_file_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let options = ScanOptions {
            config_files: vec![temp.path().join("nope.json")],
            ..Default::default()
        };
        let registry = ResourceRegistry::new();
        let err = load_configurations(&options, &[], &registry).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_unusable_archive_has_no_configuration() {
        let temp = tempfile::tempdir().unwrap();
        let not_a_jar = temp.path().join("notes.txt");
        fs::write(&not_a_jar, "plain text").unwrap();
        let classpath = vec![
            ClasspathElement::ArchiveContainer(temp.path().join("missing.jar")),
            ClasspathElement::ArchiveContainer(not_a_jar),
        ];

        let registry = ResourceRegistry::new();
        let loaded = load_configurations(&ScanOptions::default(), &classpath, &registry).unwrap();
        assert_eq!(loaded, 0);
        assert!(!registry.patterns().has_pending());
    }

    #[test]
    fn test_nothing_to_load() {
        let registry = ResourceRegistry::new();
        let loaded = load_configurations(&ScanOptions::default(), &[], &registry).unwrap();
        assert_eq!(loaded, 0);
    }
}
