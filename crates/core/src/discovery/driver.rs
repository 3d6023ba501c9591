//! Iterative resource discovery.
//!
//! Each pass drains the pending patterns, compiles them and rescans every
//! container. The driver never loops on its own: [`DiscoveryDriver::run_pass`]
//! reports whether another pass is needed and the host decides when to call
//! it again.

use crate::container::{ClasspathElement, ContainerStats, RuntimeImage, archive, directory, module};
use crate::error::{RescopeError, Result};
use crate::pattern::InclusionPatterns;
use crate::registry::ResourceRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Patterns may still arrive; passes do work when they do
    Scanning,
    /// The last pass started with nothing pending
    Closed,
    /// A pass failed; the driver refuses further work
    Failed,
}

/// Result of one non-empty pass
#[derive(Debug, Default, Clone)]
pub struct PassStats {
    /// 1-based pass number
    pub pass: usize,
    pub patterns: usize,
    pub containers: usize,
    pub candidates: usize,
    pub registered: usize,
    pub duration: Duration,
}

pub struct DiscoveryDriver {
    registry: Arc<ResourceRegistry>,
    /// Module containers first, then the classpath in order
    containers: Vec<ClasspathElement>,
    state: DriverState,
    passes: Vec<PassStats>,
}

impl DiscoveryDriver {
    pub fn new(registry: Arc<ResourceRegistry>, classpath: Vec<ClasspathElement>) -> Self {
        Self {
            registry,
            containers: classpath,
            state: DriverState::Scanning,
            passes: Vec::new(),
        }
    }

    /// Add every module of a runtime image, ahead of the classpath.
    pub fn with_runtime_image(mut self, image: &Arc<RuntimeImage>) -> Result<Self> {
        let modules: Vec<_> = image
            .modules()?
            .into_iter()
            .map(ClasspathElement::ModuleContainer)
            .collect();
        debug!(
            "Module graph of {} has {} modules",
            image.location().display(),
            modules.len()
        );
        self.containers.splice(0..0, modules);
        Ok(self)
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn containers(&self) -> &[ClasspathElement] {
        &self.containers
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Stats of every non-empty pass so far
    pub fn passes(&self) -> &[PassStats] {
        &self.passes
    }

    /// Run one discovery pass.
    ///
    /// Returns `true` when patterns were added while the pass was running,
    /// i.e. the host must run another pass. A pass that starts with nothing
    /// pending does no work, closes the driver and returns `false`.
    pub fn run_pass(&mut self) -> Result<bool> {
        if self.state == DriverState::Failed {
            return Err(RescopeError::DriverFailed);
        }
        let result = self.pass();
        if result.is_err() {
            self.state = DriverState::Failed;
        }
        result
    }

    fn pass(&mut self) -> Result<bool> {
        let sources = self.registry.patterns().drain();
        if sources.is_empty() {
            self.state = DriverState::Closed;
            return Ok(false);
        }
        self.state = DriverState::Scanning;

        // The whole batch compiles before any container is touched, so a bad
        // pattern leaves no registration behind from this pass.
        let patterns = InclusionPatterns::compile(&sources)?;

        let start = Instant::now();
        let mut stats = PassStats {
            pass: self.passes.len() + 1,
            patterns: patterns.len(),
            ..Default::default()
        };

        if !patterns.is_empty() {
            for element in &self.containers {
                let counts = self.scan_element(element, &patterns)?;
                debug!(
                    "Scanned {} {}: {} candidates, {} registered",
                    element.kind(),
                    element.location(),
                    counts.candidates,
                    counts.registered
                );
                stats.containers += 1;
                stats.candidates += counts.candidates;
                stats.registered += counts.registered;
            }
        }

        stats.duration = start.elapsed();
        info!(
            "Resource pass {}: {} patterns, {} containers, {} registered in {:?}",
            stats.pass, stats.patterns, stats.containers, stats.registered, stats.duration
        );
        self.passes.push(stats);

        Ok(self.registry.patterns().has_pending())
    }

    fn scan_element(
        &self,
        element: &ClasspathElement,
        patterns: &InclusionPatterns,
    ) -> Result<ContainerStats> {
        let registry = self.registry.as_ref();
        match element {
            ClasspathElement::DirectoryTree(root) => directory::scan(root, patterns, registry),
            ClasspathElement::ArchiveContainer(path) => archive::scan(path, patterns, registry),
            ClasspathElement::ModuleContainer(handle) => module::scan(handle, patterns, registry),
        }
    }

    /// Close registration for good.
    ///
    /// Patterns that slipped in after the last pass are scanned first; the
    /// registry is sealed only under the same lock that proves nothing is
    /// pending. Returns the number of extra passes this took.
    pub fn seal(&mut self) -> Result<usize> {
        if self.state == DriverState::Failed {
            return Err(RescopeError::DriverFailed);
        }
        let mut extra = 0;
        while !self.registry.try_seal() {
            self.run_pass()?;
            extra += 1;
        }
        self.state = DriverState::Closed;
        let stats = self.registry.stats();
        info!(
            "Resource registry sealed: {} resources ({} bytes) from {} patterns after {} passes",
            stats.resources,
            stats.total_bytes,
            stats.applied_patterns,
            self.passes.len()
        );
        Ok(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescope_api::ResourcesRegistry;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, DiscoveryDriver) {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a/b.txt", "b");
        write(temp.path(), "a/c.json", "c");
        write(temp.path(), "d.json", "d");

        let registry = Arc::new(ResourceRegistry::new());
        let driver = DiscoveryDriver::new(
            registry,
            vec![ClasspathElement::DirectoryTree(temp.path().to_path_buf())],
        );
        (temp, driver)
    }

    #[test]
    fn test_empty_pass_closes() {
        let (_temp, mut driver) = fixture();
        assert_eq!(driver.state(), DriverState::Scanning);

        assert!(!driver.run_pass().unwrap());
        assert_eq!(driver.state(), DriverState::Closed);
        assert!(driver.passes().is_empty());
    }

    #[test]
    fn test_pass_registers_matches() {
        let (_temp, mut driver) = fixture();
        driver.registry().add_resources(r".*\.json").unwrap();

        assert!(!driver.run_pass().unwrap());
        assert_eq!(driver.state(), DriverState::Scanning);
        assert_eq!(driver.registry().paths(), vec!["a/c.json", "d.json"]);

        // Fixpoint
        assert!(!driver.run_pass().unwrap());
        assert_eq!(driver.state(), DriverState::Closed);
        assert_eq!(driver.passes().len(), 1);
    }

    #[test]
    fn test_overlapping_patterns_register_once() {
        let (_temp, mut driver) = fixture();
        driver.registry().add_resources(r".*\.json").unwrap();
        driver.registry().add_resources(r"a/.*").unwrap();

        driver.run_pass().unwrap();
        let stats = &driver.passes()[0];
        assert_eq!(stats.registered, 3);
        assert_eq!(driver.registry().len(), 3);
    }

    #[test]
    fn test_malformed_pattern_fails_pass_atomically() {
        let (_temp, mut driver) = fixture();
        driver.registry().add_resources(r".*\.json").unwrap();
        driver.registry().add_resources("a/(").unwrap();

        let err = driver.run_pass().unwrap_err();
        assert!(matches!(err, RescopeError::PatternSyntax { ref pattern, .. } if pattern == "a/("));
        assert!(driver.registry().is_empty());
        assert_eq!(driver.state(), DriverState::Failed);

        // Valid patterns of the failed batch are consumed, not retried
        assert!(!driver.registry().patterns().has_pending());
        assert!(matches!(driver.run_pass(), Err(RescopeError::DriverFailed)));
        assert!(matches!(driver.seal(), Err(RescopeError::DriverFailed)));
    }

    #[cfg(unix)]
    #[test]
    fn test_pattern_added_during_pass_requests_another() {
        let (temp, mut driver) = fixture();
        let pipe = temp.path().join("a/pipe");
        let status = std::process::Command::new("mkfifo")
            .arg(&pipe)
            .status()
            .unwrap();
        assert!(status.success());

        // Reading the pipe blocks the pass until the writer closes it
        let registry = driver.registry().clone();
        let writer = std::thread::spawn(move || {
            use std::io::Write;
            let mut fifo = fs::OpenOptions::new().write(true).open(&pipe).unwrap();
            registry.add_resources(r"d\.json").unwrap();
            fifo.write_all(b"piped").unwrap();
        });

        driver.registry().add_resources("a/pipe").unwrap();
        assert!(driver.run_pass().unwrap());
        writer.join().unwrap();

        assert_eq!(driver.registry().content("a/pipe").unwrap(), b"piped".to_vec());
        assert!(!driver.registry().contains("d.json"));

        assert!(!driver.run_pass().unwrap());
        assert!(driver.registry().contains("d.json"));
        assert_eq!(driver.passes().len(), 2);
    }

    #[test]
    fn test_seal_scans_stragglers() {
        let (_temp, mut driver) = fixture();
        driver.registry().add_resources(r"a/.*").unwrap();
        driver.run_pass().unwrap();

        // Arrives after the last pass, before sealing
        driver.registry().add_resources(r"d\.json").unwrap();
        let extra = driver.seal().unwrap();

        assert_eq!(extra, 1);
        assert!(driver.registry().is_sealed());
        assert!(driver.registry().contains("d.json"));
        assert_eq!(driver.state(), DriverState::Closed);

        let err = driver.registry().add_resources(".*").unwrap_err();
        assert_eq!(err.offending(), ".*");
    }

    #[test]
    fn test_unreadable_archive_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let registry = Arc::new(ResourceRegistry::new());
        let mut driver = DiscoveryDriver::new(
            registry,
            vec![ClasspathElement::ArchiveContainer(temp.path().join("missing.jar"))],
        );
        driver.registry().add_resources(".*").unwrap();

        let err = driver.run_pass().unwrap_err();
        assert!(err.to_string().contains("missing.jar"));
    }

    #[test]
    fn test_modules_are_scanned_before_classpath() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "image/app.core/module-info.class", "m");
        write(temp.path(), "image/app.core/shared.txt", "from module");
        write(temp.path(), "cp/shared.txt", "from classpath");

        let image = RuntimeImage::open(&temp.path().join("image")).unwrap();
        let registry = Arc::new(ResourceRegistry::new());
        let mut driver = DiscoveryDriver::new(
            registry,
            vec![ClasspathElement::DirectoryTree(temp.path().join("cp"))],
        )
        .with_runtime_image(&image)
        .unwrap();

        assert_eq!(driver.containers()[0].kind(), "module");
        driver.registry().add_resources(r"shared\.txt").unwrap();
        driver.run_pass().unwrap();

        // Same path from two containers: one entry, last write wins
        assert_eq!(driver.registry().len(), 1);
        assert_eq!(
            driver.registry().content("shared.txt").unwrap(),
            b"from classpath".to_vec()
        );
    }
}
