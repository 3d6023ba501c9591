//! Build session: owns the registry and walks the build phases.
//!
//! ```text
//! before_analysis ─▶ analysis loop ─▶ after_analysis ─▶ before_compilation
//! (config, option)   (passes+features)  (seal)            (fallback gate)
//! ```

use crate::config::{ScanOptions, load_configurations};
use crate::container::{ClasspathElement, RuntimeImage};
use crate::discovery::{DiscoveryDriver, FallbackGate, PassStats, locate_jdk};
use crate::error::{RescopeError, Result};
use crate::registry::{ImageResources, ResourceRegistry};
use rescope_api::{
    AnalysisAccess, BuildFeature, BundleSink, FallbackRequest, FallbackRequestSink,
    ResourcesRegistry,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the session hands to the image writer
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub resources: ImageResources,
    /// Raised by the fallback gate; the caller decides what it means
    pub fallback: Option<FallbackRequest>,
    pub iterations: usize,
    pub passes: Vec<PassStats>,
    pub loaded_configurations: usize,
}

pub struct BuildSession {
    options: ScanOptions,
    registry: Arc<ResourceRegistry>,
    features: Vec<Arc<dyn BuildFeature>>,
    fallback_sink: Option<Arc<dyn FallbackRequestSink>>,
}

struct SessionAccess<'a> {
    registry: &'a ResourceRegistry,
    iteration: usize,
}

impl AnalysisAccess for SessionAccess<'_> {
    fn registry(&self) -> &dyn ResourcesRegistry {
        self.registry
    }

    fn is_registered(&self, path: &str) -> bool {
        self.registry.contains(path)
    }

    fn registered_paths(&self) -> Vec<String> {
        self.registry.paths()
    }

    fn iteration(&self) -> usize {
        self.iteration
    }
}

impl BuildSession {
    pub fn builder(options: ScanOptions) -> BuildSessionBuilder {
        BuildSessionBuilder::new(options)
    }

    /// The shared registry, for components that contribute patterns from
    /// their own threads.
    pub fn registry(&self) -> Arc<ResourceRegistry> {
        self.registry.clone()
    }

    /// Run every phase and hand over the sealed resources.
    pub fn run(self) -> Result<BuildOutput> {
        let (mut driver, loaded_configurations) = self.before_analysis()?;
        let iterations = self.run_analysis(&mut driver)?;
        self.after_analysis(&mut driver)?;
        let fallback = self.before_compilation(loaded_configurations)?;

        Ok(BuildOutput {
            resources: self.registry.image_resources()?,
            fallback,
            iterations,
            passes: driver.passes().to_vec(),
            loaded_configurations,
        })
    }

    fn classpath(&self) -> Vec<ClasspathElement> {
        self.options
            .classpath
            .iter()
            .map(|path| ClasspathElement::from_path(path.clone()))
            .collect()
    }

    fn runtime_image(&self) -> Result<Option<Arc<RuntimeImage>>> {
        if let Some(location) = &self.options.runtime_image {
            return RuntimeImage::open(location).map(Some);
        }
        if !self.options.system_modules {
            return Ok(None);
        }
        match locate_jdk() {
            Some(jdk) => {
                info!(
                    "Using module graph of JDK {} at {}",
                    jdk.version.as_deref().unwrap_or("(unknown version)"),
                    jdk.home.display()
                );
                RuntimeImage::open(&jdk.modules).map(Some)
            }
            None => {
                warn!("No JDK runtime image found, scanning the classpath only");
                Ok(None)
            }
        }
    }

    fn before_analysis(&self) -> Result<(DiscoveryDriver, usize)> {
        let classpath = self.classpath();
        let loaded = load_configurations(&self.options, &classpath, self.registry.as_ref())?;

        for pattern in &self.options.include {
            self.registry.add_resources(pattern)?;
        }

        for feature in &self.features {
            feature
                .before_analysis(self.registry.as_ref())
                .map_err(|e| feature_error(feature.as_ref(), e))?;
        }

        let mut driver = DiscoveryDriver::new(self.registry.clone(), classpath);
        if let Some(image) = self.runtime_image()? {
            driver = driver.with_runtime_image(&image)?;
        }
        debug!(
            "Analysis starts with {} containers and {} pending patterns",
            driver.containers().len(),
            self.registry.patterns().pending_len()
        );
        Ok((driver, loaded))
    }

    fn run_analysis(&self, driver: &mut DiscoveryDriver) -> Result<usize> {
        let mut iteration = 0;
        loop {
            iteration += 1;
            if iteration > self.options.max_iterations {
                return Err(RescopeError::NotConverged {
                    iterations: self.options.max_iterations,
                });
            }

            let mut again = driver.run_pass()?;

            let access = SessionAccess {
                registry: self.registry.as_ref(),
                iteration,
            };
            for feature in &self.features {
                let wants_more = feature
                    .during_analysis(&access)
                    .map_err(|e| feature_error(feature.as_ref(), e))?;
                if wants_more {
                    debug!("Feature {} requires another iteration", feature.name());
                }
                again |= wants_more;
            }

            again |= self.registry.patterns().has_pending();
            if !again {
                return Ok(iteration);
            }
        }
    }

    fn after_analysis(&self, driver: &mut DiscoveryDriver) -> Result<()> {
        let extra = driver.seal()?;
        if extra > 0 {
            debug!("Sealing ran {} extra passes for late patterns", extra);
        }
        Ok(())
    }

    fn before_compilation(&self, loaded_configurations: usize) -> Result<Option<FallbackRequest>> {
        FallbackGate::new(self.options.include.len(), loaded_configurations)
            .check(self.registry.as_ref(), self.fallback_sink.as_deref())
    }
}

fn feature_error(feature: &dyn BuildFeature, error: rescope_api::BoxError) -> RescopeError {
    RescopeError::Feature {
        feature: feature.name().to_string(),
        reason: error.to_string(),
    }
}

/// Builder for BuildSession
pub struct BuildSessionBuilder {
    options: ScanOptions,
    features: Vec<Arc<dyn BuildFeature>>,
    bundle_sink: Option<Arc<dyn BundleSink>>,
    fallback_sink: Option<Arc<dyn FallbackRequestSink>>,
}

impl BuildSessionBuilder {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            features: Vec::new(),
            bundle_sink: None,
            fallback_sink: None,
        }
    }

    pub fn add_feature(mut self, feature: Arc<dyn BuildFeature>) -> Self {
        self.features.push(feature);
        self
    }

    pub fn with_bundle_sink(mut self, sink: Arc<dyn BundleSink>) -> Self {
        self.bundle_sink = Some(sink);
        self
    }

    pub fn with_fallback_sink(mut self, sink: Arc<dyn FallbackRequestSink>) -> Self {
        self.fallback_sink = Some(sink);
        self
    }

    pub fn build(self) -> BuildSession {
        let registry = match self.bundle_sink {
            Some(sink) => ResourceRegistry::with_bundle_sink(sink),
            None => ResourceRegistry::new(),
        };
        BuildSession {
            options: self.options,
            registry: Arc::new(registry),
            features: self.features,
            fallback_sink: self.fallback_sink,
        }
    }
}
