use crate::error::{RescopeError, Result};
use crate::registry::ResourceRegistry;
use rescope_api::{FallbackRequest, FallbackRequestSink};
use tracing::{debug, warn};

/// Final check for builds that configured no resources at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackGate {
    /// Patterns supplied through the multi-value include option
    option_patterns: usize,
    /// Configuration sources successfully loaded
    loaded_configurations: usize,
}

impl FallbackGate {
    pub fn new(option_patterns: usize, loaded_configurations: usize) -> Self {
        Self {
            option_patterns,
            loaded_configurations,
        }
    }

    /// Evaluate the gate. Must run after the registry is sealed.
    ///
    /// Returns the sink's request when no include option was given, no
    /// configuration was loaded and a sink is registered; `None` otherwise.
    pub fn check(
        &self,
        registry: &ResourceRegistry,
        sink: Option<&dyn FallbackRequestSink>,
    ) -> Result<Option<FallbackRequest>> {
        if !registry.is_sealed() {
            return Err(RescopeError::NotSealed);
        }
        let Some(sink) = sink else {
            return Ok(None);
        };
        if self.option_patterns > 0 || self.loaded_configurations > 0 {
            debug!(
                "Resources configured: {} option patterns, {} configuration files",
                self.option_patterns, self.loaded_configurations
            );
            return Ok(None);
        }
        let request = sink.resource_fallback();
        if let Some(request) = &request {
            warn!("No resources configured, raising fallback: {}", request);
        }
        Ok(request)
    }
}
