use serde::{Deserialize, Serialize};

/// Soft signal that the build configured no resources at all.
///
/// Raising a request is not a failure by itself; the component that owns
/// the sink decides whether to abort or to continue with a degraded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRequest {
    pub reason: String,
}

impl FallbackRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FallbackRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Capability registered by a build component that wants to be told when
/// the image would ship without any resource support.
pub trait FallbackRequestSink: Send + Sync {
    /// The request to raise for missing resource configuration, if this
    /// sink has one.
    fn resource_fallback(&self) -> Option<FallbackRequest>;
}
