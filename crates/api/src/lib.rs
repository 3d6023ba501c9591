pub mod error;
pub mod fallback;
pub mod lifecycle;
pub mod registry;

// Re-export commonly used types
pub use error::{BoxError, RegistrationError, RegistrationResult};
pub use fallback::{FallbackRequest, FallbackRequestSink};
pub use lifecycle::{AnalysisAccess, BuildFeature};
pub use registry::{BundleSink, ResourcesRegistry};
