//! Resource discovery: the pass driver, the runtime image locator and the
//! fallback gate evaluated once analysis is over.

pub mod driver;
pub mod fallback;
pub mod runtime;

pub use driver::{DiscoveryDriver, DriverState, PassStats};
pub use fallback::FallbackGate;
pub use runtime::{JdkRuntime, locate_jdk};
