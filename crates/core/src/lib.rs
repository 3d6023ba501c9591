pub mod error;
pub mod logging;

pub mod config;
pub mod container;
pub mod discovery;
pub mod pattern;
pub mod registry;
pub mod session;

pub use error::{RescopeError, Result};
pub use registry::{BundleCollector, ImageResources, ResourceRegistry};
pub use session::{BuildOutput, BuildSession, BuildSessionBuilder};
