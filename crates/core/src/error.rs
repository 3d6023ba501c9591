use rescope_api::{FallbackRequest, RegistrationError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RescopeError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("Invalid resource pattern '{pattern}': {source}")]
    PatternSyntax {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Cannot scan directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error(
        "Unable to handle classpath element '{}': {reason}. Make sure that all classpath entries are either directories or valid jar files.",
        path.display()
    )]
    ClasspathElement { path: PathBuf, reason: String },
    #[error("Can not read the resources of module {module}: {reason}")]
    ModuleRead { module: String, reason: String },
    #[error("Invalid resource configuration {origin}: {reason}")]
    Config { origin: String, reason: String },
    #[error("Resource fallback requested: {0}")]
    FallbackRequested(FallbackRequest),
    #[error("Resource registry is not sealed yet")]
    NotSealed,
    #[error("Discovery driver already failed")]
    DriverFailed,
    #[error("Analysis did not reach a fixpoint after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("Build feature '{feature}' failed: {reason}")]
    Feature { feature: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RescopeError {
    /// Internal errors are defects rather than user configuration mistakes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RescopeError::ModuleRead { .. } | RescopeError::DriverFailed
        )
    }
}

pub type Result<T> = std::result::Result<T, RescopeError>;
