#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Resources added too late: {pattern}")]
    LateRegistration { pattern: String },
    #[error("Resource bundles added too late: {name}")]
    LateBundle { name: String },
}

impl RegistrationError {
    /// The pattern or bundle name the caller tried to register.
    pub fn offending(&self) -> &str {
        match self {
            RegistrationError::LateRegistration { pattern } => pattern,
            RegistrationError::LateBundle { name } => name,
        }
    }
}

pub type RegistrationResult<T> = std::result::Result<T, RegistrationError>;

/// Error type for build feature hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
