//! Registration entry points shared by every build component.
//!
//! The resource registry is the only way a build component can ask for
//! resources to be embedded. It accepts inclusion patterns (regular
//! expressions over `/`-separated resource paths) and localization bundle
//! names, both of which are rejected once analysis has closed.

use crate::error::RegistrationResult;

/// Entry point through which configuration and build features contribute
/// resource inclusion requests.
///
/// Implementations must accept calls from any thread.
pub trait ResourcesRegistry: Send + Sync {
    /// Queue an inclusion pattern for the next discovery pass.
    ///
    /// Patterns use the `regex` crate dialect and must match the whole path.
    /// Lookaround and backreferences are not supported; a pattern using them
    /// fails the discovery pass that compiles it.
    ///
    /// Adding a pattern that is already pending or already applied is a
    /// no-op. Fails with [`RegistrationError::LateRegistration`] once the
    /// registry is sealed.
    ///
    /// [`RegistrationError::LateRegistration`]: crate::RegistrationError::LateRegistration
    fn add_resources(&self, pattern: &str) -> RegistrationResult<()>;

    /// Forward a localization bundle name to the bundle subsystem.
    fn add_resource_bundles(&self, name: &str) -> RegistrationResult<()>;
}

/// Receives localization bundle names verbatim.
pub trait BundleSink: Send + Sync {
    fn add_bundle(&self, name: &str);
}
