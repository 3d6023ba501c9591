use crate::error::BoxError;
use crate::registry::ResourcesRegistry;

/// View of the build handed to features while analysis is running.
pub trait AnalysisAccess {
    /// Registry for contributing further patterns or bundles.
    fn registry(&self) -> &dyn ResourcesRegistry;

    /// Whether a resource with this exact path has been registered so far.
    fn is_registered(&self, path: &str) -> bool;

    /// Paths registered so far, sorted.
    fn registered_paths(&self) -> Vec<String>;

    /// 1-based number of the current analysis iteration.
    fn iteration(&self) -> usize;
}

/// A build component that takes part in the analysis loop.
///
/// Features run on the analysis thread after every discovery pass. A
/// feature that contributes new patterns does not need to request another
/// iteration explicitly: pending patterns always force one.
pub trait BuildFeature: Send + Sync {
    /// Feature name (for logging/debugging)
    fn name(&self) -> &str;

    /// Called once before the first discovery pass.
    fn before_analysis(&self, _registry: &dyn ResourcesRegistry) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once per iteration. Returns `true` to require another one.
    fn during_analysis(&self, access: &dyn AnalysisAccess) -> Result<bool, BoxError>;
}
