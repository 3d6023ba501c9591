//! Inclusion patterns: the pending set fed by producers and the compiled
//! form consumed by a discovery pass.

use crate::error::{RescopeError, Result};
use regex::Regex;
use rescope_api::{RegistrationError, RegistrationResult};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct PatternState {
    pending: BTreeSet<String>,
    applied: HashSet<String>,
    sealed: bool,
}

/// Pattern sources waiting for the next pass.
///
/// Any thread may add; only the discovery driver drains. The sealed flag
/// lives under the same lock as the pending set so a pattern can never be
/// accepted after the driver decided there is nothing left to scan.
#[derive(Debug, Default)]
pub struct PatternSet {
    state: Mutex<PatternState>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PatternState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a pattern source. Returns `true` if it was not known before.
    pub fn add(&self, source: &str) -> RegistrationResult<bool> {
        let mut state = self.state();
        if state.sealed {
            return Err(RegistrationError::LateRegistration {
                pattern: source.to_string(),
            });
        }
        if state.applied.contains(source) {
            return Ok(false);
        }
        let added = state.pending.insert(source.to_string());
        if added {
            debug!("Queued resource pattern: {}", source);
        }
        Ok(added)
    }

    /// Take every pending source and mark it applied, leaving the pending
    /// set empty. Sources added afterwards wait for the next drain.
    pub fn drain(&self) -> Vec<String> {
        let mut state = self.state();
        let drained = std::mem::take(&mut state.pending);
        state.applied.extend(drained.iter().cloned());
        drained.into_iter().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.state().pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn applied_len(&self) -> usize {
        self.state().applied.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.state().sealed
    }

    /// Seal the set if nothing is pending. Returns whether the set is sealed.
    pub fn try_seal(&self) -> bool {
        let mut state = self.state();
        if state.pending.is_empty() {
            state.sealed = true;
        }
        state.sealed
    }
}

/// A compiled inclusion pattern. Matches the whole path, never a substring.
#[derive(Debug, Clone)]
pub struct InclusionPattern {
    source: String,
    regex: Regex,
}

impl InclusionPattern {
    /// Compile `source` for whole-path matching.
    ///
    /// The source must parse on its own first: anchoring a source with an
    /// unbalanced `)` would otherwise close the anchor group early.
    pub fn compile(source: &str) -> Result<Self> {
        let syntax = |e| RescopeError::PatternSyntax {
            pattern: source.to_string(),
            source: e,
        };
        Regex::new(source).map_err(syntax)?;
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(syntax)?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for InclusionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for InclusionPattern {}

/// The patterns of one discovery pass. A path is included when any
/// pattern matches it.
#[derive(Debug, Clone, Default)]
pub struct InclusionPatterns {
    patterns: Vec<InclusionPattern>,
}

impl InclusionPatterns {
    /// Compile a batch of sources. Empty sources are dropped; the first
    /// malformed source fails the whole batch.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let patterns = sources
            .iter()
            .map(|s| s.as_ref())
            .filter(|s: &&str| !s.is_empty())
            .map(InclusionPattern::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(InclusionPattern::source)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}
