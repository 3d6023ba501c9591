//! Containers that hold candidate resources.
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  DirectoryTree   │   │ ArchiveContainer │   │ ModuleContainer  │
//! │  (walkdir)       │   │ (zip)            │   │ (jimage/exploded)│
//! └────────┬─────────┘   └────────┬─────────┘   └────────┬─────────┘
//!          └──────── (relative path, reader) ────────────┘
//!                                 │ full-match against patterns
//!                                 ▼
//!                       ┌──────────────────┐
//!                       │ ResourceRegistry │
//!                       └──────────────────┘
//! ```
//!
//! Relative paths are always `/`-separated, whatever the host uses.

pub mod archive;
pub mod directory;
pub mod module;

pub use module::{ModuleHandle, RuntimeImage};

use std::path::{Path, PathBuf};

/// One input container, fixed for the whole analysis.
#[derive(Debug, Clone)]
pub enum ClasspathElement {
    DirectoryTree(PathBuf),
    ArchiveContainer(PathBuf),
    ModuleContainer(ModuleHandle),
}

impl ClasspathElement {
    /// Classify a classpath entry: directories are walked, anything else is
    /// treated as an archive and fails at scan time if it is not one.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            ClasspathElement::DirectoryTree(path)
        } else {
            ClasspathElement::ArchiveContainer(path)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClasspathElement::DirectoryTree(_) => "directory",
            ClasspathElement::ArchiveContainer(_) => "archive",
            ClasspathElement::ModuleContainer(_) => "module",
        }
    }

    /// Human readable location for diagnostics
    pub fn location(&self) -> String {
        match self {
            ClasspathElement::DirectoryTree(path) | ClasspathElement::ArchiveContainer(path) => {
                path.display().to_string()
            }
            ClasspathElement::ModuleContainer(handle) => {
                format!("{} ({})", handle.name(), handle.image().location().display())
            }
        }
    }

    /// Filesystem path backing a directory or archive element
    pub fn path(&self) -> Option<&Path> {
        match self {
            ClasspathElement::DirectoryTree(path) | ClasspathElement::ArchiveContainer(path) => {
                Some(path)
            }
            ClasspathElement::ModuleContainer(_) => None,
        }
    }
}

/// Counters for one container scan
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    /// Leaf entries tested against the patterns
    pub candidates: usize,
    /// Entries that matched and were registered
    pub registered: usize,
}
