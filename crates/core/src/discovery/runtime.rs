//! Java runtime image discovery.
//!
//! Locates the module graph of the host JDK from:
//! - JAVA_HOME environment variable
//! - macOS java_home tool
//! - Common installation paths
//! - SDKMAN

use std::path::{Path, PathBuf};
use tracing::debug;

/// A JDK whose `lib/modules` image was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkRuntime {
    pub home: PathBuf,
    pub modules: PathBuf,
    pub version: Option<String>,
}

/// Find the first JDK with a runtime image.
pub fn locate_jdk() -> Option<JdkRuntime> {
    // 1. Check JAVA_HOME
    if let Ok(java_home) = std::env::var("JAVA_HOME") {
        if let Some(runtime) = inspect_home(Path::new(&java_home)) {
            return Some(runtime);
        }
    }

    // 2. macOS specific: Use java_home tool
    #[cfg(target_os = "macos")]
    if let Ok(output) = std::process::Command::new("/usr/libexec/java_home").output() {
        if output.status.success() {
            let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if let Some(runtime) = inspect_home(Path::new(&path_str)) {
                return Some(runtime);
            }
        }
    }

    // 3. Search common installation paths
    search_roots()
        .iter()
        .filter(|root| root.exists())
        .find_map(|root| locate_under(root))
}

fn search_roots() -> Vec<PathBuf> {
    let mut search_roots = Vec::new();

    #[cfg(target_os = "macos")]
    {
        search_roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines/"));
        search_roots.push(PathBuf::from("/opt/homebrew/opt/openjdk/"));
        search_roots.push(PathBuf::from("/usr/local/opt/openjdk/"));
    }
    #[cfg(target_os = "linux")]
    {
        search_roots.push(PathBuf::from("/usr/lib/jvm/"));
    }
    #[cfg(target_os = "windows")]
    {
        search_roots.push(PathBuf::from("C:\\Program Files\\Java\\"));
    }

    // SDKMAN
    if let Some(mut sdkman) = dirs::home_dir() {
        sdkman.push(".sdkman/candidates/java/");
        search_roots.push(sdkman);
    }

    search_roots
}

/// Look for a JDK at `root` itself or in one of its direct children.
pub fn locate_under(root: &Path) -> Option<JdkRuntime> {
    // If root itself is a JDK (e.g. Homebrew symlink)
    if let Some(runtime) = inspect_home(root) {
        return Some(runtime);
    }

    // If root is a parent directory containing multiple SDKs
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    candidates.into_iter().find_map(|mut sdk_path| {
        if cfg!(target_os = "macos") && sdk_path.join("Contents/Home").exists() {
            sdk_path = sdk_path.join("Contents/Home");
        }
        inspect_home(&sdk_path)
    })
}

/// A JDK home qualifies when it has a Java 9+ runtime image.
fn inspect_home(home: &Path) -> Option<JdkRuntime> {
    let modules = home.join("lib/modules");
    if !modules.is_file() {
        return None;
    }
    let version = detect_jdk_version(home);
    debug!(
        "Found JDK runtime image at {} (version {:?})",
        modules.display(),
        version
    );
    Some(JdkRuntime {
        home: home.to_path_buf(),
        modules,
        version,
    })
}

fn detect_jdk_version(jdk_root: &Path) -> Option<String> {
    // Try to read release file
    if let Ok(content) = std::fs::read_to_string(jdk_root.join("release")) {
        for line in content.lines() {
            if let Some(version) = line.strip_prefix("JAVA_VERSION=") {
                return Some(version.trim_matches('"').to_string());
            }
        }
    }

    // Fallback: try to extract from path
    let path_str = jdk_root.to_string_lossy();
    regex::Regex::new(r"jdk-?(\d+(?:\.\d+)*)")
        .ok()
        .and_then(|re| re.captures(&path_str))
        .and_then(|cap| cap.get(1).map(|m| m.as_str().to_string()))
}
