//! Version metadata embedded into built binaries.

use std::fmt;

/// Version used when neither version control nor config provides one.
pub const VERSION_DEV: &str = "dev";

/// Commit used when version control is unavailable.
pub const COMMIT_UNKNOWN: &str = "unknown";

/// Version and commit resolved for a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub commit: String,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, commit: impl Into<String>) -> Self {
        VersionInfo {
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// Check if the version fell back to the development sentinel.
    pub fn is_dev(&self) -> bool {
        self.version == VERSION_DEV
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        VersionInfo::new(VERSION_DEV, COMMIT_UNKNOWN)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.commit)
    }
}
