//! Package - a buildable unit reported by the toolchain's package lister.

use std::fmt;

use serde::Deserialize;

/// Declared package name of program entry points.
pub const MAIN_PACKAGE_NAME: &str = "main";

/// A package import path with its entry-point classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Package {
    /// Import path (e.g. `example.com/mod/cmd/tool`)
    import_path: String,

    /// Whether the package declares `package main`
    is_main: bool,
}

impl Package {
    /// A package whose kind has not been inspected; treated as a library.
    pub fn new(import_path: impl Into<String>) -> Self {
        Package {
            import_path: import_path.into(),
            is_main: false,
        }
    }

    /// A package known to be a program entry point.
    pub fn main(import_path: impl Into<String>) -> Self {
        Package {
            import_path: import_path.into(),
            is_main: true,
        }
    }

    /// Get the import path.
    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    /// Check if this package is a program entry point.
    pub fn is_main(&self) -> bool {
        self.is_main
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.import_path)
    }
}

impl AsRef<str> for Package {
    fn as_ref(&self) -> &str {
        &self.import_path
    }
}

/// The subset of a `go list -json` record used for classification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRecord {
    /// Import path of the package.
    pub import_path: String,

    /// Declared package name.
    #[serde(default)]
    pub name: String,
}

impl PackageRecord {
    pub fn is_main(&self) -> bool {
        self.name == MAIN_PACKAGE_NAME
    }
}

impl From<PackageRecord> for Package {
    fn from(record: PackageRecord) -> Self {
        Package {
            is_main: record.is_main(),
            import_path: record.import_path,
        }
    }
}
