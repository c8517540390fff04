//! Test fixtures for common test scenarios.
//!
//! Go project layouts written to real directories, plus canned toolchain
//! outputs for [`MockRunner`](super::MockRunner) expectations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixture for a Go module on disk.
#[derive(Debug, Clone)]
pub struct GoProjectFixture {
    /// Module path, e.g. `example.com/module`.
    pub module: String,
    /// Files (path relative to project root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl GoProjectFixture {
    /// Create a module with only a `go.mod`.
    pub fn new(module: impl Into<String>) -> Self {
        let module = module.into();
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("go.mod"),
            format!("module {}\n\ngo 1.22\n", module),
        );
        GoProjectFixture { module, files }
    }

    /// A module whose entry point is `main.go` at the root.
    pub fn binary(module: impl Into<String>) -> Self {
        Self::new(module).with_root_main()
    }

    /// Directory name the project is written to (last module path segment).
    pub fn dir_name(&self) -> &str {
        self.module.rsplit('/').next().unwrap_or(&self.module)
    }

    /// Add `main.go` at the project root.
    pub fn with_root_main(self) -> Self {
        self.with_file("main.go", sources::main_program())
    }

    /// Add `cmd/<name>/main.go`.
    pub fn with_cmd(self, name: &str) -> Self {
        self.with_file(format!("cmd/{}/main.go", name), sources::main_program())
    }

    /// Add a library package at `path`.
    pub fn with_library(self, path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.with_file(format!("{}/{}.go", path, name), sources::library(&name))
    }

    /// Add a `keel.toml`.
    pub fn with_config(self, toml: impl Into<String>) -> Self {
        self.with_file(crate::util::config::CONFIG_FILE_NAME, toml)
    }

    /// Add an arbitrary file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write this fixture under `base_path`, returning the project root.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(self.dir_name());
        std::fs::create_dir_all(&project_path)?;

        for (rel_path, content) in &self.files {
            let full_path = project_path.join(rel_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }

        Ok(project_path)
    }
}

/// Go source templates.
pub mod sources {
    /// An entry point.
    pub fn main_program() -> String {
        r#"// Command entry point.
package main

import "fmt"

var (
	version = "dev"
	commit  = "unknown"
)

func main() {
	fmt.Println(version, commit)
}
"#
        .to_string()
    }

    /// A library package.
    pub fn library(name: &str) -> String {
        format!(
            r#"package {name}

// Hello returns a greeting.
func Hello() string {{
	return "hello from {name}"
}}
"#
        )
    }
}

/// Canned toolchain outputs.
pub mod go_outputs {
    use super::super::MockProcessOutput;

    /// `go list <pattern>` output.
    pub fn list(import_paths: &[&str]) -> MockProcessOutput {
        let mut out = import_paths.join("\n");
        out.push('\n');
        MockProcessOutput::success(out)
    }

    /// `go list -json <pattern>` output: concatenated, indented JSON objects.
    pub fn list_json(packages: &[(&str, &str)]) -> MockProcessOutput {
        let out: String = packages
            .iter()
            .map(|(import_path, name)| {
                format!(
                    "{{\n\t\"Dir\": \"/src/{import_path}\",\n\t\"ImportPath\": \"{import_path}\",\n\t\"Name\": \"{name}\",\n\t\"GoFiles\": [\n\t\t\"{name}.go\"\n\t]\n}}\n"
                )
            })
            .collect();
        MockProcessOutput::success(out)
    }

    /// A compile error.
    pub fn compile_error(file: &str, line: u32, message: &str) -> MockProcessOutput {
        MockProcessOutput::failure(1, format!("# example.com/module\n./{}:{}:2: {}\n", file, line, message))
    }

    /// `git describe` in a repository without tags.
    pub fn no_tags() -> MockProcessOutput {
        MockProcessOutput::failure(128, "fatal: No names found, cannot describe anything.\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = GoProjectFixture::binary("example.com/org/module")
            .with_cmd("tool")
            .with_library("internal/util");

        assert_eq!(fixture.dir_name(), "module");
        assert!(fixture.files.contains_key(&PathBuf::from("go.mod")));
        assert!(fixture.files.contains_key(&PathBuf::from("main.go")));
        assert!(fixture.files.contains_key(&PathBuf::from("cmd/tool/main.go")));
        assert!(fixture
            .files
            .contains_key(&PathBuf::from("internal/util/util.go")));
    }

    #[test]
    fn test_fixture_write_to() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = GoProjectFixture::binary("example.com/module")
            .write_to(tmp.path())
            .unwrap();

        assert_eq!(root, tmp.path().join("module"));
        assert!(root.join("main.go").is_file());
        let go_mod = std::fs::read_to_string(root.join("go.mod")).unwrap();
        assert!(go_mod.starts_with("module example.com/module"));
    }

    #[test]
    fn test_list_json_output() {
        let out = go_outputs::list_json(&[("example.com/module", "main")]);
        let record: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
        assert_eq!(record["Name"], "main");
    }
}
