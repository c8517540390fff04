//! Cross-compilation targets.
//!
//! A [`Platform`] is an `os/arch` pair using the Go toolchain's names
//! (`GOOS`/`GOARCH`), e.g. `linux/amd64` or `darwin/arm64`.

use std::fmt;
use std::str::FromStr;

use crate::core::errors::BuildError;

/// Operating systems accepted as a build target.
pub const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "illumos", "ios", "js", "linux", "netbsd",
    "openbsd", "plan9", "solaris", "wasip1", "windows",
];

/// CPU architectures accepted as a build target.
pub const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

/// Platforms built by `all` when none are configured.
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "windows/amd64",
    "darwin/arm64",
    "darwin/amd64",
    "linux/amd64",
];

/// Platforms built by the `linux` shortcut.
pub const LINUX_PLATFORMS: &[&str] = &["linux/amd64"];

/// Platforms built by the `darwin` shortcut.
pub const DARWIN_PLATFORMS: &[&str] = &["darwin/amd64", "darwin/arm64"];

/// Platforms built by the `windows` shortcut.
pub const WINDOWS_PLATFORMS: &[&str] = &["windows/amd64"];

/// An operating system / architecture pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    /// Parse a platform string such as `linux/amd64`.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        let mut parts = s.split('/');
        let (os, arch) = match (parts.next(), parts.next(), parts.next()) {
            (Some(os), Some(arch), None) if !os.is_empty() && !arch.is_empty() => (os, arch),
            _ => return Err(BuildError::InvalidPlatformFormat(s.to_string())),
        };

        if !KNOWN_OS.contains(&os) {
            return Err(BuildError::UnsupportedPlatform {
                platform: s.to_string(),
                reason: format!("unknown operating system `{}`", os),
            });
        }
        if !KNOWN_ARCH.contains(&arch) {
            return Err(BuildError::UnsupportedPlatform {
                platform: s.to_string(),
                reason: format!("unknown architecture `{}`", arch),
            });
        }

        Ok(Platform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }

    /// Detect the host platform, translated to toolchain names.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            other => other,
        };

        Platform {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// Operating system name (`GOOS`).
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture name (`GOARCH`).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Executable suffix for binaries built for this platform.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }

    /// Binary file name for an explicit cross-build: `<binary>-<os>-<arch>[.exe]`.
    pub fn output_name(&self, binary: &str) -> String {
        format!("{}-{}-{}{}", binary, self.os, self.arch, self.exe_suffix())
    }

    /// Binary file name for a host build: the bare binary name, plus `.exe` on Windows.
    pub fn host_output_name(&self, binary: &str) -> String {
        format!("{}{}", binary, self.exe_suffix())
    }
}

impl FromStr for Platform {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::parse(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
