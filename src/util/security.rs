//! Input validation for external commands.
//!
//! Processes are always spawned from an argv array, never through a shell,
//! so metacharacters carry no meaning to the OS. These checks reject
//! obviously hostile input early with a clear error instead of passing it
//! through to the toolchain.

use std::path::Path;

use crate::core::errors::BuildError;

/// Substrings rejected anywhere in a program name or argument.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    ("$(", "command substitution"),
    ("${", "variable expansion"),
    ("`", "command substitution"),
    ("&&", "command chaining"),
    ("||", "command chaining"),
    (";", "command separator"),
    ("|", "pipe"),
    ("$", "variable expansion"),
];

/// Programs that would re-introduce shell interpretation.
const FORBIDDEN_PROGRAMS: &[&str] = &[
    "sh", "bash", "zsh", "dash", "ksh", "csh", "tcsh", "fish", "cmd", "cmd.exe", "powershell",
    "powershell.exe", "pwsh", "eval", "exec",
];

fn check_control_chars(input: &str) -> Result<(), BuildError> {
    if let Some(c) = input.chars().find(|c| c.is_control() && *c != '\t') {
        return Err(BuildError::unsafe_input(
            input,
            format!("contains control character {:?}", c),
        ));
    }
    Ok(())
}

fn check_patterns(input: &str) -> Result<(), BuildError> {
    for (pattern, what) in DANGEROUS_PATTERNS {
        if input.contains(pattern) {
            return Err(BuildError::unsafe_input(
                input,
                format!("contains `{}` ({})", pattern, what),
            ));
        }
    }
    Ok(())
}

/// Validate a program name: a bare executable name or an absolute path.
pub fn validate_program(program: &str) -> Result<(), BuildError> {
    if program.trim().is_empty() {
        return Err(BuildError::unsafe_input(program, "program name is empty"));
    }
    check_control_chars(program)?;
    check_patterns(program)?;

    if program.contains("..") {
        return Err(BuildError::unsafe_input(
            program,
            "program name contains path traversal",
        ));
    }

    let path = Path::new(program);
    let is_bare = path.components().count() == 1;
    if !is_bare && !path.is_absolute() {
        return Err(BuildError::unsafe_input(
            program,
            "program must be a bare name or an absolute path",
        ));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if FORBIDDEN_PROGRAMS.contains(&file_name.as_str()) {
        return Err(BuildError::unsafe_input(
            program,
            "shell interpreters cannot be invoked",
        ));
    }

    Ok(())
}

/// Validate a literal command argument.
pub fn validate_arg(arg: &str) -> Result<(), BuildError> {
    check_control_chars(arg)?;
    check_patterns(arg)
}

/// Validate an argument that names a filesystem path.
pub fn validate_path(path: &str) -> Result<(), BuildError> {
    validate_arg(path)?;

    let traversal = path.contains("../")
        || path.contains("..\\")
        || path == ".."
        || path.ends_with("/..")
        || path.ends_with("\\..");
    if traversal {
        return Err(BuildError::unsafe_input(path, "path traversal detected"));
    }
    Ok(())
}

/// Validate a full invocation. The value following `-o` is checked as a path.
pub fn validate_command(program: &str, args: &[String]) -> Result<(), BuildError> {
    validate_program(program)?;

    let mut expect_path = false;
    for arg in args {
        if expect_path {
            validate_path(arg)?;
        } else {
            validate_arg(arg)?;
        }
        expect_path = arg == "-o";
    }
    Ok(())
}
