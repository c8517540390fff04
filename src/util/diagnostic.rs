//! User-friendly diagnostic messages.
//!
//! Every error printed by the CLI carries the failing step, the underlying
//! cause, and where possible a suggested next action.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a compiler invocation fails.
    pub const BUILD_FAILED: &str = "Run `keel --verbose build` to see every toolchain invocation";

    /// Suggestion when the toolchain could not be started at all.
    pub const NO_TOOLCHAIN: &str = "Check that `go` and `git` are installed and on PATH";

    /// Suggestion when a platform string is rejected.
    pub const LIST_PLATFORMS: &str = "Run `keel platforms` to see the supported os/arch pairs";

    /// Suggestion when no buildable main package exists.
    pub const SET_MAIN: &str =
        "Set `main = \"./cmd/<name>\"` under [project] in keel.toml";

    /// Suggestion when every workspace module came back empty.
    pub const CHECK_WORKSPACE: &str =
        "Check the `use` directives in go.work, or remove go.work to build a single module";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let error_prefix = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", error_prefix, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
