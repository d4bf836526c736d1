//! Custom error types for wcdump.
//!
//! Provides structured error handling with enough context to tell a usage
//! mistake apart from a broken backup.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for wcdump operations.
#[derive(Error, Debug)]
pub enum WcError {
    // =========================================================================
    // Backup Errors
    // =========================================================================
    /// Backup root not found at the specified path.
    #[error("Backup not found at '{path}'")]
    BackupNotFound { path: PathBuf },

    /// A store exists but does not have the expected tables or columns.
    #[error("Unexpected schema in '{path}': {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },

    /// SQLite error.
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    // =========================================================================
    // Time Window Errors
    // =========================================================================
    /// Mutually exclusive window options were combined.
    #[error("Conflicting time window options: {combination}")]
    ConflictingWindow { combination: String },

    /// A date value could not be parsed.
    #[error("Invalid date '{value}' for {option}")]
    InvalidDate { value: String, option: &'static str },

    /// Time zone name is not a known IANA zone.
    #[error("Unknown time zone '{name}'")]
    InvalidTimeZone { name: String },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    // =========================================================================
    // CLI Errors
    // =========================================================================
    /// Invalid command-line argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

/// Result type alias for wcdump operations.
pub type Result<T> = std::result::Result<T, WcError>;

impl WcError {
    /// Create a backup not found error.
    pub fn backup_not_found(path: impl Into<PathBuf>) -> Self {
        Self::BackupNotFound { path: path.into() }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a conflicting window error.
    pub fn conflicting_window(combination: impl Into<String>) -> Self {
        Self::ConflictingWindow {
            combination: combination.into(),
        }
    }

    /// Create an invalid date error.
    pub fn invalid_date(value: impl Into<String>, option: &'static str) -> Self {
        Self::InvalidDate {
            value: value.into(),
            option,
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Errors caused by how the tool was invoked, detected before any I/O.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::ConflictingWindow { .. }
                | Self::InvalidDate { .. }
                | Self::InvalidTimeZone { .. }
                | Self::InvalidArgument { .. }
                | Self::ConfigError { .. }
        )
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_usage_error() { 2 } else { 1 }
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BackupNotFound { .. } => {
                Some("Point ROOT at the extracted backup folder that contains 'Documents'.")
            }
            Self::ConflictingWindow { .. } => Some(
                "Use either --last-days or --last-hours, or --from-date/--to-date, not both.",
            ),
            Self::InvalidDate { .. } => {
                Some("Dates look like 2025-01-31 or 2025-01-31T18:30 (local time).")
            }
            Self::InvalidTimeZone { .. } => {
                Some("Use an IANA zone name such as 'Asia/Jerusalem' or 'UTC'.")
            }
            Self::ConfigError { .. } => {
                Some("Fix the file or pass a different one with --config.")
            }
            Self::SchemaMismatch { .. } => {
                Some("The backup may be encrypted or from an unsupported client version.")
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "Conflicting options")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Render a [`WcError`] for the terminal, including its suggestion.
#[must_use]
pub fn format_wc_error(err: &WcError) -> String {
    let title = if err.is_usage_error() {
        "Invalid usage"
    } else {
        "Export failed"
    };
    let suggestions: Vec<&str> = err.suggestion().into_iter().collect();
    format_error(title, &err.to_string(), &suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WcError::backup_not_found("/path/to/backup");
        assert!(err.to_string().contains("/path/to/backup"));
    }

    #[test]
    fn test_window_errors_are_usage_errors() {
        let err = WcError::conflicting_window("--last-days with --from-date");
        assert!(err.is_usage_error());
        assert_eq!(err.exit_code(), 2);
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("--last-days with --from-date"));
    }

    #[test]
    fn test_config_errors_are_usage_errors() {
        let err = WcError::ConfigError {
            path: "/tmp/wcdump.toml".into(),
            reason: "expected an integer".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_storage_errors_exit_one() {
        let err = WcError::schema_mismatch("/tmp/x.sqlite", "no Friend table");
        assert!(!err.is_usage_error());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let wc_err: WcError = io_err.into();
        assert!(matches!(wc_err, WcError::IoError(_)));
    }

    #[test]
    fn test_from_rusqlite_error() {
        fn accepts_wc_error(_: WcError) {}
        let sqlite_err = rusqlite::Error::InvalidQuery;
        accepts_wc_error(sqlite_err.into());
    }

    #[test]
    fn format_error_single_suggestion() {
        let output = format_error("Test Error", "Something went wrong", &["Try this"]);
        assert!(output.contains("Test Error"));
        assert!(output.contains("Something went wrong"));
        assert!(output.contains("Try this"));
    }

    #[test]
    fn format_error_multiple_suggestions() {
        let output = format_error(
            "Test Error",
            "Something went wrong",
            &["First option", "Second option"],
        );
        assert!(output.contains("First option"));
        assert!(output.contains("Second option"));
    }

    #[test]
    fn format_wc_error_includes_hint() {
        let output = format_wc_error(&WcError::invalid_date("2025-13-01", "--from-date"));
        assert!(output.contains("Invalid usage"));
        assert!(output.contains("2025-13-01"));
        assert!(output.contains("Hint:"));
    }
}
