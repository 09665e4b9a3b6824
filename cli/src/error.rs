#![deny(missing_docs)]

//! # CLI Errors
//!
//! Error types for the CLI crate.

use derive_more::{Display, From};
use opgen_core::AppError;

/// Main error enum for CLI operations.
#[derive(Debug, Display, From)]
pub enum CliError {
    /// IO Error wrapper.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// Failure reported by the core library.
    #[display("{}", _0)]
    Core(AppError),

    /// YAML input could not be parsed.
    #[display("YAML Error: {}", _0)]
    Yaml(serde_yaml::Error),

    /// An external tool exited unsuccessfully.
    #[from(ignore)]
    #[display("{} failed with status {}: {}", program, status, stderr)]
    Tool {
        /// Program name.
        program: String,
        /// Exit status as printed by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// General failure message.
    #[display("Operation failed: {}", _0)]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for CliError {}

/// Lets CLI-side resource sources and issuers report through core traits.
impl From<CliError> for AppError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Core(inner) => inner,
            other => AppError::General(other.to_string()),
        }
    }
}

/// Result type alias.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_round_trips() {
        let err: CliError = AppError::Validation("bad".into()).into();
        assert_eq!(err.to_string(), "Validation Error: bad");
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[test]
    fn test_tool_error_becomes_general() {
        let err = CliError::Tool {
            program: "openssl".into(),
            status: "exit status: 1".into(),
            stderr: "no".into(),
        };
        let app: AppError = err.into();
        assert!(
            matches!(app, AppError::General(ref m) if m == "openssl failed with status exit status: 1: no")
        );
    }
}
