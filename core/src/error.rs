//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Wrapper for YAML (de)serialization errors.
    #[display("YAML Error: {_0}")]
    Yaml(serde_yaml::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// Invalid regular expression supplied for a structural anchor.
    #[display("Regex Error: {_0}")]
    Regex(regex::Error),

    /// An explicit marker (or operation target) is missing from a document.
    #[from(ignore)]
    #[display("Marker not found: {_0}")]
    MarkerNotFound(String),

    /// User supplied configuration is invalid.
    #[from(ignore)]
    #[display("Validation Error: {_0}")]
    Validation(String),

    /// A file exists and the builder asked to fail in that case.
    #[from(ignore)]
    #[display("File already exists: {_0}")]
    FileExists(String),

    /// A config-gen stage failed; the whole run is aborted.
    #[from(ignore)]
    #[display("Pipeline stage '{stage}' failed: {message}")]
    Pipeline {
        /// Name of the failing stage.
        stage: String,
        /// Failure description.
        message: String,
    },

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
