//! Error types for bookkeeping operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during bookkeeping operations.
///
/// Errors that could mask data loss (inconsistent work lists, unparseable
/// version tags, deleted schema snapshots) are surfaced as typed failures
/// and never silently repaired.
#[derive(Error, Debug)]
pub enum AnnotrackError {
    /// No configuration file exists at the expected path. The caller must
    /// bootstrap a default document before the first save.
    #[error("No configuration found at {path:?}")]
    ConfigMissing {
        /// Path that was probed for the configuration document
        path: PathBuf,
    },

    /// The working/remaining list files contradict the discovered case set.
    /// Fatal to the session; requires manual inspection of the list files.
    #[error("Inconsistent working/remaining lists: {message}")]
    InconsistentWorkflow {
        /// Description of the contradiction
        message: String,
    },

    /// A version string does not parse as `v` + integer. Signals external
    /// corruption of filenames or history columns.
    #[error("Malformed version tag '{tag}'")]
    MalformedVersionTag {
        /// The string that failed to parse
        tag: String,
    },

    /// A historical row references a combobox-schema version that is no
    /// longer present in the live configuration.
    #[error("Combobox schema version '{version}' is missing from the configuration")]
    OrphanedSchemaVersion {
        /// The recorded version tag
        version: String,
    },

    /// An edit would remove the last remaining segmentation label.
    #[error("The label list cannot be empty; at least one segmentation label is required")]
    EmptyLabelSchema,

    /// A classification column header does not follow the `kind:name`
    /// encoding.
    #[error("Malformed column key '{column}'")]
    MalformedColumnKey {
        /// The offending column header
        column: String,
    },

    /// A history table has an invalid shape or content.
    #[error("Invalid history table: {message}")]
    InvalidTable {
        /// Description of the table error
        message: String,
    },

    /// The configuration document violates a structural invariant.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AnnotrackError {
    /// Create an inconsistent-workflow error with a message.
    pub fn inconsistent_workflow(message: impl Into<String>) -> Self {
        Self::InconsistentWorkflow {
            message: message.into(),
        }
    }

    /// Create a malformed version tag error.
    pub fn malformed_version_tag(tag: impl Into<String>) -> Self {
        Self::MalformedVersionTag { tag: tag.into() }
    }

    /// Create an invalid table error with a message.
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self::InvalidTable {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error with a message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnnotrackError>;
