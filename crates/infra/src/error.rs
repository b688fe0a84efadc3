//! Error types for environment resolution and template synthesis.

use thiserror::Error;

/// Errors raised while resolving deployment configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown environment \"{name}\". Available environments: {available}.")]
    UnknownEnvironment { name: String, available: String },

    #[error("Invalid context argument '{0}': expected KEY=VALUE")]
    InvalidContext(String),
}

/// Errors raised while declaring resources or writing the synthesized template.
///
/// Every variant except `Io` is produced before anything touches the filesystem.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Invalid logical id '{0}': use ASCII letters and digits only")]
    InvalidLogicalId(String),

    #[error("Duplicate logical id '{0}'")]
    DuplicateLogicalId(String),

    #[error("{resource} references unknown resource '{target}'")]
    DanglingReference { resource: String, target: String },

    #[error("Invalid property {property} on {resource}: {reason}")]
    InvalidProperty {
        resource: String,
        property: &'static str,
        reason: String,
    },

    #[error("Invalid environment '{name}': {reason}")]
    InvalidEnvironment { name: String, reason: String },

    #[error("Failed to serialize {resource}: {source}")]
    Serialize {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthError {
    pub(crate) fn invalid(
        resource: impl Into<String>,
        property: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        SynthError::InvalidProperty {
            resource: resource.into(),
            property,
            reason: reason.into(),
        }
    }
}

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;
