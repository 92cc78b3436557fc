//! Errors raised while resolving a project's modules.

use thiserror::Error;

/// Problems with the project configuration file or its values.
///
/// Returned wrapped in [`anyhow::Error`] by the I/O layer; callers that care
/// about the kind can `downcast_ref::<ProjectError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// No candidate config file exists in the start directory or its ancestors.
    #[error("Could not find a config file. Candidates are: {}.", .candidates.join(", "))]
    ConfigMissing { candidates: Vec<String> },

    /// A value exists but has the wrong TOML type.
    #[error("`{key}` must be {expected}")]
    ValueType { key: String, expected: &'static str },

    /// A value needed to resolve modules is absent.
    #[error("{0}")]
    ValueMissing(String),
}
