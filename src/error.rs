//! Error handling for pathtrees.
//! Defines the error type and result alias used throughout the crate.

use std::convert::Infallible;
use std::io;
use thiserror::Error;

/// Custom error types for pathtrees operations.
///
/// Template, tree and lookup failures get their own variants so callers can
/// tell a malformed definition apart from a path that simply doesn't match.
/// Filesystem failures from the collaborator are carried through unchanged.
#[derive(Error, Debug)]
pub enum PathtreesError {
    /// A strict format found placeholders without a bound value.
    #[error("Missing value for {} in {target}.", .keys.join(", "))]
    MissingKey { target: String, keys: Vec<String> },

    /// A concrete path doesn't have the structure of the template.
    #[error("Could not parse '{path}' using '{template}': {reason}.")]
    ParseError { template: String, path: String, reason: String },

    /// No path is registered under this logical name.
    #[error("No such path: '{0}'.")]
    NoSuchPath(String),

    /// Two nodes claim the same logical name.
    #[error("Duplicate path name: '{0}'.")]
    DuplicateName(String),

    /// Unbalanced braces or an invalid placeholder name.
    #[error("Invalid template '{template}': {reason}.")]
    InvalidTemplate { template: String, reason: String },

    /// A bound value can't be rendered with the placeholder's format spec.
    #[error("Cannot format {value} for '{name}' with spec '{spec}'.")]
    FormatSpec { name: String, spec: String, value: String },

    /// Declarative input that is neither a name, a mapping nor a list.
    #[error("Invalid tree definition: {0}.")]
    InvalidDefinition(String),

    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("Directory walk error: {0}.")]
    WalkDirError(#[from] walkdir::Error),

    #[error("Glob error: {0}.")]
    GlobError(#[from] globset::Error),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}.")]
    YamlError(#[from] serde_yaml::Error),
}

impl From<Infallible> for PathtreesError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Convenience type alias for Results with `PathtreesError` as the error type.
pub type PathtreesResult<T> = std::result::Result<T, PathtreesError>;
