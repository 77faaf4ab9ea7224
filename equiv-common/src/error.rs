//! Common error types for the equivalence engine

use thiserror::Error;

/// Common result type for equivalence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the equivalence crates
///
/// Absence of evidence (no schedule results, unresolvable channel, empty
/// title) is never an error; it surfaces as an empty candidate set.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration could not be written back as TOML
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller input or construction parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required component missing when assembling a pipeline
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Exhaustive configuration table has no entry for a value
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Failure raised by an external resolver or handler
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
