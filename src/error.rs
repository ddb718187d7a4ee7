//! Error types for ODF document model operations.

use thiserror::Error;

/// Errors that can occur while building, querying, or mutating a document.
///
/// Lookup misses are not errors: an absent attribute, a cell past the end of
/// a row, or an unknown named range all come back as `None`. The variants
/// here cover malformed input and structural misuse, which indicate a caller
/// bug or a broken document rather than a normal sparse state.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed XML input
    #[error("XML error: {0}")]
    Xml(String),

    /// Qualified name uses a prefix outside the ODF registry
    #[error("Unknown namespace prefix: {0}")]
    UnknownPrefix(String),

    /// No registered prefix for a namespace URI
    #[error("Unknown namespace URI: {0}")]
    UnknownNamespace(String),

    /// Malformed or unsupported query expression
    #[error("Invalid query: {0}")]
    Query(String),

    /// Structural misuse: bad insert position, deleting the root, binding a
    /// table view to a non-table element
    #[error("Invalid structure: {0}")]
    Structure(String),

    /// Malformed cell coordinate or area string
    #[error("Invalid coordinates: {0}")]
    Coordinate(String),

    /// Typed value text that does not match its grammar
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
