//! Error types for the uscene library.

use thiserror::Error;

/// Main error type for scene-node operations.
///
/// Not-found conditions (missing child, attribute, variant) are *not*
/// errors in this library; those are signaled with `Option`/`None`.
/// The variants here cover caller logic bugs and environmental failures.
#[derive(Error, Debug)]
pub enum Error {
    /// No schema type with this name is registered
    #[error("Unknown schema type: {0}")]
    UnknownSchemaType(String),

    /// Prim does not exist in the underlying store
    #[error("Prim not found: {0}")]
    PrimNotFound(String),

    /// The store rejected prim creation
    #[error("Prim creation failed: {0}")]
    PrimCreationFailed(String),

    /// Attribute exists with a conflicting declared type
    #[error("Attribute '{name}' already exists with type {existing}, requested {requested}")]
    AttributeTypeConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// The store rejected attribute authoring
    #[error("Attribute creation failed: {0}")]
    AttributeCreationFailed(String),

    /// Mismatched begin/end of a variant edit context
    #[error("Variant edit context misuse: {0}")]
    EditContextMisuse(&'static str),

    /// Node already has a parent and cannot be re-parented
    #[error("Node already has a parent: {0}")]
    AlreadyParented(String),

    /// I/O error (settings persistence)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings (de)serialization error
    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type alias for uscene operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnknownSchemaType("Volume".into());
        assert!(e.to_string().contains("Volume"));

        let e = Error::AttributeTypeConflict {
            name: "color".into(),
            existing: "Float3".into(),
            requested: "Token".into(),
        };
        assert!(e.to_string().contains("color"));
        assert!(e.to_string().contains("Float3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
