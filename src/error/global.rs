use std::io;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    // ==== System / External ====
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // ==== Addressing ====
    #[error("Invalid path: {0}")]
    Path(String),

    #[error("Name collision after escaping: {0:?}")]
    Collision(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Name already exists: {0}")]
    AlreadyExists(String),

    // ==== Marshaling ====
    #[error("No marshaler for value kind: {0}")]
    UnsupportedValue(String),

    #[error("Node cannot be read as the requested kind: {0}")]
    TypeMismatch(String),

    #[error("Corrupted node layout at {location}: {reason}")]
    Corrupted { location: String, reason: String },

    // ==== Configuration ====
    #[error("Invalid options: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Display output stays stable for the variants callers match on.
    #[test]
    fn test_display_messages() {
        let err = StoreError::Path("empty path".into());
        assert_eq!(err.to_string(), "Invalid path: empty path");

        let err = StoreError::Collision("a\\x2fb".into());
        assert!(err.to_string().contains("collision"));

        let err = StoreError::Corrupted {
            location: "/root/x".into(),
            reason: "missing shape attribute".into(),
        };
        assert!(err.to_string().contains("/root/x"));
    }

    /// io::Error converts through the #[from] impl.
    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
