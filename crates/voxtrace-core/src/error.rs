//! Error types for host-side scene handling.
//!
//! Traversal itself never fails; these cover validation and scene I/O.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// A fixed-capacity structure would overflow
    #[error("Capacity exceeded: {what} needs {requested}, limit is {capacity}")]
    CapacityExceeded {
        /// What overflowed
        what: &'static str,
        /// Requested size
        requested: usize,
        /// Hard limit
        capacity: usize,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_limit() {
        let err = Error::CapacityExceeded {
            what: "tree64 nodes",
            requested: 40_000,
            capacity: 32_768,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: tree64 nodes needs 40000, limit is 32768"
        );
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "scene.bin"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
