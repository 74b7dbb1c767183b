//! Error types for the symbol table.
//!
//! Only size-limit violations are recoverable and surface as [`Error`]
//! values. Violations of the ref-count invariants (double free, decoding a
//! stale handle, a corrupt varint stream) mean the stats set is already
//! wrong, so those paths panic with a diagnostic instead of returning.

use std::fmt;

/// Errors returned by the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An encoded name's payload would exceed the two-byte size header.
    NameTooLong {
        /// The payload size that was requested.
        size: usize,
    },

    /// A name list was given more elements than fit in its count byte.
    ListTooLong {
        /// The number of names that was requested.
        count: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NameTooLong { size } => {
                write!(f, "encoded name payload of {size} bytes exceeds the 65535 byte limit")
            }
            Error::ListTooLong { count } => {
                write!(f, "name list of {count} elements exceeds the 255 element limit")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for symbol table operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::NameTooLong { size: 65536 }),
            "encoded name payload of 65536 bytes exceeds the 65535 byte limit"
        );
        assert_eq!(
            format!("{}", Error::ListTooLong { count: 256 }),
            "name list of 256 elements exceeds the 255 element limit"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::NameTooLong { size: 1 }, Error::NameTooLong { size: 1 });
        assert_ne!(Error::NameTooLong { size: 1 }, Error::NameTooLong { size: 2 });
    }
}
