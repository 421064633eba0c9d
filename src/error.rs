//! Error types for zero-pgtype.

use thiserror::Error;

use crate::protocol::types::{FormatCode, Oid};
use crate::value::ValueKind;

/// Result type for zero-pgtype operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for zero-pgtype.
///
/// Every variant is scoped to a single value. Decoding a row or an array never
/// fails as a side effect of another value's error; the caller decides whether
/// one bad value aborts the rest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No codec is registered for the type OID
    #[error("unknown type OID: {0}")]
    UnknownType(Oid),

    /// Text input does not match the grammar of the target type
    #[error("malformed {type_name} literal: {reason}")]
    MalformedLiteral {
        type_name: &'static str,
        reason: String,
    },

    /// Binary input is shorter than the type's layout requires
    #[error("truncated {type_name} value: need {expected} bytes, got {actual}")]
    TruncatedValue {
        type_name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Binary input is longer than the type's layout
    #[error("trailing bytes after {type_name} value: expected {expected} bytes, got {actual}")]
    TrailingBytes {
        type_name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Array envelope disagrees with the elements actually present
    #[error("array dimension mismatch: envelope declares {expected} elements, found {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The native element type cannot hold what the resolved wire codec produces
    #[error("element codec mismatch: expected {expected:?}, resolved codec produces {found:?}")]
    ElementCodecMismatch { expected: ValueKind, found: ValueKind },

    /// The codec does not implement the requested wire format
    #[error("{codec} does not support {format:?} format")]
    UnsupportedFormat { codec: String, format: FormatCode },

    /// The value cannot be encoded as or decoded from the given OID
    #[error("type mismatch: cannot convert {from} to OID {to}")]
    TypeMismatch { from: String, to: Oid },

    /// Narrowing conversion would lose data
    #[error("{from} value overflows {to}")]
    Overflow {
        from: &'static str,
        to: &'static str,
    },

    /// SQL NULL decoded into a type that cannot represent it
    #[error("unexpected NULL value")]
    UnexpectedNull,

    /// Invalid options
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Returns true if the caller may fall back to an uninterpreted byte value.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownType(_))
    }

    pub(crate) fn malformed(type_name: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedLiteral {
            type_name,
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(type_name: &'static str, expected: usize, actual: usize) -> Self {
        Error::TruncatedValue {
            type_name,
            expected,
            actual,
        }
    }

    pub(crate) fn type_mismatch(from: impl std::fmt::Display, to: Oid) -> Self {
        Error::TypeMismatch {
            from: from.to_string(),
            to,
        }
    }

    pub(crate) fn overflow(from: &'static str, to: &'static str) -> Self {
        Error::Overflow { from, to }
    }

    pub(crate) fn unsupported(codec: impl Into<String>, format: FormatCode) -> Self {
        Error::UnsupportedFormat {
            codec: codec.into(),
            format,
        }
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::malformed("binary", format!("zerocopy cast error: {err:?}"))
    }
}
