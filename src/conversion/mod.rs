//! Type encoding and decoding for PostgreSQL wire protocol.
//!
//! This module provides traits and implementations for converting between
//! Rust types and PostgreSQL wire format values.

mod bytes;
mod numeric_util;
mod primitives;
mod row;
mod string;

#[cfg(feature = "with-rust-decimal")]
mod decimal;
#[cfg(feature = "with-time")]
mod time;
#[cfg(feature = "with-uuid")]
mod uuid;

pub use numeric_util::{NumericText, numeric_to_string, write_numeric_binary};
pub(crate) use numeric_util::parse_numeric_text;
pub use primitives::{format_f32, format_f64};
pub use row::FromRow;

use crate::error::{Error, Result};
use crate::nullable::Nullable;
use crate::protocol::codec::{FrameBuilder, write_null};
use crate::protocol::types::{FormatCode, Oid};

/// Trait for decoding PostgreSQL values into Rust types.
///
/// This trait provides methods for decoding values from different formats:
/// - `from_null()` - Handle NULL values
/// - `from_text()` - Decode from text format (simple queries)
/// - `from_binary()` - Decode from binary format (extended queries)
///
/// The OID parameter allows implementations to check the PostgreSQL type
/// and reject incompatible types with clear error messages.
pub trait FromWireValue<'a>: Sized {
    /// Decode from NULL value.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>` or `Nullable<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::UnexpectedNull)
    }

    /// Decode from text format bytes.
    ///
    /// Text format is the default for simple queries. Values are UTF-8 encoded
    /// string representations.
    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self>;

    /// Decode from binary format bytes.
    ///
    /// Binary format uses PostgreSQL's internal representation. Integers are
    /// big-endian, floats are IEEE 754, etc.
    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self>;

    /// Decode a possibly-NULL value in the given format.
    fn from_wire(oid: Oid, format: FormatCode, bytes: Option<&'a [u8]>) -> Result<Self> {
        match (bytes, format) {
            (None, _) => Self::from_null(),
            (Some(bytes), FormatCode::Text) => Self::from_text(oid, bytes),
            (Some(bytes), FormatCode::Binary) => Self::from_binary(oid, bytes),
        }
    }
}

/// Trait for encoding Rust values as PostgreSQL values.
///
/// `to_text` and `to_binary` write the bare payload. `encode` frames it the
/// way parameters and array/record elements are framed on the wire:
/// - Int32 length followed by the payload, OR
/// - Int32 -1 for NULL
pub trait ToWireValue {
    /// The OID this value naturally encodes to.
    ///
    /// For example, i64 naturally encodes to INT8 (OID 20).
    fn natural_oid(&self) -> Oid;

    /// Whether this value is SQL NULL.
    fn is_null(&self) -> bool {
        false
    }

    /// Write the text payload for the given target OID.
    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()>;

    /// Write the binary payload for the given target OID.
    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()>;

    /// Write the payload in the given format.
    fn encode_payload(&self, target_oid: Oid, format: FormatCode, buf: &mut Vec<u8>) -> Result<()> {
        match format {
            FormatCode::Text => self.to_text(target_oid, buf),
            FormatCode::Binary => self.to_binary(target_oid, buf),
        }
    }

    /// Write a length-prefixed value, `-1` for NULL.
    ///
    /// On error the buffer is restored to its previous length.
    fn encode(&self, target_oid: Oid, format: FormatCode, buf: &mut Vec<u8>) -> Result<()> {
        if self.is_null() {
            write_null(buf);
            return Ok(());
        }
        let start = buf.len();
        let mut frame = FrameBuilder::new(buf);
        let result = self
            .encode_payload(target_oid, format, frame.buf())
            .and_then(|()| frame.finish());
        if result.is_err() {
            buf.truncate(start);
        }
        result
    }
}

/// Validate UTF-8 text.
pub(crate) fn utf8<'a>(bytes: &'a [u8], type_name: &'static str) -> Result<&'a str> {
    simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::malformed(type_name, format!("invalid UTF-8: {}", e)))
}

// === Option<T> - NULL handling ===

impl<'a, T: FromWireValue<'a>> FromWireValue<'a> for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_text(oid, bytes).map(Some)
    }

    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_binary(oid, bytes).map(Some)
    }
}

impl<T: ToWireValue> ToWireValue for Option<T> {
    fn natural_oid(&self) -> Oid {
        match self {
            Some(v) => v.natural_oid(),
            None => 0, // Unknown/NULL
        }
    }

    fn is_null(&self) -> bool {
        self.as_ref().is_none_or(T::is_null)
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(v) => v.to_text(target_oid, buf),
            None => Err(Error::UnexpectedNull),
        }
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(v) => v.to_binary(target_oid, buf),
            None => Err(Error::UnexpectedNull),
        }
    }
}

// === Nullable<T> - NULL without Option ===

impl<'a, T: FromWireValue<'a> + Default> FromWireValue<'a> for Nullable<T> {
    fn from_null() -> Result<Self> {
        Ok(Nullable::null())
    }

    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_text(oid, bytes).map(Nullable::new)
    }

    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        T::from_binary(oid, bytes).map(Nullable::new)
    }
}

impl<T: ToWireValue> ToWireValue for Nullable<T> {
    fn natural_oid(&self) -> Oid {
        self.value.natural_oid()
    }

    // The payload of an invalid value is never looked at.
    fn is_null(&self) -> bool {
        !self.valid || self.value.is_null()
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if !self.valid {
            return Err(Error::UnexpectedNull);
        }
        self.value.to_text(target_oid, buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if !self.valid {
            return Err(Error::UnexpectedNull);
        }
        self.value.to_binary(target_oid, buf)
    }
}

// === Reference support ===

impl<T: ToWireValue + ?Sized> ToWireValue for &T {
    fn natural_oid(&self) -> Oid {
        (*self).natural_oid()
    }

    fn is_null(&self) -> bool {
        (*self).is_null()
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        (*self).to_text(target_oid, buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        (*self).to_binary(target_oid, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::oid;

    #[test]
    fn test_option_null() {
        assert_eq!(Option::<i32>::from_null().unwrap(), None);
    }

    #[test]
    fn test_nullable_null() {
        let n = Nullable::<i64>::from_wire(oid::INT8, FormatCode::Binary, None).unwrap();
        assert!(n.is_null());
    }

    #[test]
    fn test_invalid_nullable_ignores_payload() {
        // Garbage payload, still NULL on the wire
        let n = Nullable {
            value: 12345_i32,
            valid: false,
        };
        for format in [FormatCode::Text, FormatCode::Binary] {
            let mut buf = Vec::new();
            n.encode(oid::INT4, format, &mut buf).unwrap();
            assert_eq!(buf, (-1_i32).to_be_bytes());
        }
    }

    #[test]
    fn test_encode_restores_buffer_on_error() {
        let mut buf = vec![1, 2];
        assert!(300_i32.encode(oid::BOOL, FormatCode::Binary, &mut buf).is_err());
        assert_eq!(buf, [1, 2]);
    }

    #[test]
    fn test_encode_framed() {
        let mut buf = Vec::new();
        7_i16.encode(oid::INT2, FormatCode::Text, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 1, b'7']);
    }
}
