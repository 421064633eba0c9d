//! Dynamically typed values and the bridge to native Rust types.
//!
//! Codecs resolved at run time through the [`TypeRegistry`](crate::TypeRegistry)
//! produce a [`Value`]. [`NativeType`] converts between a `Value` and a
//! statically known Rust type and declares which value kinds it can hold,
//! which is how generic containers check a resolved codec before using it.

use crate::array::Array;
use crate::composite::geometric::{PgBox, Vec2};
use crate::composite::record::Composite;
use crate::conversion::{FromWireValue, ToWireValue};
use crate::error::{Error, Result};
use crate::nullable::Nullable;
use crate::protocol::types::{FormatCode, Oid, oid};

/// Raw value of one column or field as received from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireValue<'a> {
    /// Type OID of the value
    pub oid: Oid,
    /// Format the bytes are in
    pub format: FormatCode,
    /// Payload, `None` for SQL NULL
    pub bytes: Option<&'a [u8]>,
}

impl<'a> WireValue<'a> {
    pub fn new(oid: Oid, format: FormatCode, bytes: Option<&'a [u8]>) -> Self {
        Self { oid, format, bytes }
    }

    /// Decode into a native type.
    pub fn decode<T: FromWireValue<'a>>(&self) -> Result<T> {
        T::from_wire(self.oid, self.format, self.bytes)
    }
}

/// Kind of a [`Value`], without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Matches every kind; reported by containers of [`Value`]
    Any,
    Null,
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Bytea,
    Uuid,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Point,
    Box,
    Array,
    Composite,
    Raw,
}

/// A decoded value of any registered type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    /// NUMERIC in its canonical decimal text form
    Numeric(String),
    Text(String),
    Bytea(Vec<u8>),
    #[cfg(feature = "with-uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "with-time")]
    Date(time::Date),
    #[cfg(feature = "with-time")]
    Time(time::Time),
    #[cfg(feature = "with-time")]
    Timestamp(time::PrimitiveDateTime),
    #[cfg(feature = "with-time")]
    Timestamptz(time::OffsetDateTime),
    Point(Vec2),
    Box(PgBox),
    Array(Array<Value>),
    Composite(Composite),
    /// Uninterpreted bytes of a type without a registered codec
    Raw { format: FormatCode, bytes: Vec<u8> },
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int2(_) => ValueKind::Int2,
            Value::Int4(_) => ValueKind::Int4,
            Value::Int8(_) => ValueKind::Int8,
            Value::Float4(_) => ValueKind::Float4,
            Value::Float8(_) => ValueKind::Float8,
            Value::Numeric(_) => ValueKind::Numeric,
            Value::Text(_) => ValueKind::Text,
            Value::Bytea(_) => ValueKind::Bytea,
            #[cfg(feature = "with-uuid")]
            Value::Uuid(_) => ValueKind::Uuid,
            #[cfg(feature = "with-time")]
            Value::Date(_) => ValueKind::Date,
            #[cfg(feature = "with-time")]
            Value::Time(_) => ValueKind::Time,
            #[cfg(feature = "with-time")]
            Value::Timestamp(_) => ValueKind::Timestamp,
            #[cfg(feature = "with-time")]
            Value::Timestamptz(_) => ValueKind::Timestamptz,
            Value::Point(_) => ValueKind::Point,
            Value::Box(_) => ValueKind::Box,
            Value::Array(_) => ValueKind::Array,
            Value::Composite(_) => ValueKind::Composite,
            Value::Raw { .. } => ValueKind::Raw,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The natural OID, falling back to `unknown` for NULL and raw values.
    pub fn type_oid(&self) -> Oid {
        match self.natural_oid() {
            0 => oid::UNKNOWN,
            other => other,
        }
    }
}

/// Conversion between a native Rust type and [`Value`].
pub trait NativeType: Sized {
    /// The kind this type converts to.
    const KIND: ValueKind;

    /// Whether a codec producing `kind` can be decoded into this type.
    fn accepts(kind: ValueKind) -> bool {
        kind == Self::KIND
    }

    /// Convert from a decoded value.
    ///
    /// Fails with `ElementCodecMismatch` when the kind is not accepted and
    /// `UnexpectedNull` for a NULL into a non-nullable type.
    fn from_value(value: Value) -> Result<Self>;

    /// Convert into a value.
    fn into_value(self) -> Value;
}

/// Error for a value that `T` does not accept.
pub(crate) fn kind_mismatch<T: NativeType>(value: &Value) -> Error {
    match value {
        Value::Null => Error::UnexpectedNull,
        other => Error::ElementCodecMismatch {
            expected: T::KIND,
            found: other.kind(),
        },
    }
}

impl NativeType for Value {
    const KIND: ValueKind = ValueKind::Any;

    fn accepts(_kind: ValueKind) -> bool {
        true
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }

    fn into_value(self) -> Value {
        self
    }
}

impl<T: NativeType + Default> NativeType for Nullable<T> {
    const KIND: ValueKind = T::KIND;

    fn accepts(kind: ValueKind) -> bool {
        kind == ValueKind::Null || T::accepts(kind)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Nullable::null()),
            other => T::from_value(other).map(Nullable::new),
        }
    }

    fn into_value(self) -> Value {
        if self.valid {
            self.value.into_value()
        } else {
            Value::Null
        }
    }
}

impl<T: NativeType> NativeType for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn accepts(kind: ValueKind) -> bool {
        kind == ValueKind::Null || T::accepts(kind)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }
}

// Apply an expression to the payload of every non-NULL, non-raw variant.
macro_rules! with_payload {
    ($value:expr, $v:ident => $body:expr, $null:expr, $raw:pat => $raw_body:expr) => {
        match $value {
            Value::Null => $null,
            Value::Bool($v) => $body,
            Value::Int2($v) => $body,
            Value::Int4($v) => $body,
            Value::Int8($v) => $body,
            Value::Float4($v) => $body,
            Value::Float8($v) => $body,
            Value::Numeric(text) => {
                let $v = &crate::conversion::NumericText(text.as_str());
                $body
            }
            Value::Text($v) => $body,
            Value::Bytea($v) => $body,
            #[cfg(feature = "with-uuid")]
            Value::Uuid($v) => $body,
            #[cfg(feature = "with-time")]
            Value::Date($v) => $body,
            #[cfg(feature = "with-time")]
            Value::Time($v) => $body,
            #[cfg(feature = "with-time")]
            Value::Timestamp($v) => $body,
            #[cfg(feature = "with-time")]
            Value::Timestamptz($v) => $body,
            Value::Point($v) => $body,
            Value::Box($v) => $body,
            Value::Array($v) => $body,
            Value::Composite($v) => $body,
            $raw => $raw_body,
        }
    };
}

impl ToWireValue for Value {
    fn natural_oid(&self) -> Oid {
        with_payload!(self, v => v.natural_oid(), 0, Value::Raw { .. } => 0)
    }

    fn is_null(&self) -> bool {
        Value::is_null(self)
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        with_payload!(
            self,
            v => v.to_text(target_oid, buf),
            Err(Error::UnexpectedNull),
            Value::Raw { format, bytes } => write_raw(*format, FormatCode::Text, bytes, buf)
        )
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        with_payload!(
            self,
            v => v.to_binary(target_oid, buf),
            Err(Error::UnexpectedNull),
            Value::Raw { format, bytes } => write_raw(*format, FormatCode::Binary, bytes, buf)
        )
    }
}

fn write_raw(have: FormatCode, want: FormatCode, bytes: &[u8], buf: &mut Vec<u8>) -> Result<()> {
    if have != want {
        return Err(Error::unsupported("raw value", want));
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int4(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int8(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float8(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_from_value() {
        let n = Nullable::<i32>::from_value(Value::Null).unwrap();
        assert!(n.is_null());
        let n = Nullable::<i32>::from_value(Value::Int4(7)).unwrap();
        assert_eq!(n, Nullable::new(7));
    }

    #[test]
    fn test_kind_mismatch() {
        assert_eq!(
            i32::from_value(Value::Text("x".into())).unwrap_err(),
            Error::ElementCodecMismatch {
                expected: ValueKind::Int4,
                found: ValueKind::Text,
            }
        );
        assert_eq!(i32::from_value(Value::Null).unwrap_err(), Error::UnexpectedNull);
    }

    #[test]
    fn test_value_natural_oid() {
        assert_eq!(Value::Int4(1).natural_oid(), oid::INT4);
        assert_eq!(Value::Text("a".into()).natural_oid(), oid::TEXT);
        assert_eq!(Value::Null.type_oid(), oid::UNKNOWN);
    }

    #[test]
    fn test_raw_passthrough() {
        let raw = Value::Raw {
            format: FormatCode::Binary,
            bytes: vec![1, 2, 3],
        };
        let mut buf = Vec::new();
        raw.to_binary(12345, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert!(matches!(
            raw.to_text(12345, &mut Vec::new()),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_null_encodes_as_null_marker() {
        let mut buf = Vec::new();
        Value::Null.encode(oid::INT4, FormatCode::Binary, &mut buf).unwrap();
        assert_eq!(buf, (-1_i32).to_be_bytes());
    }
}
