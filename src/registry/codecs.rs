//! Codec implementations backing the built-in types.

use std::fmt;
use std::marker::PhantomData;

use crate::array::{decode_array, encode_array};
use crate::composite::geometric::{PgBox, Vec2};
use crate::conversion::{
    FromWireValue, ToWireValue, numeric_to_string, parse_numeric_text, utf8,
};
use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};
use crate::value::{NativeType, Value, ValueKind};

use super::{Codec, TypeRegistry};

/// Codec for a native type implementing the static wire traits.
///
/// `wire_oid` is the built-in OID the native type understands, so the codec
/// can also be registered for domains and aliases of that type.
pub struct ScalarCodec<T> {
    name: String,
    wire_oid: Oid,
    delimiter: u8,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ScalarCodec<T> {
    pub fn new(name: impl Into<String>, wire_oid: Oid) -> Self {
        Self {
            name: name.into(),
            wire_oid,
            delimiter: oid::delimiter_of(wire_oid),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ScalarCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec")
            .field("name", &self.name)
            .field("wire_oid", &self.wire_oid)
            .field("native", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Codec for ScalarCodec<T>
where
    T: for<'a> FromWireValue<'a> + NativeType,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn decode(
        &self,
        _registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value> {
        T::from_wire(self.wire_oid, format, Some(bytes)).map(T::into_value)
    }

    fn encode(
        &self,
        _registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        value.encode_payload(self.wire_oid, format, buf)
    }
}

/// NUMERIC, carried as its decimal text.
#[derive(Debug, Default)]
pub struct NumericCodec;

impl Codec for NumericCodec {
    fn name(&self) -> &str {
        "numeric"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Numeric
    }

    fn decode(
        &self,
        _registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value> {
        let text = match format {
            FormatCode::Text => {
                let text = utf8(bytes, "numeric")?.trim();
                parse_numeric_text(text)?;
                text.to_owned()
            }
            FormatCode::Binary => numeric_to_string(bytes)?,
        };
        Ok(Value::Numeric(text))
    }

    fn encode(
        &self,
        _registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        value.encode_payload(oid::NUMERIC, format, buf)
    }
}

/// Codec for types handled only through their text literal.
///
/// Decodes to [`Value::Text`]; the binary format is `UnsupportedFormat`.
#[derive(Debug)]
pub struct TextLiteralCodec {
    name: String,
}

impl TextLiteralCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Codec for TextLiteralCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn supports(&self, format: FormatCode) -> bool {
        format == FormatCode::Text
    }

    fn decode(
        &self,
        _registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value> {
        match format {
            FormatCode::Text => Ok(Value::Text(utf8(bytes, "text")?.to_owned())),
            FormatCode::Binary => Err(Error::unsupported(self.name.as_str(), format)),
        }
    }

    fn encode(
        &self,
        _registry: &TypeRegistry,
        oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        if format == FormatCode::Binary {
            return Err(Error::unsupported(self.name.as_str(), format));
        }
        match value {
            Value::Text(text) => {
                buf.extend_from_slice(text.as_bytes());
                Ok(())
            }
            Value::Raw {
                format: FormatCode::Text,
                bytes,
            } => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            other => Err(Error::type_mismatch(format!("{:?}", other.kind()), oid)),
        }
    }
}

/// Codec for an array type, delegating elements to the element type's codec.
#[derive(Debug)]
pub struct ArrayCodec {
    name: String,
    element_oid: Oid,
}

impl ArrayCodec {
    pub fn new(name: impl Into<String>, element_oid: Oid) -> Self {
        Self {
            name: name.into(),
            element_oid,
        }
    }
}

impl Codec for ArrayCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Array
    }

    fn decode(
        &self,
        registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value> {
        decode_array::<Value>(registry, self.element_oid, format, bytes).map(Value::Array)
    }

    fn encode(
        &self,
        registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        match value {
            Value::Array(array) => encode_array(registry, self.element_oid, format, array, buf),
            other => Err(Error::ElementCodecMismatch {
                expected: ValueKind::Array,
                found: other.kind(),
            }),
        }
    }
}

fn scalar<T>(registry: &mut TypeRegistry, oid: Oid, name: &str)
where
    T: for<'a> FromWireValue<'a> + NativeType + 'static,
{
    registry.register(oid, name, std::sync::Arc::new(ScalarCodec::<T>::new(name, oid)));
}

fn text_literal(registry: &mut TypeRegistry, oid: Oid, name: &str) {
    registry.register(oid, name, std::sync::Arc::new(TextLiteralCodec::new(name)));
}

/// Register every built-in scalar and the array type of each.
pub(super) fn register_builtins(registry: &mut TypeRegistry) {
    scalar::<bool>(registry, oid::BOOL, "bool");
    scalar::<Vec<u8>>(registry, oid::BYTEA, "bytea");
    scalar::<String>(registry, oid::CHAR, "char");
    scalar::<String>(registry, oid::NAME, "name");
    scalar::<i64>(registry, oid::INT8, "int8");
    scalar::<i16>(registry, oid::INT2, "int2");
    scalar::<i32>(registry, oid::INT4, "int4");
    scalar::<String>(registry, oid::TEXT, "text");
    scalar::<String>(registry, oid::JSON, "json");
    scalar::<String>(registry, oid::XML, "xml");
    scalar::<Vec2>(registry, oid::POINT, "point");
    scalar::<PgBox>(registry, oid::BOX, "box");
    scalar::<f32>(registry, oid::FLOAT4, "float4");
    scalar::<f64>(registry, oid::FLOAT8, "float8");
    scalar::<String>(registry, oid::UNKNOWN, "unknown");
    scalar::<String>(registry, oid::BPCHAR, "bpchar");
    scalar::<String>(registry, oid::VARCHAR, "varchar");
    scalar::<String>(registry, oid::JSONB, "jsonb");
    registry.register(oid::NUMERIC, "numeric", std::sync::Arc::new(NumericCodec));

    #[cfg(feature = "with-uuid")]
    scalar::<uuid::Uuid>(registry, oid::UUID, "uuid");
    #[cfg(feature = "with-time")]
    {
        scalar::<time::Date>(registry, oid::DATE, "date");
        scalar::<time::Time>(registry, oid::TIME, "time");
        scalar::<time::PrimitiveDateTime>(registry, oid::TIMESTAMP, "timestamp");
        scalar::<time::OffsetDateTime>(registry, oid::TIMESTAMPTZ, "timestamptz");
    }

    if registry.opts().text_fallback {
        for (oid, name) in [
            (oid::OID, "oid"),
            (oid::CIDR, "cidr"),
            (oid::MONEY, "money"),
            (oid::MACADDR, "macaddr"),
            (oid::INET, "inet"),
            (oid::INTERVAL, "interval"),
            (oid::TIMETZ, "timetz"),
        ] {
            text_literal(registry, oid, name);
        }
        #[cfg(not(feature = "with-uuid"))]
        text_literal(registry, oid::UUID, "uuid");
        #[cfg(not(feature = "with-time"))]
        for (oid, name) in [
            (oid::DATE, "date"),
            (oid::TIME, "time"),
            (oid::TIMESTAMP, "timestamp"),
            (oid::TIMESTAMPTZ, "timestamptz"),
        ] {
            text_literal(registry, oid, name);
        }
    }

    for &(array_oid, element_oid) in oid::ARRAY_TYPES {
        if let Some(element) = registry.entry(element_oid) {
            let name = format!("_{}", element.name);
            registry.register_array(array_oid, name, element_oid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_codec_for_domain() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(
            50_000,
            "positive_int",
            std::sync::Arc::new(ScalarCodec::<i32>::new("positive_int", oid::INT4)),
        );
        let value = registry
            .decode(50_000, FormatCode::Binary, Some(&5_i32.to_be_bytes()))
            .unwrap();
        assert_eq!(value, Value::Int4(5));
    }

    #[test]
    fn test_numeric_codec() {
        let registry = TypeRegistry::with_builtins();
        let value = registry
            .decode(oid::NUMERIC, FormatCode::Text, Some(b"123.4500"))
            .unwrap();
        assert_eq!(value, Value::Numeric("123.4500".into()));
        let mut buf = Vec::new();
        registry
            .encode_payload(&value, oid::NUMERIC, FormatCode::Binary, &mut buf)
            .unwrap();
        let back = registry
            .decode(oid::NUMERIC, FormatCode::Binary, Some(&buf))
            .unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_numeric_codec_rejects_malformed_text() {
        let registry = TypeRegistry::with_builtins();
        for text in ["not a number", "1.2.3", ""] {
            assert!(
                matches!(
                    registry.decode(oid::NUMERIC, FormatCode::Text, Some(text.as_bytes())),
                    Err(Error::MalformedLiteral { .. })
                ),
                "{text}"
            );
        }
        let mut buf = Vec::new();
        assert!(matches!(
            registry.encode_payload(
                &Value::Numeric("not a number".into()),
                oid::NUMERIC,
                FormatCode::Text,
                &mut buf
            ),
            Err(Error::MalformedLiteral { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_text_literal_codec() {
        let registry = TypeRegistry::with_builtins();
        let value = registry
            .decode(oid::INTERVAL, FormatCode::Text, Some(b"1 day"))
            .unwrap();
        assert_eq!(value, Value::Text("1 day".into()));
        assert!(matches!(
            registry.decode(oid::INTERVAL, FormatCode::Binary, Some(&[0; 16])),
            Err(Error::UnsupportedFormat { .. })
        ));
        let mut buf = Vec::new();
        assert!(matches!(
            registry.encode_payload(&value, oid::INTERVAL, FormatCode::Binary, &mut buf),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_array_codec_rejects_scalar() {
        let registry = TypeRegistry::with_builtins();
        let mut buf = Vec::new();
        assert_eq!(
            registry
                .encode_payload(&Value::Int4(1), oid::INT4_ARRAY, FormatCode::Text, &mut buf)
                .unwrap_err(),
            Error::ElementCodecMismatch {
                expected: ValueKind::Array,
                found: ValueKind::Int4,
            }
        );
    }

    #[test]
    fn test_builtin_array_names() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.oid_by_name("_int4"), Some(oid::INT4_ARRAY));
        assert_eq!(registry.oid_by_name("_box"), Some(oid::BOX_ARRAY));
        assert_eq!(registry.lookup(oid::BOX_ARRAY).unwrap().kind(), ValueKind::Array);
    }
}
