//! Type registry: resolves type OIDs to codecs at run time.
//!
//! Built-in types are registered up front. Types whose OIDs are only known
//! once connected (extensions, user-defined records, their arrays) are
//! registered explicitly or resolved by name through a [`TypeCatalog`].
//!
//! The registry is populated before use and only read afterwards; share it
//! behind an `Arc` for concurrent decoding.

mod codecs;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use codecs::{ArrayCodec, NumericCodec, ScalarCodec, TextLiteralCodec};

use crate::composite::record::CompositeCodec;
use crate::error::{Error, Result};
use crate::opts::{NumericFormat, Opts, UnknownTypes};
use crate::protocol::codec::{FrameBuilder, write_null};
use crate::protocol::types::{FormatCode, Oid, oid};
use crate::value::{NativeType, Value, ValueKind, WireValue};

/// Encoder/decoder for one database type, resolved at run time.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Type name for diagnostics.
    fn name(&self) -> &str;

    /// Kind of value `decode` produces.
    fn kind(&self) -> ValueKind;

    /// Whether the codec implements `format`.
    fn supports(&self, format: FormatCode) -> bool {
        let _ = format;
        true
    }

    /// Element delimiter when this type appears in a text array.
    fn delimiter(&self) -> u8 {
        b','
    }

    /// Decode a non-NULL payload.
    ///
    /// The registry is passed so container codecs can resolve the codecs of
    /// their elements or fields.
    fn decode(
        &self,
        registry: &TypeRegistry,
        oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value>;

    /// Write the payload of a non-NULL value, without length prefix.
    fn encode(
        &self,
        registry: &TypeRegistry,
        oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()>;
}

/// A registered type.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub oid: Oid,
    pub name: String,
    pub codec: Arc<dyn Codec>,
    /// Element type of an array type
    pub element_oid: Option<Oid>,
}

/// Resolves type names to OIDs, typically by querying `pg_type`.
pub trait TypeCatalog {
    fn resolve(&self, name: &str) -> Option<Oid>;
}

impl TypeCatalog for HashMap<String, Oid> {
    fn resolve(&self, name: &str) -> Option<Oid> {
        self.get(name).copied()
    }
}

/// Map from type OID to codec.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: HashMap<Oid, TypeEntry>,
    names: HashMap<String, Oid>,
    opts: Opts,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new(opts: Opts) -> Self {
        Self {
            entries: HashMap::new(),
            names: HashMap::new(),
            opts,
        }
    }

    /// A registry with every built-in type and default options.
    pub fn with_builtins() -> Self {
        Self::from_opts(Opts::default())
    }

    /// A registry with every built-in type.
    pub fn from_opts(opts: Opts) -> Self {
        let mut registry = Self::new(opts);
        codecs::register_builtins(&mut registry);
        registry
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Bind `oid` to `codec`. A later registration for the same OID replaces
    /// the earlier one.
    pub fn register(&mut self, oid: Oid, name: impl Into<String>, codec: Arc<dyn Codec>) {
        self.insert(TypeEntry {
            oid,
            name: name.into(),
            codec,
            element_oid: None,
        });
    }

    /// Register an array type over an element type.
    ///
    /// The element type does not have to be registered yet; it is resolved
    /// when a value is decoded.
    pub fn register_array(&mut self, array_oid: Oid, name: impl Into<String>, element_oid: Oid) {
        let name = name.into();
        self.insert(TypeEntry {
            oid: array_oid,
            codec: Arc::new(ArrayCodec::new(name.clone(), element_oid)),
            name,
            element_oid: Some(element_oid),
        });
    }

    /// Register a user-defined composite type with its fields in order.
    pub fn register_composite(
        &mut self,
        oid: Oid,
        name: impl Into<String>,
        fields: Vec<(String, Oid)>,
    ) {
        let name = name.into();
        let codec = Arc::new(CompositeCodec::new(name.clone(), oid, fields));
        self.register(oid, name, codec);
    }

    /// Register `codec` under the OID the catalog reports for `name`.
    ///
    /// A name the catalog does not know is skipped and `None` returned.
    pub fn register_from_catalog(
        &mut self,
        catalog: &dyn TypeCatalog,
        name: &str,
        codec: Arc<dyn Codec>,
    ) -> Option<Oid> {
        let Some(oid) = catalog.resolve(name) else {
            tracing::debug!(name, "type not found in catalog, skipping");
            return None;
        };
        self.register(oid, name, codec);
        Some(oid)
    }

    fn insert(&mut self, entry: TypeEntry) {
        let replaced = self.entries.get(&entry.oid).map(|old| old.name.clone());
        match replaced {
            Some(old_name) => {
                tracing::debug!(
                    oid = entry.oid,
                    old = %old_name,
                    new = %entry.name,
                    "replacing type registration"
                );
                // The old name may since have been taken by another OID
                if old_name != entry.name && self.names.get(&old_name) == Some(&entry.oid) {
                    self.names.remove(&old_name);
                }
            }
            None => tracing::debug!(oid = entry.oid, name = %entry.name, "registering type"),
        }
        self.names.insert(entry.name.clone(), entry.oid);
        self.entries.insert(entry.oid, entry);
    }

    /// The codec registered for `oid`.
    pub fn lookup(&self, oid: Oid) -> Result<&Arc<dyn Codec>> {
        self.entries
            .get(&oid)
            .map(|entry| &entry.codec)
            .ok_or(Error::UnknownType(oid))
    }

    pub fn entry(&self, oid: Oid) -> Option<&TypeEntry> {
        self.entries.get(&oid)
    }

    pub fn oid_by_name(&self, name: &str) -> Option<Oid> {
        self.names.get(name).copied()
    }

    /// Element OID and codec of an array type.
    pub fn lookup_element(&self, array_oid: Oid) -> Result<(Oid, &Arc<dyn Codec>)> {
        let entry = self
            .entries
            .get(&array_oid)
            .ok_or(Error::UnknownType(array_oid))?;
        let element_oid = entry
            .element_oid
            .ok_or_else(|| Error::type_mismatch("array", array_oid))?;
        Ok((element_oid, self.lookup(element_oid)?))
    }

    /// Decode a possibly-NULL value of type `oid`.
    pub fn decode(&self, oid: Oid, format: FormatCode, bytes: Option<&[u8]>) -> Result<Value> {
        let codec = self.lookup(oid)?;
        match bytes {
            None => Ok(Value::Null),
            Some(bytes) => codec.decode(self, oid, format, bytes),
        }
    }

    /// Like [`decode`](Self::decode), but an unregistered type yields
    /// [`Value::Raw`] holding the bytes as received.
    pub fn decode_or_raw(
        &self,
        oid: Oid,
        format: FormatCode,
        bytes: Option<&[u8]>,
    ) -> Result<Value> {
        match self.decode(oid, format, bytes) {
            Err(err) if err.is_recoverable() => Ok(match bytes {
                None => Value::Null,
                Some(bytes) => Value::Raw {
                    format,
                    bytes: bytes.to_vec(),
                },
            }),
            other => other,
        }
    }

    /// Decode a column, treating unregistered types per [`Opts::unknown_types`].
    pub fn decode_wire(&self, wire: &WireValue<'_>) -> Result<Value> {
        match self.opts.unknown_types {
            UnknownTypes::Raw => self.decode_or_raw(wire.oid, wire.format, wire.bytes),
            UnknownTypes::Error => self.decode(wire.oid, wire.format, wire.bytes),
        }
    }

    /// Decode into a native type.
    ///
    /// The codec resolved for `oid` must produce a kind `T` accepts, checked
    /// before decoding.
    pub fn decode_as<T: NativeType>(
        &self,
        oid: Oid,
        format: FormatCode,
        bytes: Option<&[u8]>,
    ) -> Result<T> {
        let codec = self.lookup(oid)?;
        check_kind::<T>(codec.kind())?;
        T::from_value(self.decode(oid, format, bytes)?)
    }

    /// Write a length-prefixed value, `-1` for NULL.
    pub fn encode(
        &self,
        value: &Value,
        oid: Oid,
        format: FormatCode,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        if value.is_null() {
            self.lookup(oid)?;
            write_null(buf);
            return Ok(());
        }
        let start = buf.len();
        let mut frame = FrameBuilder::new(buf);
        let result = self
            .encode_payload(value, oid, format, frame.buf())
            .and_then(|()| frame.finish());
        if result.is_err() {
            buf.truncate(start);
        }
        result
    }

    /// Write the payload of a non-NULL value.
    pub fn encode_payload(
        &self,
        value: &Value,
        oid: Oid,
        format: FormatCode,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let codec = self.lookup(oid)?;
        if value.is_null() {
            return Err(Error::UnexpectedNull);
        }
        codec.encode(self, oid, format, value, buf)
    }

    /// Format to request for parameters and results of type `oid`.
    ///
    /// Binary when the codec implements it, except NUMERIC which follows
    /// [`Opts::numeric_format`]. Unregistered types use text.
    pub fn preferred_format(&self, oid: Oid) -> FormatCode {
        if oid == oid::NUMERIC && self.opts.numeric_format == NumericFormat::Text {
            return FormatCode::Text;
        }
        match self.lookup(oid) {
            Ok(codec) if codec.supports(FormatCode::Binary) => FormatCode::Binary,
            _ => FormatCode::Text,
        }
    }
}

/// Fail with `ElementCodecMismatch` unless `T` accepts values of `kind`.
pub(crate) fn check_kind<T: NativeType>(kind: ValueKind) -> Result<()> {
    if T::accepts(kind) {
        Ok(())
    } else {
        Err(Error::ElementCodecMismatch {
            expected: T::KIND,
            found: kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::geometric::{PgBox, Vec2};

    #[test]
    fn test_lookup_unknown() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(
            registry.lookup(999_999).unwrap_err(),
            Error::UnknownType(999_999)
        );
    }

    #[test]
    fn test_builtins_resolve() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.lookup(oid::INT4).unwrap().kind(), ValueKind::Int4);
        assert_eq!(registry.lookup(oid::BOX).unwrap().delimiter(), b';');
        assert_eq!(registry.oid_by_name("box"), Some(oid::BOX));
        let (element_oid, codec) = registry.lookup_element(oid::TEXT_ARRAY).unwrap();
        assert_eq!(element_oid, oid::TEXT);
        assert_eq!(codec.kind(), ValueKind::Text);
    }

    #[test]
    fn test_lookup_element_of_scalar() {
        let registry = TypeRegistry::with_builtins();
        assert!(matches!(
            registry.lookup_element(oid::INT4),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(90_001, "thing", Arc::new(TextLiteralCodec::new("thing")));
        assert_eq!(registry.lookup(90_001).unwrap().kind(), ValueKind::Text);
        registry.register(
            90_001,
            "thing2",
            Arc::new(ScalarCodec::<i64>::new("thing2", oid::INT8)),
        );
        assert_eq!(registry.lookup(90_001).unwrap().kind(), ValueKind::Int8);
        assert_eq!(registry.oid_by_name("thing"), None);
        assert_eq!(registry.oid_by_name("thing2"), Some(90_001));
    }

    #[test]
    fn test_rename_keeps_name_taken_by_other_oid() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(90_001, "thing", Arc::new(TextLiteralCodec::new("thing")));
        registry.register(90_002, "thing", Arc::new(TextLiteralCodec::new("thing")));
        registry.register(90_001, "other", Arc::new(TextLiteralCodec::new("other")));
        assert_eq!(registry.oid_by_name("thing"), Some(90_002));
        assert_eq!(registry.oid_by_name("other"), Some(90_001));
    }

    #[test]
    fn test_register_from_catalog() {
        let catalog: HashMap<String, Oid> = [("hstore".to_string(), 16_400)].into_iter().collect();
        let mut registry = TypeRegistry::with_builtins();
        let codec: Arc<dyn Codec> = Arc::new(TextLiteralCodec::new("hstore"));
        assert_eq!(
            registry.register_from_catalog(&catalog, "hstore", codec.clone()),
            Some(16_400)
        );
        assert_eq!(registry.register_from_catalog(&catalog, "ltree", codec), None);
        assert!(registry.lookup(16_400).is_ok());
    }

    #[test]
    fn test_decode_null_and_raw() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(
            registry.decode(oid::INT4, FormatCode::Binary, None).unwrap(),
            Value::Null
        );
        assert_eq!(
            registry
                .decode_or_raw(77_777, FormatCode::Binary, Some(&[1, 2]))
                .unwrap(),
            Value::Raw {
                format: FormatCode::Binary,
                bytes: vec![1, 2],
            }
        );
        assert!(matches!(
            registry.decode(77_777, FormatCode::Binary, Some(&[1, 2])),
            Err(Error::UnknownType(77_777))
        ));
    }

    #[test]
    fn test_decode_wire_follows_opts() {
        let wire = WireValue::new(77_777, FormatCode::Text, Some(b"x"));
        let raw = TypeRegistry::with_builtins();
        assert!(matches!(raw.decode_wire(&wire).unwrap(), Value::Raw { .. }));
        let strict = TypeRegistry::from_opts(Opts {
            unknown_types: UnknownTypes::Error,
            ..Opts::default()
        });
        assert!(strict.decode_wire(&wire).is_err());
    }

    #[test]
    fn test_decode_as_checks_kind_first() {
        let registry = TypeRegistry::with_builtins();
        // The payload is never looked at
        assert_eq!(
            registry
                .decode_as::<i32>(oid::TEXT, FormatCode::Binary, Some(&[0xFF]))
                .unwrap_err(),
            Error::ElementCodecMismatch {
                expected: ValueKind::Int4,
                found: ValueKind::Text,
            }
        );
        let n: i64 = registry
            .decode_as(oid::INT2, FormatCode::Text, Some(b"12"))
            .unwrap();
        assert_eq!(n, 12);
    }

    #[test]
    fn test_encode_framed_and_null() {
        let registry = TypeRegistry::with_builtins();
        let mut buf = Vec::new();
        registry
            .encode(&Value::Int4(1), oid::INT4, FormatCode::Binary, &mut buf)
            .unwrap();
        registry
            .encode(&Value::Null, oid::INT4, FormatCode::Binary, &mut buf)
            .unwrap();
        assert_eq!(buf, [0, 0, 0, 4, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_error_restores_buffer() {
        let registry = TypeRegistry::with_builtins();
        let mut buf = vec![7];
        assert!(
            registry
                .encode(&Value::Text("x".into()), oid::INT4, FormatCode::Binary, &mut buf)
                .is_err()
        );
        assert_eq!(buf, [7]);
    }

    #[test]
    fn test_box_through_registry() {
        let registry = TypeRegistry::with_builtins();
        let value = registry
            .decode(oid::BOX, FormatCode::Text, Some(b"3.14, 1.678, 7.1, 5.234"))
            .unwrap();
        let expected = PgBox {
            p: [Vec2::new(7.1, 5.234), Vec2::new(3.14, 1.678)],
        };
        assert_eq!(value, Value::Box(expected));
        let mut buf = Vec::new();
        registry
            .encode_payload(&value, oid::BOX, FormatCode::Binary, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn test_preferred_format() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.preferred_format(oid::INT4), FormatCode::Binary);
        assert_eq!(registry.preferred_format(oid::NUMERIC), FormatCode::Text);
        assert_eq!(registry.preferred_format(oid::INTERVAL), FormatCode::Text);
        assert_eq!(registry.preferred_format(123_456), FormatCode::Text);
        let binary_numeric = TypeRegistry::from_opts(Opts {
            numeric_format: NumericFormat::Binary,
            ..Opts::default()
        });
        assert_eq!(binary_numeric.preferred_format(oid::NUMERIC), FormatCode::Binary);
    }

    #[test]
    fn test_text_fallback_disabled() {
        let registry = TypeRegistry::from_opts(Opts {
            text_fallback: false,
            ..Opts::default()
        });
        assert!(registry.lookup(oid::INTERVAL).is_err());
        assert!(registry.lookup(oid::INT4).is_ok());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
    }
}
