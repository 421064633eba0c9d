//! User-defined composite (record) types.
//!
//! Field types are only known once the type is looked up in the catalog, so
//! records are decoded through the [`TypeRegistry`] into a [`Composite`] of
//! dynamically typed fields.
//!
//! Binary layout: `nfields i32`, then per field `oid u32`, `length i32`
//! (`-1` = NULL) and payload. Text layout: `(f1,f2,...)` where an empty
//! unquoted field is NULL.

use std::borrow::Cow;

use crate::conversion::ToWireValue;
use crate::error::{Error, Result};
use crate::protocol::codec::{read_framed, read_i32, read_u32, write_i32, write_u32};
use crate::protocol::types::{FormatCode, Oid, oid};
use crate::registry::{Codec, TypeRegistry};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

const TYPE_NAME: &str = "record";

/// One field of a [`Composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeField {
    pub name: String,
    pub oid: Oid,
    pub value: Value,
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    /// OID of the composite type, [`oid::RECORD`] for anonymous records
    pub type_oid: Oid,
    pub fields: Vec<CompositeField>,
}

impl Composite {
    pub fn new(type_oid: Oid) -> Self {
        Self {
            type_oid,
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, name: impl Into<String>, oid: Oid, value: impl Into<Value>) -> Self {
        self.fields.push(CompositeField {
            name: name.into(),
            oid,
            value: value.into(),
        });
        self
    }

    /// Value of the first field named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

impl ToWireValue for Composite {
    fn natural_oid(&self) -> Oid {
        self.type_oid
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.check_target(target_oid)?;
        write_text_fields(
            self.fields.iter().map(|f| (f.oid, &f.value)),
            buf,
            |value, oid, out| value.to_text(oid, out),
        )
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.check_target(target_oid)?;
        write_binary_fields(
            self.fields.iter().map(|f| (f.oid, &f.value)),
            buf,
            |value, oid, out| value.encode(oid, FormatCode::Binary, out),
        )
    }
}

impl Composite {
    fn check_target(&self, target_oid: Oid) -> Result<()> {
        if target_oid == self.type_oid || target_oid == oid::RECORD {
            Ok(())
        } else {
            Err(Error::type_mismatch("record", target_oid))
        }
    }
}

impl NativeType for Composite {
    const KIND: ValueKind = ValueKind::Composite;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Composite(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Composite(self)
    }
}

/// Codec for a composite type with a fixed list of typed fields.
///
/// Each field is decoded and encoded by the codec registered for its type.
#[derive(Debug)]
pub struct CompositeCodec {
    name: String,
    oid: Oid,
    fields: Vec<(String, Oid)>,
}

impl CompositeCodec {
    pub fn new(name: impl Into<String>, oid: Oid, fields: Vec<(String, Oid)>) -> Self {
        Self {
            name: name.into(),
            oid,
            fields,
        }
    }

    fn field_count_error(&self, actual: usize) -> Error {
        Error::malformed(
            TYPE_NAME,
            format!(
                "{} has {} fields, got {}",
                self.name,
                self.fields.len(),
                actual
            ),
        )
    }

    fn decode_binary(&self, registry: &TypeRegistry, bytes: &[u8]) -> Result<Composite> {
        let (count, mut rest) = read_i32(bytes, TYPE_NAME)?;
        if usize::try_from(count).ok() != Some(self.fields.len()) {
            return Err(self.field_count_error(usize::try_from(count).unwrap_or(0)));
        }
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, declared) in &self.fields {
            let (wire_oid, tail) = read_u32(rest, TYPE_NAME)?;
            if wire_oid != *declared {
                return Err(Error::ElementCodecMismatch {
                    expected: registry.lookup(*declared)?.kind(),
                    found: registry
                        .lookup(wire_oid)
                        .map_or(ValueKind::Raw, |codec| codec.kind()),
                });
            }
            let (value, tail) = read_framed(tail, TYPE_NAME)?;
            fields.push(CompositeField {
                name: name.clone(),
                oid: *declared,
                value: registry.decode(*declared, FormatCode::Binary, value)?,
            });
            rest = tail;
        }
        if !rest.is_empty() {
            tracing::warn!(
                type_name = %self.name,
                extra = rest.len(),
                "ignoring trailing bytes after record"
            );
        }
        Ok(Composite {
            type_oid: self.oid,
            fields,
        })
    }

    fn decode_text(&self, registry: &TypeRegistry, bytes: &[u8]) -> Result<Composite> {
        let raw = parse_text_fields(bytes)?;
        if raw.len() != self.fields.len() {
            return Err(self.field_count_error(raw.len()));
        }
        let fields = self
            .fields
            .iter()
            .zip(&raw)
            .map(|((name, oid), value)| {
                Ok(CompositeField {
                    name: name.clone(),
                    oid: *oid,
                    value: registry.decode(*oid, FormatCode::Text, value.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Composite {
            type_oid: self.oid,
            fields,
        })
    }
}

impl Codec for CompositeCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Composite
    }

    fn decode(
        &self,
        registry: &TypeRegistry,
        _oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Value> {
        let composite = match format {
            FormatCode::Binary => self.decode_binary(registry, bytes)?,
            FormatCode::Text => self.decode_text(registry, bytes)?,
        };
        Ok(Value::Composite(composite))
    }

    fn encode(
        &self,
        registry: &TypeRegistry,
        oid: Oid,
        format: FormatCode,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let Value::Composite(composite) = value else {
            return Err(Error::ElementCodecMismatch {
                expected: ValueKind::Composite,
                found: value.kind(),
            });
        };
        if composite.fields.len() != self.fields.len() {
            return Err(Error::type_mismatch(
                format!("record with {} fields", composite.fields.len()),
                oid,
            ));
        }
        let values = self
            .fields
            .iter()
            .zip(&composite.fields)
            .map(|((_, oid), field)| (*oid, &field.value));
        match format {
            FormatCode::Binary => write_binary_fields(values, buf, |value, oid, out| {
                registry.encode(value, oid, FormatCode::Binary, out)
            }),
            FormatCode::Text => write_text_fields(values, buf, |value, oid, out| {
                registry.encode_payload(value, oid, FormatCode::Text, out)
            }),
        }
    }
}

/// Write `nfields` then each field's OID and framed value.
fn write_binary_fields<'v>(
    fields: impl ExactSizeIterator<Item = (Oid, &'v Value)>,
    buf: &mut Vec<u8>,
    mut encode_framed: impl FnMut(&Value, Oid, &mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let count = i32::try_from(fields.len()).map_err(|_| Error::overflow("field count", "INT4"))?;
    write_i32(buf, count);
    for (oid, value) in fields {
        write_u32(buf, oid);
        encode_framed(value, oid, buf)?;
    }
    Ok(())
}

/// Write `(f1,f2,...)`, quoting fields as needed. NULL fields are empty.
fn write_text_fields<'v>(
    fields: impl Iterator<Item = (Oid, &'v Value)>,
    buf: &mut Vec<u8>,
    mut encode: impl FnMut(&Value, Oid, &mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let mut scratch = Vec::new();
    buf.push(b'(');
    for (i, (oid, value)) in fields.enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        if value.is_null() {
            continue;
        }
        scratch.clear();
        encode(value, oid, &mut scratch)?;
        write_quoted(&scratch, buf);
    }
    buf.push(b')');
    Ok(())
}

fn write_quoted(field: &[u8], buf: &mut Vec<u8>) {
    let needs_quotes = field.is_empty()
        || field
            .iter()
            .any(|&b| matches!(b, b'"' | b'\\' | b'(' | b')' | b',') || b.is_ascii_whitespace());
    if !needs_quotes {
        buf.extend_from_slice(field);
        return;
    }
    buf.push(b'"');
    for &b in field {
        if b == b'"' || b == b'\\' {
            buf.push(b);
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Split `(f1,f2,...)` into raw field texts, `None` for NULL.
fn parse_text_fields(input: &[u8]) -> Result<Vec<Option<Cow<'_, [u8]>>>> {
    let error = |reason: &str| {
        Error::malformed(
            TYPE_NAME,
            format!("{} in {:?}", reason, String::from_utf8_lossy(input)),
        )
    };

    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| error("missing left parenthesis"))?;
    if input[start] != b'(' {
        return Err(error("missing left parenthesis"));
    }

    let mut fields = Vec::new();
    let mut pos = start + 1;
    loop {
        let field_start = pos;
        let mut owned: Option<Vec<u8>> = None;
        let mut quoted = false;
        let mut in_quotes = false;
        loop {
            let Some(&b) = input.get(pos) else {
                return Err(error("unexpected end of input"));
            };
            if !in_quotes && (b == b',' || b == b')') {
                break;
            }
            let buf = owned.get_or_insert_with(Vec::new);
            match b {
                b'\\' => {
                    let escaped = *input
                        .get(pos + 1)
                        .ok_or_else(|| error("unexpected end of input"))?;
                    buf.push(escaped);
                    pos += 2;
                }
                b'"' if !in_quotes => {
                    in_quotes = true;
                    quoted = true;
                    pos += 1;
                }
                b'"' if input.get(pos + 1) == Some(&b'"') => {
                    buf.push(b'"');
                    pos += 2;
                }
                b'"' => {
                    in_quotes = false;
                    pos += 1;
                }
                _ => {
                    buf.push(b);
                    pos += 1;
                }
            }
        }

        let field = if pos == field_start && !quoted {
            None
        } else {
            Some(match owned {
                Some(buf) if quoted || buf.len() != pos - field_start => Cow::Owned(buf),
                _ => Cow::Borrowed(&input[field_start..pos]),
            })
        };
        fields.push(field);

        let end = input[pos];
        pos += 1;
        if end == b')' {
            break;
        }
    }

    if input[pos..].iter().any(|b| !b.is_ascii_whitespace()) {
        return Err(error("junk after right parenthesis"));
    }
    Ok(fields)
}
