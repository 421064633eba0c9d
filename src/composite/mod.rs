//! Fixed-shape composite values built from an ordered list of fields.
//!
//! A [`FixedComposite`] declares its field type and arity; decoding reads each
//! field with the field's own codec and then applies the type's
//! [`canonicalize`](FixedComposite::canonicalize) step. `point` is two `f64`
//! fields with no invariant, `box` is two points reordered into canonical
//! corner order.
//!
//! User-defined records whose field types are only known at run time live in
//! [`record`].

pub mod geometric;
pub mod record;

use crate::conversion::{FromWireValue, ToWireValue, format_f64};
use crate::error::{Error, Result};
use crate::protocol::codec::fixed_width;
use crate::protocol::types::oid;

/// A fixed-width field of a [`FixedComposite`].
pub trait FixedField: Sized + Copy {
    /// Binary width in bytes.
    const WIDTH: usize;

    /// Whether the field's own text form is parenthesized, like a point.
    const NESTED: bool;

    /// Decode from exactly `WIDTH` bytes.
    fn decode_binary(bytes: &[u8]) -> Result<Self>;

    fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Parse the field at the cursor, leaving the cursor after it.
    fn parse_text(cursor: &mut TextCursor<'_>) -> Result<Self>;

    fn write_text(&self, buf: &mut Vec<u8>);
}

/// A composite with a fixed number of fields of one type.
pub trait FixedComposite: Sized {
    type Field: FixedField;

    const ARITY: usize;

    /// Type name used in error messages.
    const TYPE_NAME: &'static str;

    /// Build from fields in declaration order; `fields.len() == ARITY`.
    fn assemble(fields: &[Self::Field]) -> Self;

    /// The field at `index` in declaration order.
    fn field(&self, index: usize) -> Self::Field;

    /// Restore the type's invariant. Must not fail.
    fn canonicalize(self) -> Self {
        self
    }
}

impl FixedField for f64 {
    const WIDTH: usize = 8;
    const NESTED: bool = false;

    fn decode_binary(bytes: &[u8]) -> Result<Self> {
        f64::from_binary(oid::FLOAT8, bytes)
    }

    fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.to_binary(oid::FLOAT8, buf)
    }

    fn parse_text(cursor: &mut TextCursor<'_>) -> Result<Self> {
        cursor.skip_whitespace();
        let token = cursor.take_until(b",()");
        if token.iter().all(u8::is_ascii_whitespace) {
            return Err(cursor.error("missing coordinate"));
        }
        f64::from_text(oid::FLOAT8, token)
    }

    fn write_text(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(format_f64(*self).as_bytes());
    }
}

/// Decode the binary form: each field in order, then canonicalize.
pub fn decode_binary<C: FixedComposite>(bytes: &[u8]) -> Result<C> {
    let width = C::Field::WIDTH;
    let bytes = fixed_width(bytes, width * C::ARITY, C::TYPE_NAME)?;
    let fields = bytes
        .chunks_exact(width)
        .map(C::Field::decode_binary)
        .collect::<Result<Vec<_>>>()?;
    Ok(C::assemble(&fields).canonicalize())
}

/// Encode the binary form, fields as stored.
pub fn encode_binary<C: FixedComposite>(value: &C, buf: &mut Vec<u8>) -> Result<()> {
    for i in 0..C::ARITY {
        value.field(i).encode_binary(buf)?;
    }
    Ok(())
}

/// Decode the text form: the whole input must be one composite.
pub fn decode_text<C: FixedComposite>(text: &[u8]) -> Result<C> {
    let mut cursor = TextCursor::new(text, C::TYPE_NAME);
    let value = parse_fields::<C>(&mut cursor)?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing characters"));
    }
    Ok(value.canonicalize())
}

/// Parse `ARITY` comma-separated fields, optionally enclosed in parentheses.
///
/// With parenthesized fields a leading `(` is ambiguous: `(1,2),(3,4)` is two
/// bare points while `(1,2,3,4)` is one enclosed list. `((` always encloses;
/// otherwise the bare list is tried first and the enclosed one second.
pub(crate) fn parse_fields<C: FixedComposite>(cursor: &mut TextCursor<'_>) -> Result<C> {
    cursor.skip_whitespace();
    let open = cursor.peek() == Some(b'(');
    if open && C::Field::NESTED && cursor.peek_after_open() != Some(b'(') {
        let start = cursor.pos;
        let bare = parse_list::<C>(cursor, false);
        if bare.is_ok() {
            return bare;
        }
        cursor.pos = start;
        return parse_list::<C>(cursor, true).or(bare);
    }
    parse_list::<C>(cursor, open)
}

fn parse_list<C: FixedComposite>(cursor: &mut TextCursor<'_>, enclosed: bool) -> Result<C> {
    if enclosed {
        cursor.advance();
    }
    let mut fields = Vec::with_capacity(C::ARITY);
    for i in 0..C::ARITY {
        if i > 0 {
            cursor.expect(b',')?;
        }
        fields.push(C::Field::parse_text(cursor)?);
    }
    if enclosed {
        cursor.expect(b')')?;
    }
    Ok(C::assemble(&fields))
}

/// Encode the text form. Scalar fields are wrapped in parentheses, nested ones
/// carry their own.
pub fn encode_text<C: FixedComposite>(value: &C, buf: &mut Vec<u8>) {
    if !C::Field::NESTED {
        buf.push(b'(');
    }
    for i in 0..C::ARITY {
        if i > 0 {
            buf.push(b',');
        }
        value.field(i).write_text(buf);
    }
    if !C::Field::NESTED {
        buf.push(b')');
    }
}

/// Byte cursor over a text literal.
#[derive(Debug)]
pub struct TextCursor<'a> {
    input: &'a [u8],
    pos: usize,
    type_name: &'static str,
}

impl<'a> TextCursor<'a> {
    pub fn new(input: &'a [u8], type_name: &'static str) -> Self {
        Self {
            input,
            pos: 0,
            type_name,
        }
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// The first non-whitespace byte after the current one.
    fn peek_after_open(&self) -> Option<u8> {
        self.input
            .get(self.pos + 1..)?
            .iter()
            .copied()
            .find(|b| !b.is_ascii_whitespace())
    }

    pub fn advance(&mut self) {
        self.pos = (self.pos + 1).min(self.input.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consume `byte` after optional whitespace, or fail.
    pub fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", byte as char)))
        }
    }

    /// Consume `byte` after optional whitespace if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume up to, not including, the first byte in `stops`.
    pub fn take_until(&mut self, stops: &[u8]) -> &'a [u8] {
        let rest = &self.input[self.pos..];
        let len = rest
            .iter()
            .position(|b| stops.contains(b))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    pub fn error(&self, reason: impl std::fmt::Display) -> Error {
        Error::malformed(
            self.type_name,
            format!(
                "{} at position {} in {:?}",
                reason,
                self.pos,
                String::from_utf8_lossy(self.input)
            ),
        )
    }
}
