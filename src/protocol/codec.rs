//! PostgreSQL wire value encoding and decoding primitives.
//!
//! PostgreSQL uses big-endian (network byte order) for all integers.
//! Readers take a type name that is reported in `TruncatedValue` errors.

use zerocopy::FromBytes;

use crate::error::{Error, Result};

use super::types::{I16BE, I32BE, U16BE, U32BE};

/// Length value marking a NULL in length-prefixed values.
pub const NULL_LENGTH: i32 = -1;

/// Read 2-byte big-endian signed integer.
#[inline]
pub fn read_i16<'a>(data: &'a [u8], type_name: &'static str) -> Result<(i16, &'a [u8])> {
    let (value, rest) =
        I16BE::read_from_prefix(data).map_err(|_| Error::truncated(type_name, 2, data.len()))?;
    Ok((value.get(), rest))
}

/// Read 2-byte big-endian unsigned integer.
#[inline]
pub fn read_u16<'a>(data: &'a [u8], type_name: &'static str) -> Result<(u16, &'a [u8])> {
    let (value, rest) =
        U16BE::read_from_prefix(data).map_err(|_| Error::truncated(type_name, 2, data.len()))?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian signed integer.
#[inline]
pub fn read_i32<'a>(data: &'a [u8], type_name: &'static str) -> Result<(i32, &'a [u8])> {
    let (value, rest) =
        I32BE::read_from_prefix(data).map_err(|_| Error::truncated(type_name, 4, data.len()))?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian unsigned integer.
#[inline]
pub fn read_u32<'a>(data: &'a [u8], type_name: &'static str) -> Result<(u32, &'a [u8])> {
    let (value, rest) =
        U32BE::read_from_prefix(data).map_err(|_| Error::truncated(type_name, 4, data.len()))?;
    Ok((value.get(), rest))
}

/// Read fixed-length bytes.
#[inline]
pub fn read_bytes<'a>(
    data: &'a [u8],
    len: usize,
    type_name: &'static str,
) -> Result<(&'a [u8], &'a [u8])> {
    if data.len() < len {
        return Err(Error::truncated(type_name, len, data.len()));
    }
    Ok(data.split_at(len))
}

/// Read a length-prefixed value: `-1` is NULL, otherwise that many bytes follow.
#[inline]
pub fn read_framed<'a>(
    data: &'a [u8],
    type_name: &'static str,
) -> Result<(Option<&'a [u8]>, &'a [u8])> {
    let (len, rest) = read_i32(data, type_name)?;
    if len == NULL_LENGTH {
        return Ok((None, rest));
    }
    let len = usize::try_from(len)
        .map_err(|_| Error::malformed(type_name, format!("negative value length {len}")))?;
    let (value, rest) = read_bytes(rest, len, type_name)?;
    Ok((Some(value), rest))
}

/// Check the payload length of a fixed-width binary value.
///
/// Fewer than `width` bytes is a `TruncatedValue`. Extra bytes are reported as
/// a warning and the leading `width` bytes are returned.
pub fn fixed_width<'a>(data: &'a [u8], width: usize, type_name: &'static str) -> Result<&'a [u8]> {
    let (head, tail) = read_bytes(data, width, type_name)?;
    if !tail.is_empty() {
        let err = Error::TrailingBytes {
            type_name,
            expected: width,
            actual: data.len(),
        };
        tracing::warn!(error = %err, "ignoring trailing bytes");
    }
    Ok(head)
}

/// Read the whole payload of a fixed-width binary value into an array.
#[inline]
pub fn read_fixed<const N: usize>(data: &[u8], type_name: &'static str) -> Result<[u8; N]> {
    let head = fixed_width(data, N, type_name)?;
    let mut arr = [0_u8; N];
    arr.copy_from_slice(head);
    Ok(arr)
}

/// Write 2-byte big-endian signed integer.
#[inline]
pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 2-byte big-endian unsigned integer.
#[inline]
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian signed integer.
#[inline]
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian unsigned integer.
#[inline]
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write the NULL marker of a length-prefixed value.
#[inline]
pub fn write_null(out: &mut Vec<u8>) {
    write_i32(out, NULL_LENGTH);
}

/// Length-prefixed value builder.
///
/// Reserves the 4-byte length on creation and fills it in on `finish`.
/// The length does not include itself.
pub struct FrameBuilder<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> FrameBuilder<'a> {
    /// Start a length-prefixed value.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]); // Placeholder for length
        Self { buf, start }
    }

    /// Get mutable access to the underlying buffer.
    pub fn buf(&mut self) -> &mut Vec<u8> {
        self.buf
    }

    /// Finish the value and fill in the length field.
    pub fn finish(self) -> Result<()> {
        let len = self.buf.len() - self.start - 4;
        let len = i32::try_from(len).map_err(|_| Error::overflow("value length", "INT4"))?;
        self.buf[self.start..self.start + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }
}
