//! Binary array layout.
//!
//! ```text
//! ndim i32 | flags i32 | element oid u32 | ndim x (length i32, lower bound i32)
//! then per element: length i32 (-1 = NULL) and payload
//! ```

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::conversion::ToWireValue;
use crate::error::{Error, Result};
use crate::nullable::Nullable;
use crate::protocol::codec::{FrameBuilder, read_framed, write_null};
use crate::protocol::types::{I32BE, Oid, U32BE};

use super::{ArrayDimension, MAX_DIMENSIONS, element_count};

const TYPE_NAME: &str = "array";

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct ArrayHeader {
    ndim: I32BE,
    flags: I32BE,
    element_oid: U32BE,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct DimensionHeader {
    len: I32BE,
    lower_bound: I32BE,
}

/// Parsed array header, elements still encoded.
#[derive(Debug)]
pub(crate) struct Envelope<'a> {
    pub dims: Vec<ArrayDimension>,
    pub element_oid: Oid,
    body: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub(crate) fn parse(bytes: &'a [u8]) -> Result<Self> {
        let (header, mut rest) = ArrayHeader::read_from_prefix(bytes)
            .map_err(|_| Error::truncated(TYPE_NAME, size_of::<ArrayHeader>(), bytes.len()))?;
        let ndim = header.ndim.get();
        let flags = header.flags.get();
        if !(0..=MAX_DIMENSIONS).contains(&ndim) {
            return Err(Error::malformed(
                TYPE_NAME,
                format!("invalid number of dimensions: {ndim}"),
            ));
        }
        if flags != 0 && flags != 1 {
            return Err(Error::malformed(TYPE_NAME, format!("invalid flags: {flags}")));
        }

        let mut dims = Vec::with_capacity(ndim as usize);
        for _ in 0..ndim {
            let (dim, tail) = DimensionHeader::read_from_prefix(rest).map_err(|_| {
                Error::truncated(TYPE_NAME, size_of::<DimensionHeader>(), rest.len())
            })?;
            let len = dim.len.get();
            if len < 0 {
                return Err(Error::malformed(
                    TYPE_NAME,
                    format!("negative dimension length {len}"),
                ));
            }
            dims.push(ArrayDimension {
                len,
                lower_bound: dim.lower_bound.get(),
            });
            rest = tail;
        }

        // Any zero-length dimension makes the array empty
        if dims.iter().any(|d| d.len == 0) {
            dims.clear();
        }

        Ok(Self {
            dims,
            element_oid: header.element_oid.get(),
            body: rest,
        })
    }

    /// Decode every element with `decode`; NULL elements are not passed to it.
    ///
    /// The number of elements present must match the dimensions.
    pub(crate) fn decode_elements<T: Default>(
        &self,
        mut decode: impl FnMut(&'a [u8]) -> Result<T>,
    ) -> Result<Vec<Nullable<T>>> {
        let expected = element_count(&self.dims)?;
        // Declared lengths are untrusted; every element takes at least its
        // 4-byte length word
        let mut elements = Vec::with_capacity(expected.min(self.body.len() / 4));
        let mut rest = self.body;
        while !rest.is_empty() {
            let (value, tail) = read_framed(rest, TYPE_NAME)?;
            elements.push(match value {
                Some(bytes) => Nullable::new(decode(bytes)?),
                None => Nullable::null(),
            });
            rest = tail;
        }
        if elements.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: elements.len(),
            });
        }
        Ok(elements)
    }
}

/// Write the binary form of an array.
///
/// `encode` writes the payload of one non-NULL element.
pub(crate) fn write_binary<T: ToWireValue>(
    dims: &[ArrayDimension],
    elements: &[Nullable<T>],
    element_oid: Oid,
    buf: &mut Vec<u8>,
    mut encode: impl FnMut(&T, &mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let has_null = elements.iter().any(ToWireValue::is_null);
    let ndim = if elements.is_empty() { 0 } else { dims.len() };
    let header = ArrayHeader {
        ndim: I32BE::new(ndim as i32),
        flags: I32BE::new(i32::from(has_null)),
        element_oid: U32BE::new(element_oid),
    };
    buf.extend_from_slice(header.as_bytes());
    for dim in &dims[..ndim] {
        let dim = DimensionHeader {
            len: I32BE::new(dim.len),
            lower_bound: I32BE::new(dim.lower_bound),
        };
        buf.extend_from_slice(dim.as_bytes());
    }

    for element in elements {
        if ToWireValue::is_null(element) {
            write_null(buf);
            continue;
        }
        let mut frame = FrameBuilder::new(buf);
        encode(&element.value, frame.buf())?;
        frame.finish()?;
    }
    Ok(())
}
