//! Arrays of any element type.
//!
//! The element's native type is fixed by the generic parameter while its wire
//! codec may only be known at run time. [`Array::decode`] resolves the element
//! codec through the [`TypeRegistry`] and checks the two agree before any
//! element is decoded. The static [`FromWireValue`]/[`ToWireValue`] impls
//! cover built-in array types without a registry.

mod binary;
mod text;

use std::slice;

use crate::conversion::{FromWireValue, ToWireValue};
use crate::error::{Error, Result};
use crate::nullable::Nullable;
use crate::protocol::types::{FormatCode, Oid, oid};
use crate::registry::{TypeRegistry, check_kind};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use binary::{Envelope, write_binary};

/// Most dimensions an array may have.
pub const MAX_DIMENSIONS: i32 = 6;

/// Length and lower bound of one array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayDimension {
    pub len: i32,
    pub lower_bound: i32,
}

impl ArrayDimension {
    /// A dimension with the default lower bound of 1.
    pub const fn new(len: i32) -> Self {
        Self { len, lower_bound: 1 }
    }
}

/// Product of the dimension lengths, 0 without dimensions.
fn element_count(dims: &[ArrayDimension]) -> Result<usize> {
    if dims.is_empty() {
        return Ok(0);
    }
    dims.iter().try_fold(1_usize, |acc, dim| {
        usize::try_from(dim.len)
            .ok()
            .and_then(|len| acc.checked_mul(len))
            .ok_or_else(|| Error::malformed("array", "array size exceeds the maximum allowed"))
    })
}

/// A possibly multi-dimensional array with nullable elements, stored flat in
/// row-major order.
///
/// An empty array has no dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    dims: Vec<ArrayDimension>,
    elements: Vec<Nullable<T>>,
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self {
            dims: Vec::new(),
            elements: Vec::new(),
        }
    }
}

impl<T> Array<T> {
    /// A one-dimensional array with lower bound 1.
    pub fn from_elements(elements: Vec<Nullable<T>>) -> Self {
        let dims = if elements.is_empty() {
            Vec::new()
        } else {
            // An array longer than i32::MAX cannot be encoded anyway
            vec![ArrayDimension::new(
                i32::try_from(elements.len()).unwrap_or(i32::MAX),
            )]
        };
        Self { dims, elements }
    }

    /// An array with explicit dimensions.
    ///
    /// Fails with `DimensionMismatch` unless the product of the lengths equals
    /// the number of elements.
    pub fn with_dims(dims: Vec<ArrayDimension>, elements: Vec<Nullable<T>>) -> Result<Self> {
        if dims.len() > MAX_DIMENSIONS as usize {
            return Err(Error::InvalidUsage(format!(
                "arrays have at most {MAX_DIMENSIONS} dimensions, got {}",
                dims.len()
            )));
        }
        let expected = element_count(&dims)?;
        if expected != elements.len() {
            return Err(Error::DimensionMismatch {
                expected,
                actual: elements.len(),
            });
        }
        let dims = if elements.is_empty() { Vec::new() } else { dims };
        Ok(Self { dims, elements })
    }

    pub fn dims(&self) -> &[ArrayDimension] {
        &self.dims
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> &[Nullable<T>] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Nullable<T>> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Nullable<T>> {
        self.elements.iter()
    }

    /// Convert every element, keeping dimensions and NULL positions.
    pub fn try_map<U: Default>(self, mut f: impl FnMut(T) -> Result<U>) -> Result<Array<U>> {
        let elements = self
            .elements
            .into_iter()
            .map(|element| match element.into_option() {
                Some(value) => f(value).map(Nullable::new),
                None => Ok(Nullable::null()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Array {
            dims: self.dims,
            elements,
        })
    }
}

impl<T> From<Vec<T>> for Array<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_elements(values.into_iter().map(Nullable::new).collect())
    }
}

impl<T: Default> FromIterator<Option<T>> for Array<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self::from_elements(iter.into_iter().map(Nullable::from).collect())
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a Nullable<T>;
    type IntoIter = slice::Iter<'a, Nullable<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: NativeType + Default> Array<T> {
    /// Decode an array of type `array_oid`, resolving the element codec
    /// through `registry`.
    ///
    /// Fails with `ElementCodecMismatch` before decoding any element when `T`
    /// cannot hold what the element codec produces.
    pub fn decode(
        registry: &TypeRegistry,
        array_oid: Oid,
        format: FormatCode,
        bytes: &[u8],
    ) -> Result<Self> {
        let (element_oid, _) = registry.lookup_element(array_oid)?;
        decode_array(registry, element_oid, format, bytes)
    }
}

impl Array<Value> {
    /// Encode through `registry` as an array of type `array_oid`, without
    /// length prefix.
    pub fn encode(
        &self,
        registry: &TypeRegistry,
        array_oid: Oid,
        format: FormatCode,
        buf: &mut Vec<u8>,
    ) -> Result<()> {
        let (element_oid, _) = registry.lookup_element(array_oid)?;
        encode_array(registry, element_oid, format, self, buf)
    }
}

/// Decode an array whose elements are of type `element_oid`.
pub(crate) fn decode_array<T: NativeType + Default>(
    registry: &TypeRegistry,
    element_oid: Oid,
    format: FormatCode,
    bytes: &[u8],
) -> Result<Array<T>> {
    let codec = registry.lookup(element_oid)?;
    check_kind::<T>(codec.kind())?;

    let (dims, elements) = match format {
        FormatCode::Binary => {
            let envelope = Envelope::parse(bytes)?;
            // The envelope names the element type actually sent
            let wire_oid = envelope.element_oid;
            let codec = if wire_oid == element_oid {
                codec
            } else {
                let codec = registry.lookup(wire_oid)?;
                check_kind::<T>(codec.kind())?;
                codec
            };
            let elements = envelope.decode_elements(|bytes| {
                codec
                    .decode(registry, wire_oid, format, bytes)
                    .and_then(T::from_value)
            })?;
            (envelope.dims, elements)
        }
        FormatCode::Text => {
            let parsed = text::parse(bytes, codec.delimiter())?;
            let dims = parsed.dims.clone();
            let elements = parsed.decode_elements(|bytes| {
                codec
                    .decode(registry, element_oid, format, bytes)
                    .and_then(T::from_value)
            })?;
            (dims, elements)
        }
    };
    Ok(Array { dims, elements })
}

/// Encode an array whose elements are of type `element_oid`.
pub(crate) fn encode_array(
    registry: &TypeRegistry,
    element_oid: Oid,
    format: FormatCode,
    array: &Array<Value>,
    buf: &mut Vec<u8>,
) -> Result<()> {
    let codec = registry.lookup(element_oid)?;
    let mut encode = |value: &Value, buf: &mut Vec<u8>| {
        codec.encode(registry, element_oid, format, value, buf)
    };
    match format {
        FormatCode::Binary => {
            write_binary(&array.dims, &array.elements, element_oid, buf, encode)
        }
        FormatCode::Text => text::write_text(
            &array.dims,
            &array.elements,
            codec.delimiter(),
            buf,
            |element| ToWireValue::is_null(element),
            &mut encode,
        ),
    }
}

/// Element OID of a built-in array type.
fn builtin_element(array_oid: Oid) -> Result<Oid> {
    oid::element_of(array_oid).ok_or_else(|| Error::type_mismatch("array", array_oid))
}

impl<T> FromWireValue<'_> for Array<T>
where
    T: for<'b> FromWireValue<'b> + Default,
{
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        let element_oid = builtin_element(oid)?;
        let parsed = text::parse(bytes, oid::delimiter_of(element_oid))?;
        let dims = parsed.dims.clone();
        let elements = parsed.decode_elements(|bytes| T::from_text(element_oid, bytes))?;
        Ok(Self { dims, elements })
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        let envelope = Envelope::parse(bytes)?;
        if let Some(element_oid) = oid::element_of(oid)
            && element_oid != envelope.element_oid
        {
            return Err(Error::type_mismatch(
                format!("array of OID {}", envelope.element_oid),
                oid,
            ));
        }
        let element_oid = envelope.element_oid;
        let elements = envelope.decode_elements(|bytes| T::from_binary(element_oid, bytes))?;
        Ok(Self {
            dims: envelope.dims,
            elements,
        })
    }
}

impl<T: ToWireValue> ToWireValue for Array<T> {
    fn natural_oid(&self) -> Oid {
        self.elements
            .iter()
            .find(|element| !ToWireValue::is_null(*element))
            .and_then(|element| oid::array_of(element.value.natural_oid()))
            .unwrap_or(0)
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        let element_oid = builtin_element(target_oid)?;
        text::write_text(
            &self.dims,
            &self.elements,
            oid::delimiter_of(element_oid),
            buf,
            |element| ToWireValue::is_null(element),
            |value, buf| value.to_text(element_oid, buf),
        )
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        let element_oid = builtin_element(target_oid)?;
        write_binary(&self.dims, &self.elements, element_oid, buf, |value, buf| {
            value.to_binary(element_oid, buf)
        })
    }
}

impl<T: NativeType + Default> NativeType for Array<T> {
    const KIND: ValueKind = ValueKind::Array;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(array) => {
                let elements = array
                    .elements
                    .into_iter()
                    .map(|element| match element.into_option() {
                        None | Some(Value::Null) => Ok(Nullable::null()),
                        Some(value) => T::from_value(value).map(Nullable::new),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Array {
                    dims: array.dims,
                    elements,
                })
            }
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        let elements = self
            .elements
            .into_iter()
            .map(|element| match element.into_option() {
                Some(value) => Nullable::new(value.into_value()),
                None => Nullable::null(),
            })
            .collect();
        Value::Array(Array {
            dims: self.dims,
            elements,
        })
    }
}
