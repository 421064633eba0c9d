//! Primitive type implementations (bool, integers, floats).

use crate::error::{Error, Result};
use crate::protocol::codec::read_fixed;
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::numeric_util::{numeric_to_f64, write_numeric_binary};
use super::{FromWireValue, ToWireValue, utf8};

// === Boolean ===

impl FromWireValue<'_> for bool {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return Err(Error::type_mismatch("bool", oid));
        }
        match bytes {
            b"t" | b"true" | b"TRUE" | b"T" | b"1" => Ok(true),
            b"f" | b"false" | b"FALSE" | b"F" | b"0" => Ok(false),
            _ => Err(Error::malformed(
                "bool",
                format!("{:?}", String::from_utf8_lossy(bytes)),
            )),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BOOL {
            return Err(Error::type_mismatch("bool", oid));
        }
        let [b] = read_fixed::<1>(bytes, "bool")?;
        Ok(b != 0)
    }
}

impl ToWireValue for bool {
    fn natural_oid(&self) -> Oid {
        oid::BOOL
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::BOOL {
            return Err(Error::type_mismatch("bool", target_oid));
        }
        buf.push(if *self { b't' } else { b'f' });
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::BOOL {
            return Err(Error::type_mismatch("bool", target_oid));
        }
        buf.push(u8::from(*self));
        Ok(())
    }
}

impl NativeType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

// === Integer types ===

fn parse_int<T: std::str::FromStr>(bytes: &[u8], type_name: &'static str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    utf8(bytes, type_name)?
        .trim()
        .parse()
        .map_err(|e| Error::malformed(type_name, format!("{}", e)))
}

/// Decode any integer OID into an i64, checking the width of the payload.
fn decode_int_binary(oid: Oid, bytes: &[u8]) -> Result<i64> {
    match oid {
        oid::INT2 => Ok(i64::from(i16::from_be_bytes(read_fixed(bytes, "int2")?))),
        oid::INT4 => Ok(i64::from(i32::from_be_bytes(read_fixed(bytes, "int4")?))),
        oid::INT8 => Ok(i64::from_be_bytes(read_fixed(bytes, "int8")?)),
        _ => Err(Error::type_mismatch("integer", oid)),
    }
}

impl FromWireValue<'_> for i16 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return Err(Error::type_mismatch("i16", oid));
        }
        parse_int(bytes, "int2")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::INT2 {
            return Err(Error::type_mismatch("i16", oid));
        }
        Ok(i16::from_be_bytes(read_fixed(bytes, "int2")?))
    }
}

impl FromWireValue<'_> for i32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4) {
            return Err(Error::type_mismatch("i32", oid));
        }
        parse_int(bytes, "int4")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4) {
            return Err(Error::type_mismatch("i32", oid));
        }
        let v = decode_int_binary(oid, bytes)?;
        i32::try_from(v).map_err(|_| Error::overflow("int", "i32"))
    }
}

impl FromWireValue<'_> for i64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::INT2 | oid::INT4 | oid::INT8) {
            return Err(Error::type_mismatch("i64", oid));
        }
        parse_int(bytes, "int8")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        decode_int_binary(oid, bytes)
    }
}

/// Write an integer as INT2/INT4/INT8/NUMERIC with overflow checking.
fn encode_int(
    v: i128,
    from: &'static str,
    target_oid: Oid,
    text: bool,
    buf: &mut Vec<u8>,
) -> Result<()> {
    let payload = match target_oid {
        oid::INT2 => {
            let v = i16::try_from(v).map_err(|_| Error::overflow(from, "INT2"))?;
            if text { None } else { Some(v.to_be_bytes().to_vec()) }
        }
        oid::INT4 => {
            let v = i32::try_from(v).map_err(|_| Error::overflow(from, "INT4"))?;
            if text { None } else { Some(v.to_be_bytes().to_vec()) }
        }
        oid::INT8 => {
            let v = i64::try_from(v).map_err(|_| Error::overflow(from, "INT8"))?;
            if text { None } else { Some(v.to_be_bytes().to_vec()) }
        }
        oid::NUMERIC => {
            if !text {
                return write_numeric_binary(&v.to_string(), buf);
            }
            None
        }
        _ => return Err(Error::type_mismatch(from, target_oid)),
    };
    match payload {
        Some(bytes) => buf.extend_from_slice(&bytes),
        None => buf.extend_from_slice(v.to_string().as_bytes()),
    }
    Ok(())
}

macro_rules! impl_int_to_wire {
    ($($ty:ty => $oid:expr),+ $(,)?) => {
        $(
            impl ToWireValue for $ty {
                fn natural_oid(&self) -> Oid {
                    $oid
                }

                fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
                    encode_int(i128::from(*self), stringify!($ty), target_oid, true, buf)
                }

                fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
                    encode_int(i128::from(*self), stringify!($ty), target_oid, false, buf)
                }
            }
        )+
    };
}

// PostgreSQL has no INT1 or unsigned types; unsigned values widen to the
// next signed type that holds their full range.
impl_int_to_wire! {
    i8 => oid::INT2,
    u8 => oid::INT2,
    i16 => oid::INT2,
    u16 => oid::INT4,
    i32 => oid::INT4,
    u32 => oid::INT8,
    i64 => oid::INT8,
    u64 => oid::INT8,
}

impl NativeType for i16 {
    const KIND: ValueKind = ValueKind::Int2;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int2(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Int2(self)
    }
}

impl NativeType for i32 {
    const KIND: ValueKind = ValueKind::Int4;

    fn accepts(kind: ValueKind) -> bool {
        matches!(kind, ValueKind::Int2 | ValueKind::Int4)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int2(v) => Ok(i32::from(v)),
            Value::Int4(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Int4(self)
    }
}

impl NativeType for i64 {
    const KIND: ValueKind = ValueKind::Int8;

    fn accepts(kind: ValueKind) -> bool {
        matches!(kind, ValueKind::Int2 | ValueKind::Int4 | ValueKind::Int8)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int2(v) => Ok(i64::from(v)),
            Value::Int4(v) => Ok(i64::from(v)),
            Value::Int8(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Int8(self)
    }
}

// === Floating point types ===

/// Shortest text that parses back to the same f64.
///
/// Uses PostgreSQL's spellings for the special values and switches to
/// exponent notation outside `[1e-4, 1e15)` like `float8out` does.
pub fn format_f64(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = v.abs();
    if abs == 0.0 || (1e-4..1e15).contains(&abs) {
        v.to_string()
    } else {
        format!("{:e}", v)
    }
}

/// Shortest text that parses back to the same f32.
pub fn format_f32(v: f32) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = v.abs();
    if abs == 0.0 || (1e-4..1e15).contains(&abs) {
        v.to_string()
    } else {
        format!("{:e}", v)
    }
}

fn parse_float_text(bytes: &[u8], type_name: &'static str) -> Result<f64> {
    let s = utf8(bytes, type_name)?.trim();

    // Handle special text values
    match s {
        "NaN" => return Ok(f64::NAN),
        "Infinity" => return Ok(f64::INFINITY),
        "-Infinity" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }

    s.parse()
        .map_err(|e| Error::malformed(type_name, format!("{}: {:?}", e, s)))
}

impl FromWireValue<'_> for f32 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::FLOAT4 | oid::NUMERIC) {
            return Err(Error::type_mismatch("f32", oid));
        }
        let s = utf8(bytes, "float4")?.trim();
        match s {
            "NaN" => Ok(f32::NAN),
            "Infinity" => Ok(f32::INFINITY),
            "-Infinity" => Ok(f32::NEG_INFINITY),
            _ => s
                .parse()
                .map_err(|e| Error::malformed("float4", format!("{}: {:?}", e, s))),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::FLOAT4 => Ok(f32::from_be_bytes(read_fixed(bytes, "float4")?)),
            oid::NUMERIC => {
                let value = numeric_to_f64(bytes)?;
                // Check for overflow
                if value.is_finite() && (value > f64::from(f32::MAX) || value < f64::from(f32::MIN))
                {
                    return Err(Error::overflow("NUMERIC", "f32"));
                }
                Ok(value as f32)
            }
            _ => Err(Error::type_mismatch("f32", oid)),
        }
    }
}

impl ToWireValue for f32 {
    fn natural_oid(&self) -> Oid {
        oid::FLOAT4
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::FLOAT4 | oid::NUMERIC => buf.extend_from_slice(format_f32(*self).as_bytes()),
            oid::FLOAT8 => buf.extend_from_slice(format_f64(f64::from(*self)).as_bytes()),
            _ => return Err(Error::type_mismatch("f32", target_oid)),
        }
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::FLOAT4 => buf.extend_from_slice(&self.to_bits().to_be_bytes()),
            oid::FLOAT8 => buf.extend_from_slice(&f64::from(*self).to_bits().to_be_bytes()),
            oid::NUMERIC => write_numeric_binary(&format_f32(*self), buf)?,
            _ => return Err(Error::type_mismatch("f32", target_oid)),
        }
        Ok(())
    }
}

impl FromWireValue<'_> for f64 {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if !matches!(oid, oid::FLOAT4 | oid::FLOAT8 | oid::NUMERIC) {
            return Err(Error::type_mismatch("f64", oid));
        }
        parse_float_text(bytes, "float8")
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::FLOAT4 => Ok(f64::from(f32::from_be_bytes(read_fixed(bytes, "float4")?))),
            oid::FLOAT8 => Ok(f64::from_be_bytes(read_fixed(bytes, "float8")?)),
            oid::NUMERIC => numeric_to_f64(bytes),
            _ => Err(Error::type_mismatch("f64", oid)),
        }
    }
}

impl ToWireValue for f64 {
    fn natural_oid(&self) -> Oid {
        oid::FLOAT8
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            // Note: potential precision loss
            oid::FLOAT4 => buf.extend_from_slice(format_f32(*self as f32).as_bytes()),
            oid::FLOAT8 | oid::NUMERIC => buf.extend_from_slice(format_f64(*self).as_bytes()),
            _ => return Err(Error::type_mismatch("f64", target_oid)),
        }
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            // Note: potential precision loss
            oid::FLOAT4 => buf.extend_from_slice(&(*self as f32).to_bits().to_be_bytes()),
            oid::FLOAT8 => buf.extend_from_slice(&self.to_bits().to_be_bytes()),
            oid::NUMERIC => write_numeric_binary(&format_f64(*self), buf)?,
            _ => return Err(Error::type_mismatch("f64", target_oid)),
        }
        Ok(())
    }
}

impl NativeType for f32 {
    const KIND: ValueKind = ValueKind::Float4;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float4(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Float4(self)
    }
}

impl NativeType for f64 {
    const KIND: ValueKind = ValueKind::Float8;

    fn accepts(kind: ValueKind) -> bool {
        matches!(kind, ValueKind::Float4 | ValueKind::Float8)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float4(v) => Ok(f64::from(v)),
            Value::Float8(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Float8(self)
    }
}
