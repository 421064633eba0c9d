//! Byte type implementations (`&[u8]`, `Vec<u8>`).

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::{FromWireValue, ToWireValue};

const HEX: &[u8; 16] = b"0123456789abcdef";

impl<'a> FromWireValue<'a> for &'a [u8] {
    /// Text bytea needs unescaping and cannot be borrowed; use `Vec<u8>`.
    fn from_text(oid: Oid, _bytes: &'a [u8]) -> Result<Self> {
        if oid != oid::BYTEA {
            return Err(Error::type_mismatch("bytes", oid));
        }
        Err(Error::unsupported("borrowed bytea", FormatCode::Text))
    }

    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        if oid != oid::BYTEA {
            return Err(Error::type_mismatch("bytes", oid));
        }
        Ok(bytes)
    }
}

impl FromWireValue<'_> for Vec<u8> {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BYTEA {
            return Err(Error::type_mismatch("Vec<u8>", oid));
        }
        // Text format for bytea is hex-encoded: \xDEADBEEF
        match bytes.strip_prefix(b"\\x") {
            Some(hex) => decode_hex(hex),
            None => decode_escape(bytes),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::BYTEA {
            return Err(Error::type_mismatch("Vec<u8>", oid));
        }
        Ok(bytes.to_vec())
    }
}

impl ToWireValue for [u8] {
    fn natural_oid(&self) -> Oid {
        oid::BYTEA
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::BYTEA {
            return Err(Error::type_mismatch("bytes", target_oid));
        }
        buf.reserve(2 + self.len() * 2);
        buf.extend_from_slice(b"\\x");
        for &b in self {
            buf.push(HEX[usize::from(b >> 4)]);
            buf.push(HEX[usize::from(b & 0x0F)]);
        }
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::BYTEA {
            return Err(Error::type_mismatch("bytes", target_oid));
        }
        buf.extend_from_slice(self);
        Ok(())
    }
}

impl ToWireValue for Vec<u8> {
    fn natural_oid(&self) -> Oid {
        oid::BYTEA
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_slice().to_text(target_oid, buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_slice().to_binary(target_oid, buf)
    }
}

impl NativeType for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytea;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytea(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Bytea(self)
    }
}

/// Decode hex string to bytes
fn decode_hex(hex: &[u8]) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Error::malformed("bytea", "odd number of hex digits"));
    }

    let mut result = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        result.push((high << 4) | low);
    }
    Ok(result)
}

fn hex_digit(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::malformed(
            "bytea",
            format!("invalid hex digit: {:?}", b as char),
        )),
    }
}

/// Decode the legacy escape format: `\\` and `\ooo` octal, everything else literal.
fn decode_escape(text: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = memchr::memchr(b'\\', rest) {
        result.extend_from_slice(&rest[..pos]);
        rest = &rest[pos + 1..];
        match rest {
            [b'\\', tail @ ..] => {
                result.push(b'\\');
                rest = tail;
            }
            [a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', tail @ ..] => {
                result.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                rest = tail;
            }
            _ => return Err(Error::malformed("bytea", "invalid escape sequence")),
        }
    }
    result.extend_from_slice(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytea_hex() {
        assert_eq!(
            Vec::<u8>::from_text(oid::BYTEA, b"\\xDEADBEEF").unwrap(),
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );
        assert!(Vec::<u8>::from_text(oid::BYTEA, b"\\xABC").is_err());
    }

    #[test]
    fn test_bytea_escape() {
        assert_eq!(
            Vec::<u8>::from_text(oid::BYTEA, b"a\\\\b\\000\\377").unwrap(),
            vec![b'a', b'\\', b'b', 0, 0xFF]
        );
        assert!(Vec::<u8>::from_text(oid::BYTEA, b"\\9").is_err());
    }

    #[test]
    fn test_bytea_encode_text() {
        let mut buf = Vec::new();
        vec![0x00_u8, 0xAB, 0x10].to_text(oid::BYTEA, &mut buf).unwrap();
        assert_eq!(buf, b"\\x00ab10");
        let back = Vec::<u8>::from_text(oid::BYTEA, &buf).unwrap();
        assert_eq!(back, [0x00, 0xAB, 0x10]);
    }

    #[test]
    fn test_borrowed_binary() {
        let data = [1_u8, 2, 3];
        assert_eq!(<&[u8]>::from_binary(oid::BYTEA, &data).unwrap(), &data);
    }
}
