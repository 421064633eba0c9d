//! UUID type implementation (uuid crate).

use crate::error::{Error, Result};
use crate::protocol::codec::read_fixed;
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::{FromWireValue, ToWireValue, utf8};

impl FromWireValue<'_> for uuid::Uuid {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::UUID {
            return Err(Error::type_mismatch("uuid", oid));
        }
        let s = utf8(bytes, "uuid")?;
        uuid::Uuid::parse_str(s.trim()).map_err(|e| Error::malformed("uuid", e.to_string()))
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::UUID {
            return Err(Error::type_mismatch("uuid", oid));
        }
        Ok(uuid::Uuid::from_bytes(read_fixed(bytes, "uuid")?))
    }
}

impl ToWireValue for uuid::Uuid {
    fn natural_oid(&self) -> Oid {
        oid::UUID
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::UUID {
            return Err(Error::type_mismatch("uuid", target_oid));
        }
        let mut text = uuid::Uuid::encode_buffer();
        buf.extend_from_slice(self.hyphenated().encode_lower(&mut text).as_bytes());
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::UUID {
            return Err(Error::type_mismatch("uuid", target_oid));
        }
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl NativeType for uuid::Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11";
    const BYTES: [u8; 16] = [
        0xa0, 0xee, 0xbc, 0x99, 0x9c, 0x0b, 0x4e, 0xf8, 0xbb, 0x6d, 0x6b, 0xb9, 0xbd, 0x38, 0x0a,
        0x11,
    ];

    #[test]
    fn test_uuid_text() {
        let uuid = uuid::Uuid::from_text(oid::UUID, TEXT.as_bytes()).unwrap();
        assert_eq!(uuid.to_string(), TEXT);
        let mut buf = Vec::new();
        uuid.to_text(oid::UUID, &mut buf).unwrap();
        assert_eq!(buf, TEXT.as_bytes());
    }

    #[test]
    fn test_uuid_binary() {
        let uuid = uuid::Uuid::from_binary(oid::UUID, &BYTES).unwrap();
        assert_eq!(uuid.to_string(), TEXT);
        let mut buf = Vec::new();
        uuid.to_binary(oid::UUID, &mut buf).unwrap();
        assert_eq!(buf, BYTES);
    }

    #[test]
    fn test_uuid_truncated() {
        assert!(matches!(
            uuid::Uuid::from_binary(oid::UUID, &BYTES[..15]),
            Err(Error::TruncatedValue {
                expected: 16,
                actual: 15,
                ..
            })
        ));
    }
}
