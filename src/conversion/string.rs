//! String type implementations (&str, String).

use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::numeric_util::numeric_to_string;
use super::{FromWireValue, ToWireValue, utf8};

/// Version byte that prefixes binary `jsonb`.
const JSONB_VERSION: u8 = 1;

/// Types whose text and binary forms are both the UTF-8 string.
pub(crate) fn is_text_like(oid: Oid) -> bool {
    matches!(
        oid,
        oid::TEXT
            | oid::VARCHAR
            | oid::BPCHAR
            | oid::NAME
            | oid::CHAR
            | oid::UNKNOWN
            | oid::JSON
            | oid::XML
    )
}

/// Strip the `jsonb` version byte from a binary payload.
fn jsonb_body(bytes: &[u8]) -> Result<&[u8]> {
    match bytes.split_first() {
        Some((&JSONB_VERSION, body)) => Ok(body),
        Some((version, _)) => Err(Error::malformed(
            "jsonb",
            format!("unsupported version {version}"),
        )),
        None => Err(Error::truncated("jsonb", 1, 0)),
    }
}

impl<'a> FromWireValue<'a> for &'a str {
    fn from_text(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        if !is_text_like(oid) && oid != oid::JSONB {
            return Err(Error::type_mismatch("str", oid));
        }
        utf8(bytes, "text")
    }

    fn from_binary(oid: Oid, bytes: &'a [u8]) -> Result<Self> {
        match oid {
            oid::JSONB => utf8(jsonb_body(bytes)?, "jsonb"),
            _ if is_text_like(oid) => utf8(bytes, "text"),
            _ => Err(Error::type_mismatch("str", oid)),
        }
    }
}

impl FromWireValue<'_> for String {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::NUMERIC => Ok(utf8(bytes, "numeric")?.to_owned()),
            _ => <&str>::from_text(oid, bytes).map(str::to_owned),
        }
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        match oid {
            oid::NUMERIC => numeric_to_string(bytes),
            _ => <&str>::from_binary(oid, bytes).map(str::to_owned),
        }
    }
}

impl ToWireValue for str {
    fn natural_oid(&self) -> Oid {
        oid::TEXT
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if !is_text_like(target_oid) && target_oid != oid::JSONB {
            return Err(Error::type_mismatch("str", target_oid));
        }
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::JSONB => buf.push(JSONB_VERSION),
            _ if is_text_like(target_oid) => {}
            _ => return Err(Error::type_mismatch("str", target_oid)),
        }
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl ToWireValue for String {
    fn natural_oid(&self) -> Oid {
        oid::TEXT
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_str().to_text(target_oid, buf)
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        self.as_str().to_binary(target_oid, buf)
    }
}

impl NativeType for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}
