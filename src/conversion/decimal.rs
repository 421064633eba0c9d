//! Decimal type implementation (rust_decimal crate).
//!
//! Both formats go through the decimal text, so the binary path shares the
//! base-10000 conversion with every other NUMERIC value.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::numeric_util::{numeric_to_string, write_numeric_binary};
use super::{FromWireValue, ToWireValue, utf8};

fn parse_decimal(s: &str) -> Result<Decimal> {
    match s {
        "NaN" | "Infinity" | "-Infinity" => Err(Error::overflow("NUMERIC", "Decimal")),
        _ => Decimal::from_str_exact(s)
            .or_else(|_| Decimal::from_scientific(s))
            .or_else(|_| Decimal::from_str(s))
            .map_err(|e| Error::malformed("numeric", e.to_string())),
    }
}

impl FromWireValue<'_> for Decimal {
    fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::NUMERIC {
            return Err(Error::type_mismatch("Decimal", oid));
        }
        parse_decimal(utf8(bytes, "numeric")?.trim())
    }

    fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if oid != oid::NUMERIC {
            return Err(Error::type_mismatch("Decimal", oid));
        }
        parse_decimal(&numeric_to_string(bytes)?)
    }
}

impl ToWireValue for Decimal {
    fn natural_oid(&self) -> Oid {
        oid::NUMERIC
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::NUMERIC {
            return Err(Error::type_mismatch("Decimal", target_oid));
        }
        buf.extend_from_slice(self.to_string().as_bytes());
        Ok(())
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        if target_oid != oid::NUMERIC {
            return Err(Error::type_mismatch("Decimal", target_oid));
        }
        write_numeric_binary(&self.to_string(), buf)
    }
}

impl NativeType for Decimal {
    const KIND: ValueKind = ValueKind::Numeric;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Numeric(text) => parse_decimal(&text),
            other => Err(kind_mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Numeric(self.to_string())
    }
}
