//! Common PostgreSQL wire protocol types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// PostgreSQL Object Identifier (OID)
pub type Oid = u32;

/// Built-in type OIDs from `pg_type.dat`.
pub mod oid {
    use super::Oid;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const CHAR: Oid = 18;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const JSON: Oid = 114;
    pub const XML: Oid = 142;
    pub const POINT: Oid = 600;
    pub const BOX: Oid = 603;
    pub const CIDR: Oid = 650;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const UNKNOWN: Oid = 705;
    pub const MONEY: Oid = 790;
    pub const MACADDR: Oid = 829;
    pub const INET: Oid = 869;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const INTERVAL: Oid = 1186;
    pub const TIMETZ: Oid = 1266;
    pub const NUMERIC: Oid = 1700;
    pub const RECORD: Oid = 2249;
    pub const UUID: Oid = 2950;
    pub const JSONB: Oid = 3802;

    pub const JSON_ARRAY: Oid = 199;
    pub const XML_ARRAY: Oid = 143;
    pub const CIDR_ARRAY: Oid = 651;
    pub const MONEY_ARRAY: Oid = 791;
    pub const BOOL_ARRAY: Oid = 1000;
    pub const BYTEA_ARRAY: Oid = 1001;
    pub const CHAR_ARRAY: Oid = 1002;
    pub const NAME_ARRAY: Oid = 1003;
    pub const INT2_ARRAY: Oid = 1005;
    pub const INT4_ARRAY: Oid = 1007;
    pub const TEXT_ARRAY: Oid = 1009;
    pub const BPCHAR_ARRAY: Oid = 1014;
    pub const VARCHAR_ARRAY: Oid = 1015;
    pub const INT8_ARRAY: Oid = 1016;
    pub const POINT_ARRAY: Oid = 1017;
    pub const BOX_ARRAY: Oid = 1020;
    pub const FLOAT4_ARRAY: Oid = 1021;
    pub const FLOAT8_ARRAY: Oid = 1022;
    pub const OID_ARRAY: Oid = 1028;
    pub const MACADDR_ARRAY: Oid = 1040;
    pub const INET_ARRAY: Oid = 1041;
    pub const TIMESTAMP_ARRAY: Oid = 1115;
    pub const DATE_ARRAY: Oid = 1182;
    pub const TIME_ARRAY: Oid = 1183;
    pub const TIMESTAMPTZ_ARRAY: Oid = 1185;
    pub const INTERVAL_ARRAY: Oid = 1187;
    pub const NUMERIC_ARRAY: Oid = 1231;
    pub const TIMETZ_ARRAY: Oid = 1270;
    pub const UUID_ARRAY: Oid = 2951;
    pub const JSONB_ARRAY: Oid = 3807;

    /// (array OID, element OID) for every built-in array type.
    pub const ARRAY_TYPES: &[(Oid, Oid)] = &[
        (JSON_ARRAY, JSON),
        (XML_ARRAY, XML),
        (CIDR_ARRAY, CIDR),
        (MONEY_ARRAY, MONEY),
        (BOOL_ARRAY, BOOL),
        (BYTEA_ARRAY, BYTEA),
        (CHAR_ARRAY, CHAR),
        (NAME_ARRAY, NAME),
        (INT2_ARRAY, INT2),
        (INT4_ARRAY, INT4),
        (TEXT_ARRAY, TEXT),
        (BPCHAR_ARRAY, BPCHAR),
        (VARCHAR_ARRAY, VARCHAR),
        (INT8_ARRAY, INT8),
        (POINT_ARRAY, POINT),
        (BOX_ARRAY, BOX),
        (FLOAT4_ARRAY, FLOAT4),
        (FLOAT8_ARRAY, FLOAT8),
        (OID_ARRAY, OID),
        (MACADDR_ARRAY, MACADDR),
        (INET_ARRAY, INET),
        (TIMESTAMP_ARRAY, TIMESTAMP),
        (DATE_ARRAY, DATE),
        (TIME_ARRAY, TIME),
        (TIMESTAMPTZ_ARRAY, TIMESTAMPTZ),
        (INTERVAL_ARRAY, INTERVAL),
        (NUMERIC_ARRAY, NUMERIC),
        (TIMETZ_ARRAY, TIMETZ),
        (UUID_ARRAY, UUID),
        (JSONB_ARRAY, JSONB),
    ];

    /// Element OID of a built-in array type.
    pub fn element_of(array_oid: Oid) -> Option<Oid> {
        ARRAY_TYPES
            .iter()
            .find(|(array, _)| *array == array_oid)
            .map(|(_, element)| *element)
    }

    /// Array literal delimiter of a built-in element type.
    pub fn delimiter_of(element_oid: Oid) -> u8 {
        match element_oid {
            BOX => b';',
            _ => b',',
        }
    }

    /// Array OID whose elements are the given built-in type.
    pub fn array_of(element_oid: Oid) -> Option<Oid> {
        ARRAY_TYPES
            .iter()
            .find(|(_, element)| *element == element_oid)
            .map(|(array, _)| *array)
    }
}

/// Data format code in PostgreSQL protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum FormatCode {
    /// Text format (human-readable)
    #[default]
    Text = 0,
    /// Binary format (type-specific packed representation)
    Binary = 1,
}

impl FormatCode {
    /// Create a FormatCode from a raw u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => FormatCode::Binary,
            _ => FormatCode::Text, // Default to text for unknown values
        }
    }
}

impl From<u16> for FormatCode {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

/// Big-endian 16-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U16BE([u8; 2]);

impl U16BE {
    /// Create a new U16BE from a native u16.
    pub const fn new(value: u16) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native u16 value.
    pub const fn get(self) -> u16 {
        u16::from_be_bytes(self.0)
    }
}

/// Big-endian 16-bit signed integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct I16BE([u8; 2]);

impl I16BE {
    /// Create a new I16BE from a native i16.
    pub const fn new(value: i16) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native i16 value.
    pub const fn get(self) -> i16 {
        i16::from_be_bytes(self.0)
    }
}

/// Big-endian 32-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U32BE([u8; 4]);

impl U32BE {
    /// Create a new U32BE from a native u32.
    pub const fn new(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native u32 value.
    pub const fn get(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

/// Big-endian 32-bit signed integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct I32BE([u8; 4]);

impl I32BE {
    /// Create a new I32BE from a native i32.
    pub const fn new(value: i32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native i32 value.
    pub const fn get(self) -> i32 {
        i32::from_be_bytes(self.0)
    }
}

impl From<i32> for I32BE {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<I32BE> for i32 {
    fn from(value: I32BE) -> Self {
        value.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_lookup() {
        assert_eq!(oid::element_of(oid::TEXT_ARRAY), Some(oid::TEXT));
        assert_eq!(oid::array_of(oid::BOX), Some(oid::BOX_ARRAY));
        assert_eq!(oid::element_of(oid::TEXT), None);
    }

    #[test]
    fn test_format_code() {
        assert_eq!(FormatCode::from(1), FormatCode::Binary);
        assert_eq!(FormatCode::from(0), FormatCode::Text);
        assert_eq!(FormatCode::from(7), FormatCode::Text);
    }
}
