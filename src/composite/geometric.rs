//! Geometric types: `point` and `box`.

use std::cmp::Ordering;

use crate::conversion::{FromWireValue, ToWireValue};
use crate::error::{Error, Result};
use crate::protocol::types::{Oid, oid};
use crate::value::{NativeType, Value, ValueKind, kind_mismatch};

use super::{FixedComposite, FixedField, TextCursor};

/// A point `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl FixedComposite for Vec2 {
    type Field = f64;

    const ARITY: usize = 2;
    const TYPE_NAME: &'static str = "point";

    fn assemble(fields: &[f64]) -> Self {
        Self::new(fields[0], fields[1])
    }

    fn field(&self, index: usize) -> f64 {
        if index == 0 { self.x } else { self.y }
    }
}

impl FixedField for Vec2 {
    const WIDTH: usize = 16;
    const NESTED: bool = true;

    fn decode_binary(bytes: &[u8]) -> Result<Self> {
        super::decode_binary(bytes)
    }

    fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<()> {
        super::encode_binary(self, buf)
    }

    fn parse_text(cursor: &mut TextCursor<'_>) -> Result<Self> {
        super::parse_fields(cursor)
    }

    fn write_text(&self, buf: &mut Vec<u8>) {
        super::encode_text(self, buf);
    }
}

/// A rectangle given by two opposite corners.
///
/// In canonical form `p[0]` is the corner with the greater x, ties broken by
/// the greater y, and `p[1]` is the other corner. Every decode path produces
/// canonical form; encoding writes the corners as stored, so values built by
/// hand should go through [`PgBox::canonicalize`] first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PgBox {
    pub p: [Vec2; 2],
}

impl PgBox {
    /// A box from two corners in any order, canonicalized.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { p: [a, b] }.canonicalize()
    }

    /// Reorder the corners into canonical form.
    ///
    /// Uses the IEEE total order, so NaN coordinates still produce a
    /// deterministic result.
    pub fn canonicalize(self) -> Self {
        let [a, b] = self.p;
        match corner_order(&a, &b) {
            Ordering::Less => Self { p: [b, a] },
            _ => self,
        }
    }

    pub fn is_canonical(&self) -> bool {
        corner_order(&self.p[0], &self.p[1]) != Ordering::Less
    }
}

fn corner_order(a: &Vec2, b: &Vec2) -> Ordering {
    a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
}

impl FixedComposite for PgBox {
    type Field = Vec2;

    const ARITY: usize = 2;
    const TYPE_NAME: &'static str = "box";

    fn assemble(fields: &[Vec2]) -> Self {
        Self {
            p: [fields[0], fields[1]],
        }
    }

    fn field(&self, index: usize) -> Vec2 {
        self.p[index]
    }

    fn canonicalize(self) -> Self {
        PgBox::canonicalize(self)
    }
}

macro_rules! impl_geometric_wire {
    ($ty:ty, $oid:expr, $name:literal, $variant:ident) => {
        impl FromWireValue<'_> for $ty {
            fn from_text(oid: Oid, bytes: &[u8]) -> Result<Self> {
                if oid != $oid {
                    return Err(Error::type_mismatch($name, oid));
                }
                super::decode_text(bytes)
            }

            fn from_binary(oid: Oid, bytes: &[u8]) -> Result<Self> {
                if oid != $oid {
                    return Err(Error::type_mismatch($name, oid));
                }
                super::decode_binary(bytes)
            }
        }

        impl ToWireValue for $ty {
            fn natural_oid(&self) -> Oid {
                $oid
            }

            fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
                if target_oid != $oid {
                    return Err(Error::type_mismatch($name, target_oid));
                }
                super::encode_text(self, buf);
                Ok(())
            }

            fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
                if target_oid != $oid {
                    return Err(Error::type_mismatch($name, target_oid));
                }
                super::encode_binary(self, buf)
            }
        }

        impl NativeType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(kind_mismatch::<Self>(&other)),
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_geometric_wire!(Vec2, oid::POINT, "point", Point);
impl_geometric_wire!(PgBox, oid::BOX, "box", Box);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nullable::Nullable;
    use crate::protocol::types::FormatCode;

    fn binary_box(coords: [f64; 4]) -> Vec<u8> {
        coords.iter().flat_map(|c| c.to_be_bytes()).collect()
    }

    #[test]
    fn test_point_text() {
        let p = Vec2::from_text(oid::POINT, b"(1.5,-2)").unwrap();
        assert_eq!(p, Vec2::new(1.5, -2.0));
        assert_eq!(Vec2::from_text(oid::POINT, b" 3 , 4 ").unwrap(), Vec2::new(3.0, 4.0));
        let mut buf = Vec::new();
        p.to_text(oid::POINT, &mut buf).unwrap();
        assert_eq!(buf, b"(1.5,-2)");
    }

    #[test]
    fn test_box_text_grammars() {
        let expected = PgBox {
            p: [Vec2::new(7.1, 5.234), Vec2::new(3.14, 1.678)],
        };
        for text in [
            "3.14, 1.678, 7.1, 5.234",
            "(3.14,1.678),(7.1,5.234)",
            "((3.14,1.678),(7.1,5.234))",
            " ( ( 7.1 , 5.234 ) , ( 3.14 , 1.678 ) ) ",
            "(3.14, 1.678, 7.1, 5.234)",
        ] {
            assert_eq!(PgBox::from_text(oid::BOX, text.as_bytes()).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn test_box_text_malformed() {
        for text in ["(1,2,3,4", "(1,2,3,4))", "(1,2),(3,4", "1,2,3", "(1,2),(3,4),(5,6)", "", "(a,b),(c,d)"] {
            assert!(
                matches!(
                    PgBox::from_text(oid::BOX, text.as_bytes()),
                    Err(Error::MalformedLiteral { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_box_binary_canonicalizes() {
        let b = PgBox::from_binary(oid::BOX, &binary_box([3.14, 1.678, 7.1, 5.234])).unwrap();
        assert_eq!(b.p[0], Vec2::new(7.1, 5.234));
        assert_eq!(b.p[1], Vec2::new(3.14, 1.678));
    }

    #[test]
    fn test_box_order_independent() {
        let a = PgBox::from_binary(oid::BOX, &binary_box([7.1, 5.2345678, -13.14, -5.234])).unwrap();
        let b = PgBox::from_binary(oid::BOX, &binary_box([-13.14, -5.234, 7.1, 5.2345678])).unwrap();
        assert_eq!(a, b);
        let c = PgBox::from_text(oid::BOX, b"(-13.14,-5.234),(7.1,5.2345678)").unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_box_tie_on_x() {
        let b = PgBox::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 2.0));
        assert_eq!(b.p, [Vec2::new(1.0, 2.0), Vec2::new(1.0, 1.0)]);
        assert!(b.is_canonical());
    }

    #[test]
    fn test_box_truncated() {
        let bytes = binary_box([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            PgBox::from_binary(oid::BOX, &bytes[..31]).unwrap_err(),
            Error::TruncatedValue {
                type_name: "box",
                expected: 32,
                actual: 31,
            }
        );
    }

    #[test]
    fn test_box_trailing_bytes_ignored() {
        let mut bytes = binary_box([1.0, 2.0, 3.0, 4.0]);
        bytes.extend_from_slice(&[0xAA; 8]);
        let b = PgBox::from_binary(oid::BOX, &bytes).unwrap();
        assert_eq!(b.p, [Vec2::new(3.0, 4.0), Vec2::new(1.0, 2.0)]);
    }

    #[test]
    fn test_box_encode_as_stored() {
        let b = PgBox {
            p: [Vec2::new(7.1, 5.2345678), Vec2::new(3.14, 1.678)],
        };
        let mut buf = Vec::new();
        b.to_binary(oid::BOX, &mut buf).unwrap();
        assert_eq!(buf, binary_box([7.1, 5.2345678, 3.14, 1.678]));
        let mut text = Vec::new();
        b.to_text(oid::BOX, &mut text).unwrap();
        assert_eq!(text, b"(7.1,5.2345678),(3.14,1.678)");

        // Not reordered on the way out
        let swapped = PgBox { p: [b.p[1], b.p[0]] };
        let mut buf = Vec::new();
        swapped.to_binary(oid::BOX, &mut buf).unwrap();
        assert_eq!(buf, binary_box([3.14, 1.678, 7.1, 5.2345678]));
    }

    #[test]
    fn test_box_negative_zero_bit_exact() {
        let b = PgBox {
            p: [Vec2::new(0.0, -0.0), Vec2::new(-0.0, -1.0)],
        };
        let mut buf = Vec::new();
        b.to_binary(oid::BOX, &mut buf).unwrap();
        let back = PgBox::from_binary(oid::BOX, &buf).unwrap();
        assert_eq!(back.p[0].y.to_bits(), (-0.0_f64).to_bits());
        assert_eq!(back.p[1].x.to_bits(), (-0.0_f64).to_bits());
    }

    #[test]
    fn test_nullable_box() {
        let null = Nullable::<PgBox>::from_wire(oid::BOX, FormatCode::Binary, None).unwrap();
        assert!(null.is_null());
        assert_eq!(null, Nullable::<PgBox>::default());

        // Payload of an invalid box is ignored on the way out
        let garbage = Nullable {
            value: PgBox::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)),
            valid: false,
        };
        for format in [FormatCode::Text, FormatCode::Binary] {
            let mut buf = Vec::new();
            garbage.encode(oid::BOX, format, &mut buf).unwrap();
            assert_eq!(buf, (-1_i32).to_be_bytes());
        }
    }
}
