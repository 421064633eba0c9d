//! Row decoding traits and implementations.

use crate::conversion::FromWireValue;
use crate::error::{Error, Result};
use crate::value::WireValue;

/// Trait for decoding a row of wire values into a Rust type.
pub trait FromRow<'a>: Sized {
    /// Decode a row, one wire value per column.
    fn from_row(row: &[WireValue<'a>]) -> Result<Self>;
}

/// Implementation for empty tuple - used for statements that don't return rows
impl FromRow<'_> for () {
    fn from_row(_row: &[WireValue<'_>]) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_from_row_tuple {
    ($count:literal: $($idx:tt => $T:ident),+) => {
        impl<'a, $($T: FromWireValue<'a>),+> FromRow<'a> for ($($T,)+) {
            fn from_row(row: &[WireValue<'a>]) -> Result<Self> {
                if row.len() != $count {
                    return Err(Error::InvalidUsage(format!(
                        "row has {} columns, tuple has {}",
                        row.len(),
                        $count
                    )));
                }
                Ok(($(
                    row[$idx].decode::<$T>()?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(1: 0 => T1);
impl_from_row_tuple!(2: 0 => T1, 1 => T2);
impl_from_row_tuple!(3: 0 => T1, 1 => T2, 2 => T3);
impl_from_row_tuple!(4: 0 => T1, 1 => T2, 2 => T3, 3 => T4);
impl_from_row_tuple!(5: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5);
impl_from_row_tuple!(6: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6);
impl_from_row_tuple!(7: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7);
impl_from_row_tuple!(8: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{FormatCode, oid};

    #[test]
    fn test_from_row_mixed_formats() {
        let id = 7_i32.to_be_bytes();
        let row = [
            WireValue::new(oid::INT4, FormatCode::Binary, Some(&id)),
            WireValue::new(oid::TEXT, FormatCode::Text, Some(b"seven")),
            WireValue::new(oid::FLOAT8, FormatCode::Text, None),
        ];
        let (a, b, c): (i32, String, Option<f64>) = FromRow::from_row(&row).unwrap();
        assert_eq!(a, 7);
        assert_eq!(b, "seven");
        assert_eq!(c, None);
    }

    #[test]
    fn test_from_row_column_count() {
        let row = [WireValue::new(oid::INT4, FormatCode::Text, Some(b"1"))];
        assert!(matches!(
            <(i32, i32)>::from_row(&row),
            Err(Error::InvalidUsage(_))
        ));
    }

    #[test]
    fn test_from_row_null_into_non_nullable() {
        let row = [WireValue::new(oid::INT4, FormatCode::Text, None)];
        assert_eq!(<(i32,)>::from_row(&row).unwrap_err(), Error::UnexpectedNull);
    }
}
