//! NUMERIC binary format helpers.
//!
//! Binary format:
//! - 2 bytes: ndigits (number of base-10000 digits)
//! - 2 bytes: weight (position of first digit relative to decimal point)
//! - 2 bytes: sign (0x0000=positive, 0x4000=negative, 0xC000=NaN, 0xD000=+Inf, 0xF000=-Inf)
//! - 2 bytes: dscale (display scale)
//! - ndigits * 2 bytes: digits (each 0-9999 in base 10000)
//!
//! Values are carried as their decimal text so no precision is lost between
//! the two formats.

use crate::error::{Error, Result};
use crate::protocol::codec::{read_i16, read_u16, write_i16, write_u16};
use crate::protocol::types::{Oid, oid};

use super::ToWireValue;

// NUMERIC sign constants
const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

const NUMERIC_MAX_DSCALE: usize = 0x3FFF;
// Keeps a hostile exponent from allocating gigabytes of zeros.
const MAX_EXPONENT: i64 = 0x3FFF * 4;

/// Converts PostgreSQL NUMERIC binary encoding to its decimal text.
///
/// Follows `get_str_from_var()` in `numeric.c`: the integer part drops
/// leading zeros and the fraction has exactly `dscale` digits.
pub fn numeric_to_string(bytes: &[u8]) -> Result<String> {
    let (ndigits, rest) = read_i16(bytes, "numeric")?;
    let (weight, rest) = read_i16(rest, "numeric")?;
    let (sign, rest) = read_u16(rest, "numeric")?;
    let (dscale, mut rest) = read_u16(rest, "numeric")?;

    // Handle special values
    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => {
            return Err(Error::malformed(
                "numeric",
                format!("invalid sign 0x{other:04X}"),
            ));
        }
    }
    let ndigits = usize::try_from(ndigits)
        .map_err(|_| Error::malformed("numeric", format!("negative digit count {ndigits}")))?;

    // Each base-10000 digit expands to exactly 4 decimal digits.
    let mut decimal = String::with_capacity(ndigits * 4);
    for _ in 0..ndigits {
        let (digit, tail) = read_i16(rest, "numeric")?;
        rest = tail;
        if !(0..10000).contains(&digit) {
            return Err(Error::malformed("numeric", format!("digit {digit} out of range")));
        }
        decimal.push_str(&format!("{digit:04}"));
    }

    // Decimal point position within `decimal`
    let point = (i64::from(weight) + 1) * 4;
    let (int_part, frac_part) = if point <= 0 {
        let zeros = "0".repeat(usize::try_from(-point).unwrap_or_default());
        (String::new(), zeros + &decimal)
    } else {
        let point = usize::try_from(point).unwrap_or_default();
        if point >= decimal.len() {
            let zeros = "0".repeat(point - decimal.len());
            (decimal + &zeros, String::new())
        } else {
            let frac = decimal.split_off(point);
            (decimal, frac)
        }
    };

    let mut result = String::new();
    if sign == NUMERIC_NEG && ndigits > 0 {
        result.push('-');
    }
    let int_part = int_part.trim_start_matches('0');
    result.push_str(if int_part.is_empty() { "0" } else { int_part });

    let dscale = usize::from(dscale);
    if dscale > 0 {
        result.push('.');
        if frac_part.len() >= dscale {
            result.push_str(&frac_part[..dscale]);
        } else {
            result.push_str(&frac_part);
            result.push_str(&"0".repeat(dscale - frac_part.len()));
        }
    }
    Ok(result)
}

/// Decode PostgreSQL NUMERIC binary format to f64.
pub fn numeric_to_f64(bytes: &[u8]) -> Result<f64> {
    let text = numeric_to_string(bytes)?;
    let value: f64 = text
        .parse()
        .map_err(|e| Error::malformed("numeric", format!("{e}: {text:?}")))?;
    if value.is_infinite() && !text.ends_with("Infinity") {
        return Err(Error::overflow("NUMERIC", "f64"));
    }
    Ok(value)
}

/// A NUMERIC literal split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericLiteral<'a> {
    /// `NaN` or an infinity, carrying its binary sign word
    Special(u16),
    Finite {
        negative: bool,
        int_digits: &'a str,
        frac_digits: &'a str,
        exponent: i64,
    },
}

/// Check decimal text against the grammar of PostgreSQL's `numeric_in`: an
/// optional sign, digits with an optional point, an optional `e` exponent,
/// and the special values `NaN`, `Infinity` and `-Infinity`.
pub(crate) fn parse_numeric_text(text: &str) -> Result<NumericLiteral<'_>> {
    let text = text.trim();
    let special = match text.to_ascii_lowercase().as_str() {
        "nan" | "+nan" | "-nan" => Some(NUMERIC_NAN),
        "infinity" | "+infinity" | "inf" | "+inf" => Some(NUMERIC_PINF),
        "-infinity" | "-inf" => Some(NUMERIC_NINF),
        _ => None,
    };
    if let Some(sign) = special {
        return Ok(NumericLiteral::Special(sign));
    }

    let malformed = || Error::malformed("numeric", format!("{text:?}"));
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => {
            let exp: i64 = unsigned[pos + 1..].parse().map_err(|_| malformed())?;
            (&unsigned[..pos], exp)
        }
        None => (unsigned, 0),
    };
    if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(Error::overflow("numeric exponent", "NUMERIC"));
    }
    let (int_digits, frac_digits) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_digits.is_empty() && frac_digits.is_empty())
        || !all_digits(int_digits)
        || !all_digits(frac_digits)
    {
        return Err(malformed());
    }
    Ok(NumericLiteral::Finite {
        negative,
        int_digits,
        frac_digits,
        exponent,
    })
}

/// Encode decimal text (optionally with an exponent) as binary NUMERIC.
///
/// Accepts what [`parse_numeric_text`] accepts.
pub fn write_numeric_binary(text: &str, buf: &mut Vec<u8>) -> Result<()> {
    let (negative, int_digits, frac_digits, exponent) = match parse_numeric_text(text)? {
        NumericLiteral::Special(sign) => {
            write_header(buf, 0, 0, sign, 0);
            return Ok(());
        }
        NumericLiteral::Finite {
            negative,
            int_digits,
            frac_digits,
            exponent,
        } => (negative, int_digits, frac_digits, exponent),
    };

    // Shift the decimal point by the exponent.
    let mut digits = format!("{int_digits}{frac_digits}");
    let frac_len = i64::try_from(frac_digits.len()).unwrap_or(i64::MAX);
    let mut point = i64::try_from(int_digits.len()).unwrap_or(i64::MAX) + exponent;
    let dscale = usize::try_from((frac_len - exponent).max(0)).unwrap_or(usize::MAX);
    if dscale > NUMERIC_MAX_DSCALE {
        return Err(Error::overflow("numeric scale", "NUMERIC"));
    }
    if point < 0 {
        digits.insert_str(0, &"0".repeat(usize::try_from(-point).unwrap_or_default()));
        point = 0;
    }
    let point = usize::try_from(point).unwrap_or_default();
    if point > digits.len() {
        digits.push_str(&"0".repeat(point - digits.len()));
    }

    // Align both sides of the point to groups of 4 digits.
    let lead = (4 - point % 4) % 4;
    digits.insert_str(0, &"0".repeat(lead));
    let trail = (4 - digits.len() % 4) % 4;
    digits.push_str(&"0".repeat(trail));

    let mut groups: Vec<i16> = digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0_i16, |acc, b| acc * 10 + i16::from(b - b'0'))
        })
        .collect();
    let mut weight = i64::try_from((point + lead) / 4).unwrap_or(i64::MAX) - 1;

    // Strip zero groups on both ends.
    let leading_zeros = groups.iter().take_while(|&&g| g == 0).count();
    groups.drain(..leading_zeros);
    weight -= i64::try_from(leading_zeros).unwrap_or_default();
    while groups.last() == Some(&0) {
        groups.pop();
    }

    let dscale = u16::try_from(dscale).map_err(|_| Error::overflow("numeric scale", "NUMERIC"))?;
    if groups.is_empty() {
        write_header(buf, 0, 0, NUMERIC_POS, dscale);
        return Ok(());
    }
    let ndigits =
        i16::try_from(groups.len()).map_err(|_| Error::overflow("numeric digits", "NUMERIC"))?;
    let weight = i16::try_from(weight).map_err(|_| Error::overflow("numeric weight", "NUMERIC"))?;
    let sign = if negative { NUMERIC_NEG } else { NUMERIC_POS };
    write_header(buf, ndigits, weight, sign, dscale);
    for group in groups {
        write_i16(buf, group);
    }
    Ok(())
}

fn write_header(buf: &mut Vec<u8>, ndigits: i16, weight: i16, sign: u16, dscale: u16) {
    write_i16(buf, ndigits);
    write_i16(buf, weight);
    write_u16(buf, sign);
    write_u16(buf, dscale);
}

/// Decimal text encoded as NUMERIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericText<'a>(pub &'a str);

impl ToWireValue for NumericText<'_> {
    fn natural_oid(&self) -> Oid {
        oid::NUMERIC
    }

    fn to_text(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::NUMERIC | oid::TEXT | oid::VARCHAR => {
                parse_numeric_text(self.0)?;
                buf.extend_from_slice(self.0.as_bytes());
                Ok(())
            }
            _ => Err(Error::type_mismatch("numeric", target_oid)),
        }
    }

    fn to_binary(&self, target_oid: Oid, buf: &mut Vec<u8>) -> Result<()> {
        match target_oid {
            oid::NUMERIC => write_numeric_binary(self.0, buf),
            oid::TEXT | oid::VARCHAR => {
                parse_numeric_text(self.0)?;
                buf.extend_from_slice(self.0.as_bytes());
                Ok(())
            }
            _ => Err(Error::type_mismatch("numeric", target_oid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to build NUMERIC binary representation
    fn make_numeric(ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_header(&mut buf, ndigits, weight, sign, dscale);
        for &d in digits {
            buf.extend_from_slice(&d.to_be_bytes());
        }
        buf
    }

    fn encoded(text: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        write_numeric_binary(text, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_numeric_to_string_zero() {
        let bytes = make_numeric(0, 0, 0x0000, 0, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0");

        // Zero with scale
        let bytes = make_numeric(0, 0, 0x0000, 2, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0.00");
    }

    #[test]
    fn test_numeric_to_string_simple() {
        // 12345 = 1 * 10000 + 2345, weight=1
        let bytes = make_numeric(2, 1, 0x0000, 0, &[1, 2345]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "12345");
    }

    #[test]
    fn test_numeric_to_string_decimal() {
        // 123.45: weight=0, dscale=2, digits=[123, 4500]
        let bytes = make_numeric(2, 0, 0x0000, 2, &[123, 4500]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "123.45");
        let bytes = make_numeric(2, 0, 0x4000, 2, &[123, 4500]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "-123.45");
    }

    #[test]
    fn test_numeric_to_string_small_fraction() {
        // 0.00001234: weight=-2, digits=[1234]
        let bytes = make_numeric(1, -2, 0x0000, 8, &[1234]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0.00001234");
    }

    #[test]
    fn test_numeric_to_string_trailing_integer_zeros() {
        // 20000000: weight=1, digits=[2000] with implied zero group
        let bytes = make_numeric(1, 1, 0x0000, 0, &[2000]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "20000000");
    }

    #[test]
    fn test_numeric_to_string_special_values() {
        let bytes = make_numeric(0, 0, 0xC000, 0, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "NaN");
        let bytes = make_numeric(0, 0, 0xD000, 0, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "Infinity");
        let bytes = make_numeric(0, 0, 0xF000, 0, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "-Infinity");
    }

    #[test]
    fn test_numeric_truncated() {
        assert!(matches!(
            numeric_to_string(&[0, 1, 0, 0]),
            Err(Error::TruncatedValue { .. })
        ));
        let mut bytes = make_numeric(2, 0, 0x0000, 0, &[1]);
        bytes.truncate(10);
        assert!(matches!(
            numeric_to_string(&bytes),
            Err(Error::TruncatedValue { .. })
        ));
    }

    #[test]
    fn test_write_numeric_binary() {
        assert_eq!(encoded("123.45"), make_numeric(2, 0, 0x0000, 2, &[123, 4500]));
        assert_eq!(encoded("-123.45"), make_numeric(2, 0, 0x4000, 2, &[123, 4500]));
        assert_eq!(encoded("12345"), make_numeric(2, 1, 0x0000, 0, &[1, 2345]));
        assert_eq!(encoded("0.0001"), make_numeric(1, -1, 0x0000, 4, &[1]));
        assert_eq!(encoded("0"), make_numeric(0, 0, 0x0000, 0, &[]));
        assert_eq!(encoded("-0.00"), make_numeric(0, 0, 0x0000, 2, &[]));
        assert_eq!(encoded("NaN"), make_numeric(0, 0, 0xC000, 0, &[]));
        assert_eq!(encoded("-Infinity"), make_numeric(0, 0, 0xF000, 0, &[]));
    }

    #[test]
    fn test_write_numeric_exponent() {
        assert_eq!(encoded("1.5e3"), encoded("1500"));
        assert_eq!(encoded("25e-5"), encoded("0.00025"));
    }

    #[test]
    fn test_write_numeric_rejects_garbage() {
        for text in ["", "abc", "1.2.3", "--1", "1e", "."] {
            let mut buf = Vec::new();
            assert!(
                matches!(
                    write_numeric_binary(text, &mut buf),
                    Err(Error::MalformedLiteral { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_parse_numeric_text() {
        assert_eq!(
            parse_numeric_text(" -12.50e2 ").unwrap(),
            NumericLiteral::Finite {
                negative: true,
                int_digits: "12",
                frac_digits: "50",
                exponent: 2,
            }
        );
        assert_eq!(
            parse_numeric_text("-Infinity").unwrap(),
            NumericLiteral::Special(NUMERIC_NINF)
        );
        assert!(matches!(
            parse_numeric_text("not a number"),
            Err(Error::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn test_numeric_text_checks_grammar() {
        let mut buf = Vec::new();
        assert!(NumericText("12e3").to_text(oid::NUMERIC, &mut buf).is_ok());
        assert!(matches!(
            NumericText("twelve").to_text(oid::NUMERIC, &mut buf),
            Err(Error::MalformedLiteral { .. })
        ));
        assert!(matches!(
            NumericText("twelve").to_binary(oid::TEXT, &mut buf),
            Err(Error::MalformedLiteral { .. })
        ));
        assert_eq!(buf, b"12e3");
    }

    #[test]
    fn test_numeric_text_round_trip() {
        for text in ["123.45", "-0.001", "100000000", "3.14159265358979", "0.10"] {
            assert_eq!(numeric_to_string(&encoded(text)).unwrap(), text);
        }
    }

    #[test]
    fn test_numeric_to_f64() {
        let bytes = make_numeric(2, 0, 0x0000, 2, &[123, 4500]);
        assert_eq!(numeric_to_f64(&bytes).unwrap(), 123.45);
        let bytes = make_numeric(0, 0, 0xC000, 0, &[]);
        assert!(numeric_to_f64(&bytes).unwrap().is_nan());
        let bytes = make_numeric(0, 0, 0xF000, 0, &[]);
        assert_eq!(numeric_to_f64(&bytes).unwrap(), f64::NEG_INFINITY);
    }
}
