//! Cross-format normalization checks.
//!
//! A [`NormalizeTest`] pairs a single-value query such as
//! `select '3.14, 1.678, 7.1, 5.234'::box` with the value it must decode to.
//! [`test_successful_normalize`] fetches the result in both formats from a
//! [`LiteralSource`], decodes both, and requires each to equal the expected
//! value and the other. Canonical forms such as the corner order of a box are
//! pinned down this way.
//!
//! [`FixtureSource`] evaluates the query in process through the registry's
//! own codecs; a live server can be used by implementing [`LiteralSource`]
//! over a client.

use std::fmt;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::protocol::types::{FormatCode, Oid};
use crate::registry::TypeRegistry;
use crate::value::{NativeType, Value};

/// Something that can evaluate a single-column, single-row query.
pub trait LiteralSource {
    /// Run `sql` and return the result's type OID and payload in `format`,
    /// `None` for NULL.
    fn fetch(&mut self, sql: &str, format: FormatCode) -> Result<(Oid, Option<Vec<u8>>)>;
}

/// A query and the value its result must decode to.
#[derive(Debug, Clone)]
pub struct NormalizeTest<T> {
    pub sql: String,
    pub value: T,
}

impl<T> NormalizeTest<T> {
    pub fn new(sql: impl Into<String>, value: T) -> Self {
        Self {
            sql: sql.into(),
            value,
        }
    }
}

/// A failed normalization case.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The source or the decoder failed
    #[error("{sql} ({format:?}): {source}")]
    Decode {
        sql: String,
        format: FormatCode,
        source: Error,
    },

    /// A decoded result differs from the expected value
    #[error("{sql} ({format:?}): expected {expected}, got {actual}")]
    Mismatch {
        sql: String,
        format: FormatCode,
        expected: String,
        actual: String,
    },

    /// The two formats decode to different values
    #[error("{sql}: text result {text} differs from binary result {binary}")]
    FormatsDisagree {
        sql: String,
        text: String,
        binary: String,
    },
}

/// Check every case against `source`, stopping at the first failure.
pub fn test_successful_normalize<T, S>(
    source: &mut S,
    registry: &TypeRegistry,
    cases: &[NormalizeTest<T>],
) -> core::result::Result<(), NormalizeError>
where
    T: NativeType + PartialEq + fmt::Debug,
    S: LiteralSource + ?Sized,
{
    for case in cases {
        let binary = fetch_decoded::<T, S>(source, registry, &case.sql, FormatCode::Binary)?;
        let text = fetch_decoded::<T, S>(source, registry, &case.sql, FormatCode::Text)?;
        for (format, actual) in [(FormatCode::Binary, &binary), (FormatCode::Text, &text)] {
            if *actual != case.value {
                return Err(NormalizeError::Mismatch {
                    sql: case.sql.clone(),
                    format,
                    expected: format!("{:?}", case.value),
                    actual: format!("{:?}", actual),
                });
            }
        }
        if text != binary {
            return Err(NormalizeError::FormatsDisagree {
                sql: case.sql.clone(),
                text: format!("{:?}", text),
                binary: format!("{:?}", binary),
            });
        }
        tracing::debug!(sql = %case.sql, "normalized");
    }
    Ok(())
}

fn fetch_decoded<T, S>(
    source: &mut S,
    registry: &TypeRegistry,
    sql: &str,
    format: FormatCode,
) -> core::result::Result<T, NormalizeError>
where
    T: NativeType,
    S: LiteralSource + ?Sized,
{
    let decode = |source: &mut S| -> Result<T> {
        let (oid, bytes) = source.fetch(sql, format)?;
        registry.decode_as::<T>(oid, format, bytes.as_deref())
    };
    decode(source).map_err(|source| NormalizeError::Decode {
        sql: sql.to_owned(),
        format,
        source,
    })
}

/// In-process [`LiteralSource`] for `select '<literal>'::<type>` queries.
///
/// The literal goes through the registered codec's text decoder, standing in
/// for the server's input function, and the result is written back in the
/// requested format by the same codec.
#[derive(Debug, Clone, Copy)]
pub struct FixtureSource<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> FixtureSource<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a type name as written in a cast.
    fn resolve(&self, name: &str) -> Result<Oid> {
        let name = name.trim().to_ascii_lowercase();
        let (base, is_array) = match name.strip_suffix("[]") {
            Some(base) => (base.trim_end(), true),
            None => (name.as_str(), false),
        };
        let base = match base {
            "int" | "integer" => "int4",
            "smallint" => "int2",
            "bigint" => "int8",
            "real" => "float4",
            "double precision" => "float8",
            "boolean" => "bool",
            "decimal" => "numeric",
            "character varying" => "varchar",
            "character" => "bpchar",
            "timestamp with time zone" => "timestamptz",
            "timestamp without time zone" => "timestamp",
            other => other,
        };
        let lookup = if is_array {
            format!("_{base}")
        } else {
            base.to_owned()
        };
        self.registry
            .oid_by_name(&lookup)
            .ok_or_else(|| Error::InvalidUsage(format!("type \"{}\" does not exist", name)))
    }
}

/// Split `select '<literal>'::<type>` into the literal (`None` for
/// `null::<type>`) and the type name.
fn parse_cast(sql: &str) -> Result<(Option<String>, &str)> {
    let invalid = || Error::InvalidUsage(format!("unsupported fixture query: {}", sql));
    let sql = sql.trim().trim_end_matches(';').trim_end();
    let (keyword, rest) = sql.split_once(char::is_whitespace).ok_or_else(invalid)?;
    if !keyword.eq_ignore_ascii_case("select") {
        return Err(invalid());
    }
    let rest = rest.trim_start();

    if let Some(quoted) = rest.strip_prefix('\'') {
        // '' is an escaped quote
        let mut literal = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                literal.push(c);
                continue;
            }
            if quoted[i + 1..].starts_with('\'') {
                literal.push('\'');
                chars.next();
                continue;
            }
            let type_name = quoted[i + 1..].strip_prefix("::").ok_or_else(invalid)?;
            return Ok((Some(literal), type_name));
        }
        return Err(invalid());
    }

    let (null, type_name) = rest.split_once("::").ok_or_else(invalid)?;
    if null.trim().eq_ignore_ascii_case("null") {
        Ok((None, type_name))
    } else {
        Err(invalid())
    }
}

impl LiteralSource for FixtureSource<'_> {
    fn fetch(&mut self, sql: &str, format: FormatCode) -> Result<(Oid, Option<Vec<u8>>)> {
        let (literal, type_name) = parse_cast(sql)?;
        let oid = self.resolve(type_name)?;
        let Some(literal) = literal else {
            self.registry.lookup(oid)?;
            return Ok((oid, None));
        };
        let value: Value = self
            .registry
            .decode(oid, FormatCode::Text, Some(literal.as_bytes()))?;
        let mut buf = Vec::new();
        self.registry.encode_payload(&value, oid, format, &mut buf)?;
        Ok((oid, Some(buf)))
    }
}
