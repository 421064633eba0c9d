//! Registry options.

use url::Url;

use crate::error::Error;

/// How [`TypeRegistry::decode_wire`](crate::TypeRegistry::decode_wire) treats
/// a column whose type has no registered codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypes {
    /// Pass the bytes through as [`Value::Raw`](crate::Value::Raw)
    #[default]
    Raw,
    /// Fail with `UnknownType`
    Error,
}

/// Preferred parameter format for NUMERIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericFormat {
    /// Send the decimal text
    #[default]
    Text,
    /// Send the base-10000 binary form
    Binary,
}

/// Options for a [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Treatment of unregistered types when decoding columns.
    ///
    /// Default: `UnknownTypes::Raw`
    pub unknown_types: UnknownTypes,

    /// Register text-only codecs for built-in types without a binary codec
    /// (interval, inet, money, ...).
    ///
    /// Default: `true`
    pub text_fallback: bool,

    /// Format reported by `preferred_format` for NUMERIC.
    ///
    /// Default: `NumericFormat::Text`
    pub numeric_format: NumericFormat,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            unknown_types: UnknownTypes::Raw,
            text_fallback: true,
            numeric_format: NumericFormat::Text,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "True" | "1" | "yes" | "on" => Ok(true),
        "false" | "False" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidUsage(format!("Invalid {}: {}", key, value))),
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Read registry options from a PostgreSQL connection URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database][?param1=value1&..]`
    ///
    /// Supported query parameters:
    /// - `unknown_types`: raw, error
    /// - `text_fallback`: true/True/1/yes/on or false/False/0/no/off
    /// - `numeric_format`: text, binary
    ///
    /// Other parameters configure the connection and are ignored here.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["postgres", "pg"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "unknown_types" => {
                    opts.unknown_types = match value.as_ref() {
                        "raw" => UnknownTypes::Raw,
                        "error" => UnknownTypes::Error,
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid unknown_types: expected one of ['raw', 'error'], got {}",
                                value
                            )));
                        }
                    };
                }
                "text_fallback" => {
                    opts.text_fallback = parse_bool("text_fallback", &value)?;
                }
                "numeric_format" => {
                    opts.numeric_format = match value.as_ref() {
                        "text" => NumericFormat::Text,
                        "binary" => NumericFormat::Binary,
                        _ => {
                            return Err(Error::InvalidUsage(format!(
                                "Invalid numeric_format: expected one of ['text', 'binary'], got {}",
                                value
                            )));
                        }
                    };
                }
                _ => {}
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}
