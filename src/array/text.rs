//! Text array literal: `{1,2,NULL}`, `{{1,2},{3,4}}`, `[0:1]={a,b}`.
//!
//! Elements are handed to the element codec as raw bytes with one level of
//! quoting and backslash escapes removed. Unquoted `NULL` (any case) is a
//! NULL element.

use std::borrow::Cow;

use memchr::memchr2;

use crate::error::{Error, Result};
use crate::nullable::Nullable;

use super::{ArrayDimension, MAX_DIMENSIONS, element_count};

const TYPE_NAME: &str = "array";

/// An array literal split into its elements.
#[derive(Debug)]
pub(crate) struct ParsedArray<'a> {
    pub dims: Vec<ArrayDimension>,
    pub elements: Vec<Option<Cow<'a, [u8]>>>,
}

impl<'a> ParsedArray<'a> {
    /// Decode every non-NULL element with `decode`.
    pub(crate) fn decode_elements<T: Default>(
        self,
        mut decode: impl FnMut(&[u8]) -> Result<T>,
    ) -> Result<Vec<Nullable<T>>> {
        self.elements
            .iter()
            .map(|element| match element {
                Some(bytes) => decode(bytes).map(Nullable::new),
                None => Ok(Nullable::null()),
            })
            .collect()
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    delimiter: u8,
    /// Number of items seen at each nesting depth
    lengths: Vec<Option<usize>>,
    /// Depth at which elements (not sub-arrays) appear
    leaf_depth: Option<usize>,
    elements: Vec<Option<Cow<'a, [u8]>>>,
}

/// Split an array literal into dimensions and elements.
pub(crate) fn parse(input: &[u8], delimiter: u8) -> Result<ParsedArray<'_>> {
    let mut parser = Parser {
        input,
        pos: 0,
        delimiter,
        lengths: Vec::new(),
        leaf_depth: None,
        elements: Vec::new(),
    };
    parser.skip_whitespace();
    let bounds = if parser.peek() == Some(b'[') {
        let bounds = parser.parse_bounds()?;
        parser.skip_whitespace();
        if parser.peek() != Some(b'=') {
            return Err(parser.error("missing \"=\" after array dimensions"));
        }
        parser.pos += 1;
        parser.skip_whitespace();
        Some(bounds)
    } else {
        None
    };

    parser.parse_level(0)?;
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return Err(parser.error("junk after closing right brace"));
    }

    let lengths = parser
        .lengths
        .iter()
        .map(|len| len.unwrap_or(0))
        .collect::<Vec<_>>();
    if lengths.first() == Some(&0) {
        // `{}`
        if bounds.as_ref().is_some_and(|b| !b.is_empty()) {
            return Err(parser.error("dimensions given for an empty array"));
        }
        return Ok(ParsedArray {
            dims: Vec::new(),
            elements: Vec::new(),
        });
    }

    let dims = match bounds {
        None => lengths
            .iter()
            .map(|&len| dimension(len, 1))
            .collect::<Result<Vec<_>>>()?,
        Some(bounds) => {
            if bounds.len() != lengths.len() {
                return Err(parser.error("specified array dimensions do not match array contents"));
            }
            let mut dims = Vec::with_capacity(bounds.len());
            for (&(lower, upper), &len) in bounds.iter().zip(&lengths) {
                let dim = dimension(len, lower)?;
                if i64::from(upper) - i64::from(lower) + 1 != i64::from(dim.len) {
                    return Err(
                        parser.error("specified array dimensions do not match array contents")
                    );
                }
                dims.push(dim);
            }
            dims
        }
    };

    let expected = element_count(&dims)?;
    if expected != parser.elements.len() {
        return Err(Error::DimensionMismatch {
            expected,
            actual: parser.elements.len(),
        });
    }
    Ok(ParsedArray {
        dims,
        elements: parser.elements,
    })
}

fn dimension(len: usize, lower_bound: i32) -> Result<ArrayDimension> {
    let len = i32::try_from(len).map_err(|_| Error::overflow("array length", "INT4"))?;
    Ok(ArrayDimension { len, lower_bound })
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> Error {
        Error::malformed(
            TYPE_NAME,
            format!(
                "{} at position {} in {:?}",
                reason,
                self.pos,
                String::from_utf8_lossy(self.input)
            ),
        )
    }

    /// `[lb:ub]` or `[ub]`, repeated.
    fn parse_bounds(&mut self) -> Result<Vec<(i32, i32)>> {
        let mut bounds = Vec::new();
        while self.peek() == Some(b'[') {
            self.pos += 1;
            let first = self.parse_int()?;
            let (lower, upper) = if self.peek() == Some(b':') {
                self.pos += 1;
                (first, self.parse_int()?)
            } else {
                (1, first)
            };
            if self.peek() != Some(b']') {
                return Err(self.error("missing \"]\" in array dimensions"));
            }
            self.pos += 1;
            if upper < lower {
                return Err(self.error("upper bound cannot be less than lower bound"));
            }
            bounds.push((lower, upper));
            if bounds.len() > MAX_DIMENSIONS as usize {
                return Err(self.error("too many array dimensions"));
            }
            self.skip_whitespace();
        }
        Ok(bounds)
    }

    fn parse_int(&mut self) -> Result<i32> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        let value = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| self.error("invalid array dimension"))?;
        self.skip_whitespace();
        Ok(value)
    }

    /// One brace-enclosed level starting at `{`.
    fn parse_level(&mut self, depth: usize) -> Result<()> {
        if depth >= MAX_DIMENSIONS as usize {
            return Err(self.error("too many array dimensions"));
        }
        if self.peek() != Some(b'{') {
            return Err(self.error("array value must start with \"{\""));
        }
        self.pos += 1;
        if self.lengths.len() <= depth {
            self.lengths.push(None);
        }

        self.skip_whitespace();
        let mut count = 0;
        if self.peek() == Some(b'}') {
            self.pos += 1;
            if depth > 0 {
                return Err(self.error("empty sub-array"));
            }
        } else {
            loop {
                self.skip_whitespace();
                if self.peek() == Some(b'{') {
                    if self.leaf_depth.is_some_and(|leaf| leaf <= depth) {
                        return Err(self.error("unexpected \"{\" character"));
                    }
                    self.parse_level(depth + 1)?;
                } else {
                    match self.leaf_depth {
                        Some(leaf) if leaf != depth => {
                            return Err(self.error("unexpected array element"));
                        }
                        _ => self.leaf_depth = Some(depth),
                    }
                    let element = self.parse_element()?;
                    self.elements.push(element);
                }
                count += 1;

                self.skip_whitespace();
                match self.peek() {
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    Some(b) if b == self.delimiter => self.pos += 1,
                    _ => return Err(self.error("unexpected end of element")),
                }
            }
        }

        match self.lengths[depth] {
            None => self.lengths[depth] = Some(count),
            Some(len) if len != count => {
                return Err(self.error(
                    "multidimensional arrays must have sub-arrays with matching dimensions",
                ));
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn parse_element(&mut self) -> Result<Option<Cow<'a, [u8]>>> {
        if self.peek() == Some(b'"') {
            self.pos += 1;
            return self.parse_quoted().map(Some);
        }

        let input = self.input;
        let start = self.pos;
        let mut owned: Option<Vec<u8>> = None;
        // End of the element excluding trailing whitespace
        let mut end = start;
        loop {
            match self.peek() {
                None => return Err(self.error("unexpected end of input")),
                Some(b'{' | b'"') => return Err(self.error("unexpected character in element")),
                Some(b'}') => break,
                Some(b) if b == self.delimiter => break,
                Some(b'\\') => {
                    let escaped = *input
                        .get(self.pos + 1)
                        .ok_or_else(|| self.error("unexpected end of input"))?;
                    let buf = owned.get_or_insert_with(|| input[start..self.pos].to_vec());
                    buf.push(escaped);
                    self.pos += 2;
                    end = self.pos;
                }
                Some(b) => {
                    if let Some(buf) = owned.as_mut() {
                        buf.push(b);
                    }
                    self.pos += 1;
                    if !b.is_ascii_whitespace() {
                        end = self.pos;
                    }
                }
            }
        }

        match owned {
            Some(mut buf) => {
                // Trailing unescaped whitespace
                let trailing = self.pos - end;
                buf.truncate(buf.len() - trailing);
                Ok(Some(Cow::Owned(buf)))
            }
            None => {
                let token = &input[start..end];
                if token.is_empty() {
                    return Err(self.error("empty unquoted element"));
                }
                if token.eq_ignore_ascii_case(b"NULL") {
                    return Ok(None);
                }
                Ok(Some(Cow::Borrowed(token)))
            }
        }
    }

    /// Body of a quoted element, after the opening quote.
    fn parse_quoted(&mut self) -> Result<Cow<'a, [u8]>> {
        let input = self.input;
        let start = self.pos;
        let mut owned: Option<Vec<u8>> = None;
        loop {
            let rest = &input[self.pos..];
            let Some(offset) = memchr2(b'"', b'\\', rest) else {
                return Err(self.error("unterminated quoted element"));
            };
            let at = self.pos + offset;
            if let Some(buf) = owned.as_mut() {
                buf.extend_from_slice(&input[self.pos..at]);
            }
            if input[at] == b'"' {
                self.pos = at + 1;
                return Ok(match owned {
                    Some(buf) => Cow::Owned(buf),
                    None => Cow::Borrowed(&input[start..at]),
                });
            }
            let escaped = *input
                .get(at + 1)
                .ok_or_else(|| self.error("unterminated quoted element"))?;
            owned
                .get_or_insert_with(|| input[start..at].to_vec())
                .push(escaped);
            self.pos = at + 2;
        }
    }
}

/// Write an array literal.
///
/// `write_element` writes the text of one non-NULL element, which is then
/// quoted if needed. Non-default lower bounds are written as a `[lb:ub]=`
/// prefix.
pub(crate) fn write_text<T>(
    dims: &[ArrayDimension],
    elements: &[Nullable<T>],
    delimiter: u8,
    buf: &mut Vec<u8>,
    mut is_null: impl FnMut(&Nullable<T>) -> bool,
    mut write_element: impl FnMut(&T, &mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    if elements.is_empty() {
        buf.extend_from_slice(b"{}");
        return Ok(());
    }

    if dims.iter().any(|d| d.lower_bound != 1) {
        for dim in dims {
            let upper = i64::from(dim.lower_bound) + i64::from(dim.len) - 1;
            buf.extend_from_slice(format!("[{}:{}]", dim.lower_bound, upper).as_bytes());
        }
        buf.push(b'=');
    }

    let mut scratch = Vec::new();
    let mut elements = elements.iter();
    let mut write_one = |buf: &mut Vec<u8>| -> Result<()> {
        let Some(element) = elements.next() else {
            return Err(Error::DimensionMismatch {
                expected: dims.iter().map(|d| d.len as usize).product(),
                actual: 0,
            });
        };
        if is_null(element) {
            buf.extend_from_slice(b"NULL");
            return Ok(());
        }
        scratch.clear();
        write_element(&element.value, &mut scratch)?;
        write_quoted(&scratch, delimiter, buf);
        Ok(())
    };
    write_level(dims, delimiter, buf, &mut write_one)
}

fn write_level(
    dims: &[ArrayDimension],
    delimiter: u8,
    buf: &mut Vec<u8>,
    write_one: &mut impl FnMut(&mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let Some((dim, inner)) = dims.split_first() else {
        return write_one(buf);
    };
    buf.push(b'{');
    for i in 0..dim.len {
        if i > 0 {
            buf.push(delimiter);
        }
        if inner.is_empty() {
            write_one(buf)?;
        } else {
            write_level(inner, delimiter, buf, write_one)?;
        }
    }
    buf.push(b'}');
    Ok(())
}

fn needs_quotes(element: &[u8], delimiter: u8) -> bool {
    element.is_empty()
        || element.eq_ignore_ascii_case(b"NULL")
        || element.iter().any(|&b| {
            matches!(b, b'{' | b'}' | b'"' | b'\\') || b == delimiter || b.is_ascii_whitespace()
        })
}

fn write_quoted(element: &[u8], delimiter: u8, buf: &mut Vec<u8>) {
    if !needs_quotes(element, delimiter) {
        buf.extend_from_slice(element);
        return;
    }
    buf.push(b'"');
    let mut rest = element;
    while let Some(at) = memchr2(b'"', b'\\', rest) {
        buf.extend_from_slice(&rest[..at]);
        buf.push(b'\\');
        buf.push(rest[at]);
        rest = &rest[at + 1..];
    }
    buf.extend_from_slice(rest);
    buf.push(b'"');
}
