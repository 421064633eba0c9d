//! Text and binary value codecs for the PostgreSQL wire protocol.
//!
//! # Features
//!
//! - **Static and dynamic binding**: native types implement
//!   [`FromWireValue`]/[`ToWireValue`] directly, while a [`TypeRegistry`]
//!   resolves codecs by type OID at run time into a [`Value`]
//! - **Both wire formats**: every built-in codec reads and writes the text and
//!   binary format and agrees between them
//! - **Arrays and records**: element and field codecs are resolved through the
//!   registry, so containers of user-defined types work without code generation
//! - **Canonical forms**: values such as `box` decode to one canonical
//!   representation whichever format or corner order they arrive in
//!
//! # Example
//!
//! ```
//! use zero_pgtype::{FormatCode, PgBox, TypeRegistry, Value, Vec2, oid};
//!
//! fn main() -> zero_pgtype::error::Result<()> {
//!     let registry = TypeRegistry::with_builtins();
//!
//!     let value = registry.decode(oid::BOX, FormatCode::Text, Some(b"3.14, 1.678, 7.1, 5.234"))?;
//!     let expected = PgBox::new(Vec2::new(3.14, 1.678), Vec2::new(7.1, 5.234));
//!     assert_eq!(value, Value::Box(expected));
//!
//!     let mut buf = Vec::new();
//!     registry.encode(&value, oid::BOX, FormatCode::Binary, &mut buf)?;
//!     assert_eq!(buf.len(), 4 + 32);
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod composite;
pub mod conversion;
pub mod error;
pub mod normalize;
pub mod nullable;
pub mod opts;
pub mod protocol;
pub mod registry;
pub mod value;

pub use array::{Array, ArrayDimension};
pub use composite::geometric::{PgBox, Vec2};
pub use composite::record::{Composite, CompositeCodec, CompositeField};
pub use conversion::{FromRow, FromWireValue, ToWireValue};
pub use error::{Error, Result};
pub use nullable::Nullable;
pub use opts::{NumericFormat, Opts, UnknownTypes};
pub use protocol::types::{FormatCode, Oid, oid};
pub use registry::{Codec, TypeCatalog, TypeEntry, TypeRegistry};
pub use value::{NativeType, Value, ValueKind, WireValue};
