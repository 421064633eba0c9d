//! PostgreSQL wire-level building blocks: OIDs, format codes and
//! big-endian readers/writers shared by all codecs.

pub mod codec;
pub mod types;
