//! A reader for the sorted-string-table file format used by RocksDB-family
//! storage engines: footer, block, and index decoding, composed into a
//! lazy, forward-only iterator over a table's entries.
//!
//! This crate only reads tables; there is no write path, no compaction or
//! manifest bookkeeping, and no network layer (see `DESIGN.md`).

pub mod block;
pub mod block_handle;
pub mod byte_source;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod footer;
pub mod index;
pub mod properties;
pub mod varint;

pub use block_handle::BlockHandle;
pub use byte_source::{ByteSource, FileByteSource, MemoryByteSource};
pub use entry::{Entry, EntryIterator};
pub use error::{Error, Result};
pub use footer::{ChecksumKind, Footer};
pub use index::IndexType;
pub use properties::read_properties;

/// Locates and parses the trailing footer (spec §4.2). Thin wrapper over
/// [`Footer::read_from`] kept at the crate root so callers don't need to
/// know which module owns the type to read one.
pub fn read_footer(source: &impl ByteSource) -> Result<Footer> {
    Footer::read_from(source)
}
