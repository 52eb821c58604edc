//! Binary on-disk form of the index.
//!
//! All integers are little-endian. Postings fields are 4 bytes wide, file offsets 8,
//! weights are `f64`. `meta.json` records the widths so a reader can refuse files
//! it does not understand.

mod binary_file;
mod reader;
mod writer;

pub use binary_file::{BinaryReader, BinaryWriter};
pub use reader::DiskIndex;
pub use writer::IndexWriter;

/// One `vocab_table.bin` entry: vocab offset and postings offset, both `u64`.
pub(crate) const TABLE_ENTRY_SIZE: u64 = 16;
