//! Binary files around a placement run: cached fields and generation records.
//!
//! # File Formats
//!
//! Both formats are little-endian and start with four magic bytes and a
//! version. Payloads are optionally LZ4 compressed (`lz4` feature).
//!
//! ```text
//! Field cache (.wfld):
//!   Magic: "WFLD" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression)
//!   Size: u32
//!   Reserved: 8 bytes
//!   Values: size * size f64, row-major
//!
//! Generation record (.wgen):
//!   Magic: "WGEN" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression)
//!   Field size: u32
//!   Wells: u32
//!   Generation count: u64
//!   Reserved: 8 bytes
//!
//!   Frames (variable), one per recorded generation:
//!     Generation: u64
//!     Best, worst, mean fitness: f64 x 3
//!     Population: u32
//!     Breeding count: u32, then (row u32, col u32, fitness f64) each
//!     Offspring count: u32, then (row u32, col u32, fitness f64) each
//!
//!   Frame index table (generation_count * 16 bytes):
//!     Offset: u64
//!     Stored size: u64
//! ```

mod cache;
mod format;
mod reader;
mod recorder;

pub use cache::{load_field, load_or_generate, save_field};
pub use format::{
    Compression, FIELD_MAGIC, FORMAT_VERSION, FieldHeader, FrameIndex, RECORD_MAGIC, RecordHeader,
};
pub use reader::{RecordIterator, RecordReader};
pub use recorder::{GenerationRecorder, RecordStats, RecorderConfig};
