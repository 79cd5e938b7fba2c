//! Binary buffer utilities for schema-sync.
//!
//! # Overview
//!
//! - [`Reader`] - Bounds-checked cursor over a byte slice
//! - [`Writer`] - Growable output buffer
//! - [`print_octets`] - Hex dump for diagnostics
//!
//! All fixed-width numbers are little-endian. Variable-length unsigned
//! integers use the `vu57` layout: seven 7-bit groups with a continuation
//! bit, then one final full byte, for up to 57 bits.
//!
//! # Example
//!
//! ```
//! use schema_sync_buffers::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.u16(0x0203);
//! writer.str("hello");
//! let data = writer.flush();
//!
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.u8().unwrap(), 0x01);
//! assert_eq!(reader.u16().unwrap(), 0x0203);
//! assert_eq!(reader.str(usize::MAX).unwrap(), "hello");
//! assert!(reader.is_eof());
//! ```

mod print_octets;
mod reader;
mod writer;

pub use print_octets::{print_octets, print_octets_default};
pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Largest value representable by the `vu57` varint.
pub const VU57_MAX: u64 = (1 << 57) - 1;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    #[error("end of buffer: needed {needed} byte(s) at offset {offset}")]
    EndOfBuffer { offset: usize, needed: usize },
    /// Invalid UTF-8 sequence.
    #[error("invalid UTF-8 sequence at offset {offset}")]
    InvalidUtf8 { offset: usize },
    /// A length prefix exceeded the caller's limit.
    #[error("length {len} at offset {offset} exceeds limit {limit}")]
    LengthLimit {
        offset: usize,
        len: usize,
        limit: usize,
    },
}
