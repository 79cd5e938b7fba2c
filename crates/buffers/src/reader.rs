//! Binary buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A bounds-checked reader over a byte slice.
///
/// Every read either returns the decoded value and advances the cursor, or
/// returns a [`BufferError`] and leaves the cursor where it was.
///
/// # Example
///
/// ```
/// use schema_sync_buffers::Reader;
///
/// let data = [0x01, 0x03, 0x02];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.u16().unwrap(), 0x0203);
/// assert!(reader.u8().is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.uint8.len().saturating_sub(self.x)
    }

    pub fn is_eof(&self) -> bool {
        self.x >= self.uint8.len()
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.uint8.get(self.x).copied()
    }

    /// Returns a subarray of the given size and advances the cursor.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        if self.size() < size {
            return Err(BufferError::EndOfBuffer {
                offset: self.x,
                needed: size,
            });
        }
        let start = self.x;
        self.x += size;
        Ok(&self.uint8[start..self.x])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        let bytes = self.buf(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        Ok(self.array::<1>()?[0])
    }

    /// Reads a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.array::<1>()?[0] as i8)
    }

    /// Reads an unsigned 16-bit integer (little-endian).
    #[inline]
    pub fn u16(&mut self) -> Result<u16, BufferError> {
        self.array().map(u16::from_le_bytes)
    }

    /// Reads a signed 16-bit integer (little-endian).
    #[inline]
    pub fn i16(&mut self) -> Result<i16, BufferError> {
        self.array().map(i16::from_le_bytes)
    }

    /// Reads an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32(&mut self) -> Result<u32, BufferError> {
        self.array().map(u32::from_le_bytes)
    }

    /// Reads a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32(&mut self) -> Result<i32, BufferError> {
        self.array().map(i32::from_le_bytes)
    }

    /// Reads an unsigned 64-bit integer (little-endian).
    #[inline]
    pub fn u64(&mut self) -> Result<u64, BufferError> {
        self.array().map(u64::from_le_bytes)
    }

    /// Reads a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64(&mut self) -> Result<i64, BufferError> {
        self.array().map(i64::from_le_bytes)
    }

    /// Reads a 32-bit float (little-endian).
    #[inline]
    pub fn f32(&mut self) -> Result<f32, BufferError> {
        self.array().map(f32::from_le_bytes)
    }

    /// Reads a 64-bit float (little-endian).
    #[inline]
    pub fn f64(&mut self) -> Result<f64, BufferError> {
        self.array().map(f64::from_le_bytes)
    }

    /// Reads a `vu57` variable-length unsigned integer.
    pub fn vu57(&mut self) -> Result<u64, BufferError> {
        let start = self.x;
        let mut pos = self.x;
        let mut result: u64 = 0;
        for i in 0..8 {
            let b = match self.uint8.get(pos) {
                Some(b) => *b,
                None => {
                    return Err(BufferError::EndOfBuffer {
                        offset: start,
                        needed: pos - start + 1,
                    })
                }
            };
            pos += 1;
            if i < 7 {
                result |= ((b & 0x7f) as u64) << (7 * i);
                if b & 0x80 == 0 {
                    self.x = pos;
                    return Ok(result);
                }
            } else {
                result |= (b as u64) << 49;
            }
        }
        self.x = pos;
        Ok(result)
    }

    /// Reads a `vu57` byte-length-prefixed UTF-8 string.
    ///
    /// Lengths above `limit` are rejected before any payload is read.
    pub fn str(&mut self, limit: usize) -> Result<&'a str, BufferError> {
        let start = self.x;
        let len = self.vu57()?;
        let len = match usize::try_from(len) {
            Ok(len) if len <= limit => len,
            _ => {
                self.x = start;
                return Err(BufferError::LengthLimit {
                    offset: start,
                    len: usize::try_from(len).unwrap_or(usize::MAX),
                    limit,
                });
            }
        };
        let payload_at = self.x;
        let bytes = match self.buf(len) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.x = start;
                return Err(err);
            }
        };
        str::from_utf8(bytes).map_err(|_| {
            self.x = start;
            BufferError::InvalidUtf8 { offset: payload_at }
        })
    }
}
