//! Binary buffer writer.

/// A binary buffer writer that grows automatically as needed.
///
/// # Example
///
/// ```
/// use schema_sync_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0x03, 0x02]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a writer with a preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Returns the written data and resets the writer.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.uint8)
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.uint8.push(val as u8);
    }

    /// Writes an unsigned 16-bit integer (little-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a signed 16-bit integer (little-endian).
    #[inline]
    pub fn i16(&mut self, val: i16) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes an unsigned 64-bit integer (little-endian).
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a 32-bit float (little-endian).
    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a 64-bit float (little-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes raw bytes.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a `vu57` variable-length unsigned integer.
    ///
    /// Values above [`VU57_MAX`](crate::VU57_MAX) are truncated to 57 bits.
    pub fn vu57(&mut self, mut value: u64) {
        for _ in 0..7 {
            let b = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.uint8.push(b);
                return;
            }
            self.uint8.push(b | 0x80);
        }
        self.uint8.push((value & 0xff) as u8);
    }

    /// Writes a string as a `vu57` byte length followed by its UTF-8 bytes.
    ///
    /// Returns the number of payload bytes written.
    pub fn str(&mut self, s: &str) -> usize {
        let bytes = s.as_bytes();
        self.vu57(bytes.len() as u64);
        self.uint8.extend_from_slice(bytes);
        bytes.len()
    }
}
