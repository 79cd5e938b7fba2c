//! Hex dump of octets for log and error output.

use std::fmt::Write;

/// Formats up to `max` bytes as space-separated lowercase hex, noting how
/// many bytes were left out.
///
/// ```
/// use schema_sync_buffers::print_octets;
///
/// assert_eq!(print_octets(&[0x01, 0x02, 0x0a, 0xff], 16), "01 02 0a ff");
/// assert_eq!(print_octets(&[0xd1, 0x00, 0x01], 2), "d1 00 (+1)");
/// assert_eq!(print_octets(&[], 16), "");
/// ```
pub fn print_octets(octets: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(octets.len().min(max) * 3 + 8);
    for (i, byte) in octets.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    if octets.len() > max {
        let _ = write!(out, " (+{})", octets.len() - max);
    }
    out
}

/// [`print_octets`] capped at 16 bytes.
pub fn print_octets_default(octets: &[u8]) -> String {
    print_octets(octets, 16)
}
