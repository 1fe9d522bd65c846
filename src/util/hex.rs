//! Hex formatting utilities.
//!
//! Lowercase, two characters per byte, no separators: the encoding used by the
//! `$bitcoin$` hash format and by the `wdat info` summaries.

use std::fmt::Write;

/// Format bytes as a compact lowercase hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Format a byte count as "N bytes (0xhex)".
pub fn format_len(len: usize) -> String {
    format!("{} bytes (0x{:x})", len, len)
}
