//! CompactSize integers and the byte cursor used by every wallet parser.
//!
//! Wallet keys and values are serialized with Bitcoin's CompactSize encoding:
//! a self-describing unsigned integer whose first byte selects the width.
//!
//! | First byte | Wire width | Payload |
//! |------------|------------|---------|
//! | `0..=252`  | 1 byte     | the byte itself |
//! | `253`      | 3 bytes    | `u16` little-endian |
//! | `254`      | 5 bytes    | `u32` little-endian |
//! | `255`      | 9 bytes    | `u64` little-endian |
//!
//! [`decode`] is the primitive: it takes a buffer and an offset and returns the
//! value together with the new offset. [`ByteCursor`] wraps a `(buffer, offset)`
//! pair so higher-level parsers can read fields in sequence. Every read is
//! bounds-checked; running past the end yields [`WdatError::Decode`].

use byteorder::{ByteOrder, LittleEndian};

use crate::WdatError;

const MARKER_U16: u8 = 253;
const MARKER_U32: u8 = 254;
const MARKER_U64: u8 = 255;

/// Decode a CompactSize integer starting at `offset`.
///
/// Returns the decoded value and the offset just past it.
///
/// # Examples
///
/// ```
/// use wdat::wallet::compact_size::decode;
///
/// assert_eq!(decode(&[0x04, b'm'], 0).unwrap(), (4, 1));
/// assert_eq!(decode(&[0xfd, 0x00, 0x01], 0).unwrap(), (256, 3));
/// assert!(decode(&[0xfe, 0x01], 0).is_err());
/// ```
pub fn decode(data: &[u8], offset: usize) -> Result<(u64, usize), WdatError> {
    let marker = *data.get(offset).ok_or_else(|| {
        WdatError::Decode(format!(
            "CompactSize marker at offset {} past end of {}-byte buffer",
            offset,
            data.len()
        ))
    })?;
    let start = offset + 1;

    let width = match marker {
        MARKER_U16 => 2,
        MARKER_U32 => 4,
        MARKER_U64 => 8,
        literal => return Ok((literal as u64, start)),
    };

    let payload = data.get(start..start + width).ok_or_else(|| {
        WdatError::Decode(format!(
            "CompactSize needs {} payload bytes at offset {}, only {} remain",
            width,
            start,
            data.len().saturating_sub(start)
        ))
    })?;

    let value = match width {
        2 => LittleEndian::read_u16(payload) as u64,
        4 => LittleEndian::read_u32(payload) as u64,
        _ => LittleEndian::read_u64(payload),
    };
    Ok((value, start + width))
}

/// Encode `value` using the narrowest CompactSize width.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    if value < MARKER_U16 as u64 {
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(MARKER_U16);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(MARKER_U32);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(MARKER_U64);
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Number of bytes [`encode`] produces for `value` (1, 3, 5 or 9).
pub fn encoded_len(value: u64) -> usize {
    if value < MARKER_U16 as u64 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// A read position inside an immutable byte buffer.
///
/// The offset never exceeds the buffer length: a read that would cross the end
/// fails with [`WdatError::Decode`] and leaves the cursor where it was.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, offset: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Read a CompactSize integer.
    pub fn read_compact_size(&mut self) -> Result<u64, WdatError> {
        let (value, next) = decode(self.data, self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: u64) -> Result<&'a [u8], WdatError> {
        if len > self.remaining() as u64 {
            return Err(WdatError::Decode(format!(
                "read of {} bytes at offset {} overruns {}-byte buffer",
                len,
                self.offset,
                self.data.len()
            )));
        }
        let end = self.offset + len as usize;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    /// Read a CompactSize length followed by that many bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], WdatError> {
        let start = self.offset;
        let len = self.read_compact_size()?;
        self.read_bytes(len).inspect_err(|_| self.offset = start)
    }

    /// Read a CompactSize-prefixed string, replacing invalid UTF-8.
    pub fn read_var_string(&mut self) -> Result<String, WdatError> {
        Ok(String::from_utf8_lossy(self.read_var_bytes()?).into_owned())
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, WdatError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literal_band() {
        assert_eq!(decode(&[0x00], 0).unwrap(), (0, 1));
        assert_eq!(decode(&[252], 0).unwrap(), (252, 1));
        // Offset is honoured
        assert_eq!(decode(&[0xAA, 0x07], 1).unwrap(), (7, 2));
    }

    #[test]
    fn test_decode_multibyte_bands() {
        assert_eq!(decode(&[0xfd, 0xfd, 0x00], 0).unwrap(), (253, 3));
        assert_eq!(decode(&[0xfd, 0xff, 0xff], 0).unwrap(), (0xffff, 3));
        assert_eq!(
            decode(&[0xfe, 0x78, 0x56, 0x34, 0x12], 0).unwrap(),
            (0x1234_5678, 5)
        );
        assert_eq!(
            decode(&[0xff, 1, 2, 3, 4, 5, 6, 7, 8], 0).unwrap(),
            (0x0807_0605_0403_0201, 9)
        );
    }

    #[test]
    fn test_decode_truncated_payload_fails() {
        assert!(matches!(decode(&[0xfd, 0x01], 0), Err(WdatError::Decode(_))));
        assert!(matches!(decode(&[0xfe, 1, 2, 3], 0), Err(WdatError::Decode(_))));
        assert!(matches!(decode(&[0xff, 1, 2, 3, 4, 5, 6, 7], 0), Err(WdatError::Decode(_))));
        assert!(matches!(decode(&[], 0), Err(WdatError::Decode(_))));
        assert!(matches!(decode(&[0x01], 1), Err(WdatError::Decode(_))));
    }

    #[test]
    fn test_encode_widths_follow_bands() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(252), vec![252]);
        assert_eq!(encode(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(encode(u64::MAX).len(), 9);
        assert_eq!(encoded_len(0xffff), 3);
        assert_eq!(encoded_len(0x1_0000_0000), 9);
    }

    #[test]
    fn test_decode_inverts_encode_at_band_edges() {
        for value in [0, 252, 253, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), encoded_len(value));
            assert_eq!(decode(&bytes, 0).unwrap(), (value, bytes.len()));
        }
    }

    #[test]
    fn test_cursor_reads_fields_in_sequence() {
        let data = [0x02, 0xAA, 0xBB, 0x01, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c'];
        let mut cur = ByteCursor::new(&data);
        assert_eq!(cur.read_var_bytes().unwrap(), &[0xAA, 0xBB]);
        assert_eq!(cur.read_u32_le().unwrap(), 1);
        assert_eq!(cur.read_var_string().unwrap(), "abc");
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_cursor_overrun_leaves_offset_unchanged() {
        let data = [0x05, 0x01, 0x02];
        let mut cur = ByteCursor::new(&data);
        assert!(matches!(cur.read_var_bytes(), Err(WdatError::Decode(_))));
        assert_eq!(cur.offset(), 0);
        assert!(cur.read_bytes(u64::MAX).is_err());
        assert_eq!(cur.read_bytes(3).unwrap().len(), 3);
        assert!(cur.read_u32_le().is_err());
    }
}
