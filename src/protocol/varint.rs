//! Unsigned LEB128 varints
//!
//! Each byte carries 7 value bits, least-significant group first; a set
//! high bit means more bytes follow.

use bytes::{BufMut, BytesMut};

/// Append the varint encoding of `value` to `buf`.
pub fn write_varint(mut value: u64, buf: &mut BytesMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Number of bytes `write_varint` produces for `value`.
pub fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Decode a varint starting at `offset`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// buffer ends before a byte with the continuation bit clear is reached
/// (incomplete: wait for more data, not an error).
pub fn read_varint(buf: &[u8], offset: usize) -> Option<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in buf.get(offset..)?.iter().enumerate() {
        // Bits past the 64-bit range are dropped rather than widening further.
        if shift < 64 {
            value |= u64::from(byte & 0x7f) << shift;
        }
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        write_varint(value, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_roundtrip() {
        for value in [
            0,
            1,
            127,
            128,
            300,
            736,
            16383,
            16384,
            u64::from(u32::MAX),
            u64::MAX,
        ] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), varint_len(value));
            assert_eq!(read_varint(&bytes, 0), Some((value, bytes.len())));
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7f]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(736), vec![0xe0, 0x05]);
    }

    #[test]
    fn test_incomplete_prefix() {
        let bytes = encode(u64::from(u32::MAX));
        for end in 0..bytes.len() {
            assert_eq!(read_varint(&bytes[..end], 0), None);
        }
    }

    #[test]
    fn test_offset_decoding() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0xff, 0xff]);
        write_varint(300, &mut buf);
        assert_eq!(read_varint(&buf, 2), Some((300, 2)));
        assert_eq!(read_varint(&buf, buf.len()), None);
    }
}
