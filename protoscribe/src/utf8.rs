//! UTF-8 helpers shared by the sequential cursors and generated sources.
//!
//! Rust strings are already UTF-8, so the encoded length is the byte length;
//! these helpers exist so generated code has one place to compute
//! length prefixes and to funnel decode failures into [`WireError`].

use crate::error::WireError;
use crate::sequential::WritableSequentialData;

/// Byte length of the UTF-8 encoding of `value`.
#[inline]
pub fn encoded_length(value: &str) -> usize {
    value.len()
}

/// Writes the UTF-8 bytes of `value` to the cursor.
pub fn encode_utf8<W: WritableSequentialData + ?Sized>(
    value: &str,
    data: &mut W,
) -> Result<(), WireError> {
    data.write_bytes(value.as_bytes())
}

/// Decodes owned bytes as UTF-8 without copying on success.
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String, WireError> {
    String::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferedData;

    const CASES: [(&str, usize); 6] = [
        ("", 0),
        (" ", 1),
        ("a", 1),
        ("\n", 1),
        ("not blank", 9),
        ("✅", 3),
    ];

    #[test]
    fn encoded_length_matches_native_encoding() {
        for (s, expected) in CASES {
            assert_eq!(encoded_length(s), expected);
            assert_eq!(encoded_length(s), s.as_bytes().len());
        }
    }

    #[test]
    fn encode_writes_native_bytes() {
        for (s, expected_len) in CASES {
            let mut buf = BufferedData::allocate(1024);
            encode_utf8(s, &mut buf).unwrap();
            buf.flip();
            let mut written = vec![0u8; buf.length()];
            buf.get_bytes(0, &mut written).unwrap();
            assert_eq!(written, s.as_bytes());
            assert_eq!(written.len(), expected_len);
        }
    }

    #[test]
    fn check_mark_is_three_bytes() {
        let mut buf = BufferedData::allocate(8);
        encode_utf8("✅", &mut buf).unwrap();
        buf.flip();
        let mut written = vec![0u8; buf.length()];
        buf.get_bytes(0, &mut written).unwrap();
        assert_eq!(written, [0xe2, 0x9c, 0x85]);
    }

    #[test]
    fn decode_rejects_invalid_sequences() {
        assert_eq!(decode_utf8(b"abc".to_vec()).unwrap(), "abc");
        assert_eq!(
            decode_utf8(vec![0xe2, 0x9c]),
            Err(WireError::InvalidUtf8)
        );
    }
}
