//! LEB128 variable-length integer encoding and the zig-zag transform.
//!
//! Protobuf varints store 7 payload bits per byte with the high bit as a
//! continuation flag, so a `u64` occupies at most 10 bytes and a `u32` at most
//! 5. Signed `sint32`/`sint64` fields first fold the sign into the low bit
//! with zig-zag so small negative numbers stay short on the wire.

use crate::error::WireError;
use crate::sequential::{ReadableSequentialData, WritableSequentialData};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT64_BYTES: usize = 10;
/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT32_BYTES: usize = 5;

/// Reads a 64-bit varint from the cursor.
///
/// Fails with [`WireError::InvalidVarint`] if the continuation bit is still
/// set after 10 bytes or the tenth byte carries more than the single bit that
/// fits in a `u64`.
pub fn read_varint64<R: ReadableSequentialData + ?Sized>(data: &mut R) -> Result<u64, WireError> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT64_BYTES {
        let byte = data.read_byte()?;
        if i == MAX_VARINT64_BYTES - 1 && byte > 0x01 {
            return Err(WireError::InvalidVarint);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(WireError::InvalidVarint)
}

/// Reads a varint that must fit in 32 bits, e.g. a field key.
///
/// Unlike `int32` field values, which are sign-extended 64-bit varints on the
/// wire, callers of this function require the value to be a true `u32`.
pub fn read_varint32<R: ReadableSequentialData + ?Sized>(data: &mut R) -> Result<u32, WireError> {
    let value = read_varint64(data)?;
    u32::try_from(value).map_err(|_| WireError::InvalidVarint)
}

/// Writes a 64-bit varint to the cursor.
pub fn write_varint64<W: WritableSequentialData + ?Sized>(
    data: &mut W,
    mut value: u64,
) -> Result<(), WireError> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            return data.write_byte(byte);
        }
        data.write_byte(byte | 0x80)?;
    }
}

/// Writes a 32-bit varint to the cursor.
pub fn write_varint32<W: WritableSequentialData + ?Sized>(
    data: &mut W,
    value: u32,
) -> Result<(), WireError> {
    write_varint64(data, u64::from(value))
}

/// The number of bytes [`write_varint64`] produces for `value`.
///
/// LEB128 encodes 7 bits per byte, so the answer is `ceil(significant_bits /
/// 7)` with a minimum of one byte for zero. A lookup table over
/// `leading_zeros()` avoids the division.
#[inline]
pub fn encoded_len64(value: u64) -> usize {
    #[rustfmt::skip]
    const LZ_TO_LEN: [u8; 65] = [
        10,                                         // 0:     64 bits -> 10 bytes
        9, 9, 9, 9, 9, 9, 9,                        // 1-7:   63-57 bits -> 9 bytes
        8, 8, 8, 8, 8, 8, 8,                        // 8-14:  56-50 bits -> 8 bytes
        7, 7, 7, 7, 7, 7, 7,                        // 15-21: 49-43 bits -> 7 bytes
        6, 6, 6, 6, 6, 6, 6,                        // 22-28: 42-36 bits -> 6 bytes
        5, 5, 5, 5, 5, 5, 5,                        // 29-35: 35-29 bits -> 5 bytes
        4, 4, 4, 4, 4, 4, 4,                        // 36-42: 28-22 bits -> 4 bytes
        3, 3, 3, 3, 3, 3, 3,                        // 43-49: 21-15 bits -> 3 bytes
        2, 2, 2, 2, 2, 2, 2,                        // 50-56: 14-8 bits  -> 2 bytes
        1, 1, 1, 1, 1, 1, 1, 1,                     // 57-64: 7-0 bits   -> 1 byte
    ];
    LZ_TO_LEN[value.leading_zeros() as usize] as usize
}

/// The number of bytes [`write_varint32`] produces for `value`.
#[inline]
pub fn encoded_len32(value: u32) -> usize {
    #[rustfmt::skip]
    const LZ_TO_LEN: [u8; 33] = [
        5, 5, 5, 5,                         // 0-3:   32-29 bits -> 5 bytes
        4, 4, 4, 4, 4, 4, 4,                // 4-10:  28-22 bits -> 4 bytes
        3, 3, 3, 3, 3, 3, 3,                // 11-17: 21-15 bits -> 3 bytes
        2, 2, 2, 2, 2, 2, 2,                // 18-24: 14-8 bits  -> 2 bytes
        1, 1, 1, 1, 1, 1, 1, 1,             // 25-32: 7-0 bits   -> 1 byte
    ];
    LZ_TO_LEN[value.leading_zeros() as usize] as usize
}

#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[inline]
pub const fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::buffer::BufferedData;

    #[track_caller]
    fn roundtrip(value: u64, expected_len: usize) {
        let mut buf = BufferedData::allocate(16);
        write_varint64(&mut buf, value).unwrap();
        assert_eq!(buf.position(), expected_len, "encoded length");
        assert_eq!(encoded_len64(value), expected_len, "computed length");
        buf.flip();
        assert_eq!(read_varint64(&mut buf).unwrap(), value);
    }

    #[test]
    fn smoketest_varint64() {
        roundtrip(0, 1);
        roundtrip(1, 1);
        roundtrip(42, 1);
        roundtrip(127, 1);
        roundtrip(128, 2);
        roundtrip(300, 2);
        // First value that needs 9 bytes.
        roundtrip(72057594037927937, 9);
        roundtrip(u64::MAX, 10);
    }

    #[test]
    fn varint64_overflow_rejected() {
        // Ten continuation bytes and no terminator.
        let mut buf = BufferedData::wrap(vec![0xff; 11]);
        assert_eq!(read_varint64(&mut buf), Err(WireError::InvalidVarint));

        // Tenth byte carries bits beyond the 64th.
        let mut encoded = vec![0x80u8; 9];
        encoded.push(0x02);
        let mut buf = BufferedData::wrap(encoded);
        assert_eq!(read_varint64(&mut buf), Err(WireError::InvalidVarint));
    }

    #[test]
    fn varint_truncated_input() {
        let mut buf = BufferedData::wrap(vec![0x80, 0x80]);
        assert_eq!(read_varint64(&mut buf), Err(WireError::UnexpectedEof));
    }

    #[test]
    fn zigzag_known_values() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(-2), 3);
        assert_eq!(zigzag_encode32(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode64(-1), 1);
        assert_eq!(zigzag_encode64(i64::MIN), u64::MAX);
    }

    proptest! {
        #[test]
        fn proptest_varint64_roundtrip(value: u64) {
            let mut buf = BufferedData::allocate(MAX_VARINT64_BYTES);
            write_varint64(&mut buf, value).unwrap();
            prop_assert_eq!(buf.position(), encoded_len64(value));
            buf.flip();
            prop_assert_eq!(read_varint64(&mut buf).unwrap(), value);
        }

        #[test]
        fn proptest_varint32_roundtrip(value: u32) {
            let mut buf = BufferedData::allocate(MAX_VARINT32_BYTES);
            write_varint32(&mut buf, value).unwrap();
            prop_assert_eq!(buf.position(), encoded_len32(value));
            buf.flip();
            prop_assert_eq!(read_varint32(&mut buf).unwrap(), value);
        }

        #[test]
        fn proptest_zigzag32_roundtrip(value: i32) {
            prop_assert_eq!(zigzag_decode32(zigzag_encode32(value)), value);
        }

        #[test]
        fn proptest_zigzag64_roundtrip(value: i64) {
            prop_assert_eq!(zigzag_decode64(zigzag_encode64(value)), value);
        }

        // Differential test: our decoder against the `leb128` crate's encoder,
        // and our encoder against its decoder.
        #[test]
        fn proptest_varint64_differential(value: u64) {
            let mut third_party = Vec::with_capacity(MAX_VARINT64_BYTES);
            leb128::write::unsigned(&mut third_party, value).unwrap();

            let mut buf = BufferedData::wrap(third_party.clone());
            prop_assert_eq!(read_varint64(&mut buf).unwrap(), value);

            let mut ours = BufferedData::allocate(MAX_VARINT64_BYTES);
            write_varint64(&mut ours, value).unwrap();
            ours.flip();
            let mut written = vec![0u8; ours.remaining()];
            ours.read_bytes(&mut written).unwrap();
            prop_assert_eq!(written, third_party);
        }
    }
}
