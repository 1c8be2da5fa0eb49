//! Field keys and wire types for the protobuf encoding.
//!
//! Every field record starts with a varint key holding the field number in
//! the high bits and a [`WireType`] in the low three bits, per
//! <https://protobuf.dev/programming-guides/encoding>.

use crate::error::WireError;
use crate::sequential::{ReadableSequentialData, WritableSequentialData};
use crate::varint;

/// Minimum value of a protobuf field number.
pub const MINIMUM_TAG: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_TAG: u32 = (1 << 29) - 1;

/// Denotes the payload shape of a field in an encoded protobuf message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`,
    /// `bool`, `enum`.
    Varint = 0,
    /// 64-bit little-endian value.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Length-delimited payload.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (proto2, deprecated).
    SGroup = 3,
    /// Group end (proto2, deprecated).
    EGroup = 4,
    /// 32-bit little-endian value.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl WireType {
    /// Decodes a [`WireType`] from the low three bits of a field key.
    pub fn try_from_val(value: u8) -> Result<Self, WireError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            value => Err(WireError::InvalidWireType { value }),
        }
    }

    /// The raw three-bit value for this wire type.
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, WireError> {
        WireType::try_from_val(value)
    }
}

/// Writes the field key for `tag` with `wire_type`.
pub fn write_tag<W: WritableSequentialData>(
    data: &mut W,
    tag: u32,
    wire_type: WireType,
) -> Result<(), WireError> {
    data.write_varint32((tag << 3) | u32::from(wire_type.into_val()))
}

/// Encoded length of the field key for `tag`.
///
/// The wire type lives in the low three bits and never changes the length.
#[inline]
pub fn tag_len(tag: u32) -> usize {
    varint::encoded_len32(tag << 3)
}

/// Reads and validates a field key, returning `(tag, wire_type)`.
pub fn read_tag<R: ReadableSequentialData>(data: &mut R) -> Result<(u32, WireType), WireError> {
    let key = data.read_varint32()?;
    let wire_type = WireType::try_from_val((key & 0b111) as u8)?;
    let tag = key >> 3;
    if !(MINIMUM_TAG..=MAXIMUM_TAG).contains(&tag) {
        return Err(WireError::TagOutOfRange { tag });
    }
    Ok((tag, wire_type))
}

/// Skips over one field value based on its wire type.
///
/// Unknown fields are forward compatible: the parser reads and discards them
/// rather than failing.
pub fn skip_field<R: ReadableSequentialData>(
    data: &mut R,
    wire_type: WireType,
) -> Result<(), WireError> {
    let skip_len = match wire_type {
        WireType::Varint => {
            data.read_varint64()?;
            return Ok(());
        }
        WireType::I64 => 8,
        WireType::Len => {
            let len = data.read_varint64()?;
            usize::try_from(len).map_err(|_| WireError::LengthOverflow { value: len })?
        }
        WireType::I32 => 4,
        WireType::SGroup | WireType::EGroup => {
            return Err(WireError::DeprecatedGroupEncoding);
        }
    };

    if data.remaining() < skip_len {
        return Err(WireError::UnexpectedEof);
    }
    data.skip(skip_len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::buffer::BufferedData;

    #[test]
    fn wire_type_all_raw_values() {
        for raw in u8::MIN..=u8::MAX {
            match (raw, WireType::try_from_val(raw)) {
                (0, Ok(WireType::Varint))
                | (1, Ok(WireType::I64))
                | (2, Ok(WireType::Len))
                | (3, Ok(WireType::SGroup))
                | (4, Ok(WireType::EGroup))
                | (5, Ok(WireType::I32)) => (),
                (6.., Err(WireError::InvalidWireType { .. })) => (),
                other => panic!("unexpected mapping {other:?}"),
            }
        }
    }

    #[test]
    fn tag_zero_rejected() {
        let mut buf = BufferedData::wrap(vec![0x00]);
        assert_eq!(
            read_tag(&mut buf),
            Err(WireError::TagOutOfRange { tag: 0 })
        );
    }

    #[test]
    fn skip_varint_field() {
        let mut buf = BufferedData::wrap(vec![0x80, 0x01, 99]);
        skip_field(&mut buf, WireType::Varint).unwrap();
        assert_eq!(buf.read_byte().unwrap(), 99);
    }

    #[test]
    fn skip_fixed_fields() {
        let mut buf = BufferedData::wrap(vec![1, 2, 3, 4, 99]);
        skip_field(&mut buf, WireType::I32).unwrap();
        assert_eq!(buf.read_byte().unwrap(), 99);

        let mut buf = BufferedData::wrap(vec![1, 2, 3, 4, 5, 6, 7, 8, 99]);
        skip_field(&mut buf, WireType::I64).unwrap();
        assert_eq!(buf.read_byte().unwrap(), 99);
    }

    #[test]
    fn skip_length_delimited_field() {
        let mut buf = BufferedData::wrap(vec![3, 1, 2, 3, 99]);
        skip_field(&mut buf, WireType::Len).unwrap();
        assert_eq!(buf.read_byte().unwrap(), 99);

        // Truncated payload fails rather than over-running.
        let mut buf = BufferedData::wrap(vec![5, 1, 2]);
        assert_eq!(
            skip_field(&mut buf, WireType::Len),
            Err(WireError::UnexpectedEof)
        );
    }

    #[test]
    fn skip_groups_error() {
        let mut buf = BufferedData::wrap(vec![0]);
        assert_eq!(
            skip_field(&mut buf, WireType::SGroup),
            Err(WireError::DeprecatedGroupEncoding)
        );
        assert_eq!(
            skip_field(&mut buf, WireType::EGroup),
            Err(WireError::DeprecatedGroupEncoding)
        );
    }

    proptest! {
        #[test]
        fn proptest_tag_roundtrip(tag in MINIMUM_TAG..=MAXIMUM_TAG, raw_wire in 0u8..=5) {
            let wire_type = WireType::try_from_val(raw_wire).unwrap();
            let mut buf = BufferedData::allocate(8);
            write_tag(&mut buf, tag, wire_type).unwrap();
            prop_assert_eq!(buf.position(), tag_len(tag));
            buf.flip();
            let (rnd_tag, rnd_wire) = read_tag(&mut buf).unwrap();
            prop_assert_eq!(rnd_tag, tag);
            prop_assert_eq!(rnd_wire, wire_type);
        }
    }
}
