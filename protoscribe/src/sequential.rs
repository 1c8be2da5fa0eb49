//! Position-tracked sequential read/write cursors.
//!
//! Both traits expose the classic buffer triple `position <= limit <=
//! capacity`. Reads and writes advance `position`; [`set_limit`] lets a parser
//! fence off a length-delimited sub-message and hand the same cursor to a
//! nested parser without copying.
//!
//! [`set_limit`]: ReadableSequentialData::set_limit

use crate::bytes::Bytes;
use crate::error::WireError;
use crate::utf8;
use crate::varint;

/// A cursor over readable bytes.
pub trait ReadableSequentialData {
    /// Total size of the underlying storage.
    fn capacity(&self) -> usize;

    /// Offset of the next byte to read.
    fn position(&self) -> usize;

    /// One past the last readable offset.
    fn limit(&self) -> usize;

    /// Moves the limit, clamped to `[position, capacity]`.
    fn set_limit(&mut self, limit: usize);

    /// Advances the position by up to `n` bytes, clamped to the remaining
    /// range, and returns how far it actually moved.
    fn skip(&mut self, n: usize) -> usize;

    /// Reads one byte, or [`WireError::UnexpectedEof`] past the limit.
    fn read_byte(&mut self) -> Result<u8, WireError>;

    /// Fills `dst` completely or fails without a partial read.
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), WireError>;

    fn remaining(&self) -> usize {
        self.limit() - self.position()
    }

    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Reads a base-128 varint as `u64`.
    fn read_varint64(&mut self) -> Result<u64, WireError>
    where
        Self: Sized,
    {
        varint::read_varint64(self)
    }

    /// Reads a base-128 varint that must fit in 32 bits.
    fn read_varint32(&mut self) -> Result<u32, WireError>
    where
        Self: Sized,
    {
        varint::read_varint32(self)
    }

    /// Reads a zig-zag encoded `sint32`.
    fn read_signed_varint32(&mut self) -> Result<i32, WireError>
    where
        Self: Sized,
    {
        Ok(varint::zigzag_decode32(self.read_varint32()?))
    }

    /// Reads a zig-zag encoded `sint64`.
    fn read_signed_varint64(&mut self) -> Result<i64, WireError>
    where
        Self: Sized,
    {
        Ok(varint::zigzag_decode64(self.read_varint64()?))
    }

    /// Reads a little-endian fixed 32-bit value.
    fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let mut raw = [0u8; 4];
        self.read_bytes(&mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a little-endian fixed 64-bit value.
    fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let mut raw = [0u8; 8];
        self.read_bytes(&mut raw)?;
        Ok(u64::from_le_bytes(raw))
    }

    fn read_float(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    fn read_double(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Reads `length` raw bytes into a new owned sequence.
    fn read_byte_sequence(&mut self, length: usize) -> Result<Bytes, WireError> {
        if length > self.remaining() {
            return Err(WireError::UnexpectedEof);
        }
        let mut raw = vec![0u8; length];
        self.read_bytes(&mut raw)?;
        Ok(Bytes::wrap(raw))
    }

    /// Reads `length` bytes and decodes them as UTF-8.
    fn read_utf8(&mut self, length: usize) -> Result<String, WireError> {
        if length > self.remaining() {
            return Err(WireError::UnexpectedEof);
        }
        let mut raw = vec![0u8; length];
        self.read_bytes(&mut raw)?;
        utf8::decode_utf8(raw)
    }
}

/// A cursor over writable bytes.
///
/// Writing past the limit is a bounds error, not a reallocation; callers size
/// buffers up front (the generated writers measure before writing).
pub trait WritableSequentialData {
    /// Total size of the underlying storage.
    fn capacity(&self) -> usize;

    /// Offset of the next byte to write.
    fn position(&self) -> usize;

    /// One past the last writable offset.
    fn limit(&self) -> usize;

    /// Moves the limit, clamped to `[position, capacity]`.
    fn set_limit(&mut self, limit: usize);

    /// Writes one byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), WireError>;

    /// Writes all of `src`.
    fn write_bytes(&mut self, src: &[u8]) -> Result<(), WireError>;

    fn remaining(&self) -> usize {
        self.limit() - self.position()
    }

    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Writes a base-128 varint.
    fn write_varint64(&mut self, value: u64) -> Result<(), WireError>
    where
        Self: Sized,
    {
        varint::write_varint64(self, value)
    }

    /// Writes a 32-bit base-128 varint.
    fn write_varint32(&mut self, value: u32) -> Result<(), WireError>
    where
        Self: Sized,
    {
        varint::write_varint32(self, value)
    }

    /// Writes a zig-zag encoded `sint32`.
    fn write_signed_varint32(&mut self, value: i32) -> Result<(), WireError>
    where
        Self: Sized,
    {
        self.write_varint32(varint::zigzag_encode32(value))
    }

    /// Writes a zig-zag encoded `sint64`.
    fn write_signed_varint64(&mut self, value: i64) -> Result<(), WireError>
    where
        Self: Sized,
    {
        self.write_varint64(varint::zigzag_encode64(value))
    }

    /// Writes a little-endian fixed 32-bit value.
    fn write_fixed32(&mut self, value: u32) -> Result<(), WireError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian fixed 64-bit value.
    fn write_fixed64(&mut self, value: u64) -> Result<(), WireError> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_float(&mut self, value: f32) -> Result<(), WireError> {
        self.write_fixed32(value.to_bits())
    }

    fn write_double(&mut self, value: f64) -> Result<(), WireError> {
        self.write_fixed64(value.to_bits())
    }

    /// Writes the UTF-8 bytes of `value`, with no length prefix.
    ///
    /// When a prefix is needed the caller computes it up front with
    /// [`utf8::encoded_length`].
    fn write_utf8(&mut self, value: &str) -> Result<(), WireError> {
        utf8::encode_utf8(value, self)
    }
}
