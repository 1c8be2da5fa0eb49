//! A concrete owned buffer implementing both sequential cursors.

use crate::bytes::Bytes;
use crate::error::{BufferError, WireError};
use crate::sequential::{ReadableSequentialData, WritableSequentialData};

/// A fixed-capacity mutable buffer with `position` / `limit` bookkeeping.
///
/// A freshly [`allocate`](Self::allocate)d buffer is in write mode: the limit
/// sits at the capacity and writes advance the position. [`flip`](Self::flip)
/// swaps it to read mode by fencing the limit at the write position and
/// rewinding. A `BufferedData` has exactly one owner at a time; share the
/// contents by converting to [`Bytes`].
#[derive(Debug, Clone)]
pub struct BufferedData {
    data: Vec<u8>,
    position: usize,
    limit: usize,
}

impl BufferedData {
    /// A zeroed buffer of `capacity` bytes, ready for writing.
    pub fn allocate(capacity: usize) -> Self {
        BufferedData {
            data: vec![0; capacity],
            position: 0,
            limit: capacity,
        }
    }

    /// Wraps existing bytes, ready for reading from the start.
    pub fn wrap(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let limit = data.len();
        BufferedData {
            data,
            position: 0,
            limit,
        }
    }

    /// Swaps write mode to read mode: the bytes written so far become the
    /// readable range.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Rewinds the position and restores the limit to the full capacity.
    pub fn reset(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Number of bytes in the readable range, i.e. the current limit.
    pub fn length(&self) -> usize {
        self.limit
    }

    // Inherent copies of the cursor accessors. Both sequential traits declare
    // these, so unqualified calls on a concrete `BufferedData` would otherwise
    // be ambiguous.

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(self.position, self.data.len());
    }

    /// Copies bytes starting at an absolute `offset` into `dst`, independent
    /// of the current position.
    pub fn get_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<(), BufferError> {
        if offset.checked_add(dst.len()).map_or(true, |end| end > self.limit) {
            return Err(BufferError::OutOfBounds {
                offset,
                length: dst.len(),
                capacity: self.limit,
            });
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    /// Copies the readable range `[position, limit)` into an immutable
    /// [`Bytes`].
    pub fn as_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data[self.position..self.limit])
    }

    fn out_of_bounds(&self, length: usize) -> WireError {
        WireError::Buffer(BufferError::OutOfBounds {
            offset: self.position,
            length,
            capacity: self.limit,
        })
    }
}

impl ReadableSequentialData for BufferedData {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn position(&self) -> usize {
        self.position
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(self.position, self.data.len());
    }

    fn skip(&mut self, n: usize) -> usize {
        let skipped = n.min(self.remaining());
        self.position += skipped;
        skipped
    }

    fn read_byte(&mut self) -> Result<u8, WireError> {
        if self.position >= self.limit {
            return Err(WireError::UnexpectedEof);
        }
        let byte = self.data[self.position];
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), WireError> {
        if dst.len() > self.remaining() {
            return Err(WireError::UnexpectedEof);
        }
        dst.copy_from_slice(&self.data[self.position..self.position + dst.len()]);
        self.position += dst.len();
        Ok(())
    }
}

impl WritableSequentialData for BufferedData {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn position(&self) -> usize {
        self.position
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(self.position, self.data.len());
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), WireError> {
        if self.position >= self.limit {
            return Err(self.out_of_bounds(1));
        }
        self.data[self.position] = byte;
        self.position += 1;
        Ok(())
    }

    fn write_bytes(&mut self, src: &[u8]) -> Result<(), WireError> {
        if src.len() > WritableSequentialData::remaining(self) {
            return Err(self.out_of_bounds(src.len()));
        }
        self.data[self.position..self.position + src.len()].copy_from_slice(src);
        self.position += src.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::bytes::RandomAccessData;

    #[test]
    fn flip_swaps_write_to_read() {
        let mut buf = BufferedData::allocate(8);
        buf.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(WritableSequentialData::position(&buf), 3);

        buf.flip();
        assert_eq!(ReadableSequentialData::position(&buf), 0);
        assert_eq!(ReadableSequentialData::limit(&buf), 3);
        assert_eq!(buf.read_byte().unwrap(), 1);

        let mut rest = [0u8; 2];
        buf.read_bytes(&mut rest).unwrap();
        assert_eq!(rest, [2, 3]);
        assert_eq!(buf.read_byte(), Err(WireError::UnexpectedEof));
    }

    #[test]
    fn write_past_limit_is_an_error() {
        let mut buf = BufferedData::allocate(2);
        buf.write_bytes(&[1, 2]).unwrap();
        assert!(matches!(
            buf.write_byte(3),
            Err(WireError::Buffer(BufferError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn skip_clamps_to_remaining() {
        let mut buf = BufferedData::wrap(vec![1, 2, 3, 4]);
        assert_eq!(buf.skip(2), 2);
        assert_eq!(buf.skip(10), 2);
        assert_eq!(buf.skip(1), 0);
        assert!(!ReadableSequentialData::has_remaining(&buf));
    }

    #[test]
    fn limit_fences_reads() {
        let mut buf = BufferedData::wrap(vec![1, 2, 3, 4, 5]);
        buf.set_limit(2);
        assert_eq!(buf.read_byte().unwrap(), 1);
        assert_eq!(buf.read_byte().unwrap(), 2);
        assert_eq!(buf.read_byte(), Err(WireError::UnexpectedEof));

        // Restoring the limit resumes where the fence was.
        buf.set_limit(5);
        assert_eq!(buf.read_byte().unwrap(), 3);
    }

    #[test]
    fn set_limit_clamps() {
        let mut buf = BufferedData::wrap(vec![1, 2, 3]);
        buf.skip(2);
        buf.set_limit(1);
        assert_eq!(ReadableSequentialData::limit(&buf), 2);
        buf.set_limit(100);
        assert_eq!(ReadableSequentialData::limit(&buf), 3);
    }

    #[test]
    fn direct_offset_get_bytes() {
        let mut buf = BufferedData::allocate(8);
        buf.write_bytes(&[9, 8, 7]).unwrap();
        buf.flip();

        let mut dst = [0u8; 3];
        buf.get_bytes(0, &mut dst).unwrap();
        assert_eq!(dst, [9, 8, 7]);

        let mut too_far = [0u8; 3];
        assert!(buf.get_bytes(1, &mut too_far).is_err());
    }

    #[test]
    fn fixed_width_roundtrip() {
        let mut buf = BufferedData::allocate(32);
        buf.write_fixed32(0xdead_beef).unwrap();
        buf.write_fixed64(0x0102_0304_0506_0708).unwrap();
        buf.write_float(1.5).unwrap();
        buf.write_double(-2.25).unwrap();
        buf.flip();
        assert_eq!(buf.read_fixed32().unwrap(), 0xdead_beef);
        assert_eq!(buf.read_fixed64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(buf.read_float().unwrap(), 1.5);
        assert_eq!(buf.read_double().unwrap(), -2.25);
    }

    #[test]
    fn fixed_width_is_little_endian() {
        let mut buf = BufferedData::allocate(4);
        buf.write_fixed32(0x0102_0304).unwrap();
        buf.flip();
        let mut raw = [0u8; 4];
        buf.get_bytes(0, &mut raw).unwrap();
        assert_eq!(raw, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn as_bytes_snapshots_readable_range() {
        let mut buf = BufferedData::allocate(8);
        buf.write_bytes(&[5, 6, 7]).unwrap();
        buf.flip();
        let bytes = buf.as_bytes();
        assert_eq!(bytes.length(), 3);
        assert!(bytes.matches_prefix(&[5, 6]));
    }

    proptest! {
        #[test]
        fn proptest_write_read_roundtrip(data: Vec<u8>) {
            let mut buf = BufferedData::allocate(data.len());
            buf.write_bytes(&data).unwrap();
            buf.flip();
            let mut out = vec![0u8; data.len()];
            buf.read_bytes(&mut out).unwrap();
            prop_assert_eq!(out, data);
        }

        #[test]
        fn proptest_signed_varint_roundtrip(value: i64) {
            let mut buf = BufferedData::allocate(10);
            buf.write_signed_varint64(value).unwrap();
            buf.flip();
            prop_assert_eq!(buf.read_signed_varint64().unwrap(), value);
        }
    }
}
