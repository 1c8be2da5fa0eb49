//! Immutable shareable byte sequences with random access.

use core::fmt;

use crate::error::{BufferError, WireError};

/// Read-only positional access to a byte sequence.
///
/// Implementations are indexed from zero up to [`length`](Self::length)
/// regardless of how the storage came to be; a slice of a larger sequence
/// re-bases its offsets so callers never see the parent's coordinates.
pub trait RandomAccessData {
    /// Number of readable bytes.
    fn length(&self) -> usize;

    /// Returns the byte at `offset`.
    fn get_byte(&self, offset: usize) -> Result<u8, BufferError>;

    /// Copies up to `length` bytes starting at `src_offset` into
    /// `dst[dst_offset..]` and returns the number of bytes copied.
    ///
    /// The copy is clamped to the bytes actually available at `src_offset`,
    /// but a destination range that does not fit in `dst` is an error, not a
    /// truncation.
    fn get_bytes(
        &self,
        src_offset: usize,
        dst: &mut [u8],
        dst_offset: usize,
        length: usize,
    ) -> Result<usize, BufferError>;

    /// Reads a big-endian `i32` at `offset`.
    fn get_int(&self, offset: usize) -> Result<i32, BufferError>;

    /// Reads a big-endian `i64` at `offset`.
    fn get_long(&self, offset: usize) -> Result<i64, BufferError>;

    /// Returns a zero-copy view of `length` bytes starting at `offset`.
    fn slice(&self, offset: usize, length: usize) -> Result<Bytes, BufferError>;

    /// Decodes the full range as UTF-8.
    fn as_utf8_string(&self) -> Result<String, WireError>;

    /// True iff the sequence starts with `prefix`. Empty prefixes always
    /// match, including on empty data.
    fn matches_prefix(&self, prefix: &[u8]) -> bool;

    /// True iff `needle` occurs at exactly `offset`, entirely within bounds.
    fn contains(&self, offset: usize, needle: &[u8]) -> bool;
}

/// An immutable byte sequence that can be shared across threads and sliced
/// without copying.
///
/// Cloning and [`slice`](RandomAccessData::slice) are O(1); every view keeps
/// the shared storage alive.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes {
    data: bytes::Bytes,
}

impl Bytes {
    /// The empty sequence.
    pub const EMPTY: Bytes = Bytes {
        data: bytes::Bytes::new(),
    };

    /// Wraps existing storage without copying.
    pub fn wrap(data: impl Into<bytes::Bytes>) -> Self {
        Bytes { data: data.into() }
    }

    /// Copies a slice into new owned storage.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Bytes {
            data: bytes::Bytes::copy_from_slice(data),
        }
    }

    /// View of the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<(), BufferError> {
        if offset.checked_add(length).map_or(true, |end| end > self.data.len()) {
            return Err(BufferError::OutOfBounds {
                offset,
                length,
                capacity: self.data.len(),
            });
        }
        Ok(())
    }
}

impl RandomAccessData for Bytes {
    fn length(&self) -> usize {
        self.data.len()
    }

    fn get_byte(&self, offset: usize) -> Result<u8, BufferError> {
        self.check_range(offset, 1)?;
        Ok(self.data[offset])
    }

    fn get_bytes(
        &self,
        src_offset: usize,
        dst: &mut [u8],
        dst_offset: usize,
        length: usize,
    ) -> Result<usize, BufferError> {
        if dst_offset.checked_add(length).map_or(true, |end| end > dst.len()) {
            return Err(BufferError::OutOfBounds {
                offset: dst_offset,
                length,
                capacity: dst.len(),
            });
        }
        let available = self.data.len().saturating_sub(src_offset);
        let copied = length.min(available);
        dst[dst_offset..dst_offset + copied]
            .copy_from_slice(&self.data[src_offset..src_offset + copied]);
        Ok(copied)
    }

    fn get_int(&self, offset: usize) -> Result<i32, BufferError> {
        self.check_range(offset, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(i32::from_be_bytes(raw))
    }

    fn get_long(&self, offset: usize) -> Result<i64, BufferError> {
        self.check_range(offset, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[offset..offset + 8]);
        Ok(i64::from_be_bytes(raw))
    }

    fn slice(&self, offset: usize, length: usize) -> Result<Bytes, BufferError> {
        self.check_range(offset, length)?;
        Ok(Bytes {
            data: self.data.slice(offset..offset + length),
        })
    }

    fn as_utf8_string(&self) -> Result<String, WireError> {
        core::str::from_utf8(&self.data)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    fn matches_prefix(&self, prefix: &[u8]) -> bool {
        self.data.len() >= prefix.len() && &self.data[..prefix.len()] == prefix
    }

    fn contains(&self, offset: usize, needle: &[u8]) -> bool {
        match offset.checked_add(needle.len()) {
            Some(end) if end <= self.data.len() => &self.data[offset..end] == needle,
            _ => false,
        }
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes(")?;
        for byte in self.data.iter() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Bytes::wrap(data)
    }
}

impl From<&'static [u8]> for Bytes {
    fn from(data: &'static [u8]) -> Self {
        Bytes::wrap(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(bytes: &[u8]) -> Bytes {
        Bytes::copy_from_slice(bytes)
    }

    #[test]
    fn slice_length_and_contents() {
        let buf = data(&[10, 11, 12, 13, 14, 15, 16]);
        let slice = buf.slice(2, 5).unwrap();
        assert_eq!(slice.length(), 5);
        for i in 0..5 {
            assert_eq!(slice.get_byte(i).unwrap(), buf.get_byte(2 + i).unwrap());
        }
    }

    #[test]
    fn slice_out_of_bounds() {
        let buf = data(&[1, 2, 3]);
        assert!(buf.slice(2, 2).is_err());
        assert!(buf.slice(4, 0).is_err());
        // Zero-length slice at the end is legal.
        assert_eq!(buf.slice(3, 0).unwrap().length(), 0);
    }

    #[test]
    fn get_bytes_good_length() {
        let buf = data(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut dst = [0u8; 8];
        assert_eq!(buf.get_bytes(4, &mut dst, 0, 4).unwrap(), 4);
        assert_eq!(dst, [4, 5, 6, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn get_bytes_extra_src_length() {
        let buf = data(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut dst = [0u8; 8];
        assert_eq!(buf.get_bytes(3, &mut dst, 0, 6).unwrap(), 5);
        assert_eq!(dst, [3, 4, 5, 6, 7, 0, 0, 0]);
    }

    #[test]
    fn get_bytes_extra_dst_length() {
        let buf = data(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut dst = [0u8; 8];
        assert!(matches!(
            buf.get_bytes(4, &mut dst, 6, 4),
            Err(BufferError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn utf8_strings() {
        for s in ["", "a", "ab", "abc", "✅"] {
            let buf = data(s.as_bytes());
            assert_eq!(buf.as_utf8_string().unwrap(), s);
        }
        assert_eq!(
            data(&[0xff, 0xfe]).as_utf8_string(),
            Err(WireError::InvalidUtf8)
        );
    }

    #[test]
    fn matches_prefix_cases() {
        let buf = data(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(buf.matches_prefix(&[1]));
        assert!(buf.matches_prefix(&[1, 2]));
        assert!(buf.matches_prefix(&[1, 2, 3, 4]));
        assert!(buf.matches_prefix(&[1, 2, 3, 4, 5, 6, 7, 8, 9]));

        assert!(!buf.matches_prefix(&[2]));
        assert!(!buf.matches_prefix(&[1, 2, 3, 2]));
        assert!(!buf.matches_prefix(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 0]));
    }

    #[test]
    fn matches_prefix_empty_on_empty() {
        assert!(Bytes::EMPTY.matches_prefix(&[]));
        assert!(data(&[1]).matches_prefix(&[]));
    }

    #[test]
    fn contains_respects_slice_bounds() {
        let buf = data(&[1, 2, 3, 4, 5, 6]);
        assert!(buf.contains(0, &[1, 2]));
        assert!(buf.contains(1, &[2, 3, 4, 5, 6]));
        assert!(!buf.contains(1, &[2, 3, 3]));
        assert!(!buf.contains(1, &[2, 3, 4, 5, 6, 7]));

        let slice = buf.slice(1, 4).unwrap();
        assert!(slice.contains(0, &[2, 3, 4, 5]));
        assert!(!slice.contains(0, &[1]));
        assert!(!slice.contains(0, &[2, 3, 4, 5, 6]));
        assert!(slice.contains(1, &[3, 4, 5]));
        assert!(!slice.contains(1, &[3, 4, 5, 6]));
    }

    #[test]
    fn big_endian_int() {
        let buf = data(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(buf.get_int(0).unwrap(), 0x01020304);
        assert_eq!(buf.get_int(1).unwrap(), 0x02030405);
        assert!(buf.get_int(3).is_err());

        let slice = buf.slice(1, 5).unwrap();
        assert_eq!(slice.get_int(0).unwrap(), buf.get_int(1).unwrap());
        assert_eq!(slice.get_int(1).unwrap(), 0x03040506);
    }

    #[test]
    fn big_endian_long() {
        let buf = data(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a]);
        assert_eq!(buf.get_long(0).unwrap(), 0x0102030405060708);
        assert_eq!(buf.get_long(1).unwrap(), 0x0203040506070809);

        let slice = buf.slice(1, 9).unwrap();
        assert_eq!(slice.get_long(0).unwrap(), 0x0203040506070809);
        assert_eq!(slice.get_long(1).unwrap(), 0x030405060708090a);
    }

    #[test]
    fn slices_share_storage() {
        let buf = data(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let slice = buf.slice(2, 4).unwrap();
        // Both views read from the same allocation.
        assert_eq!(
            slice.as_slice().as_ptr(),
            buf.as_slice()[2..].as_ptr()
        );
    }
}
