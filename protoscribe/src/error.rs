use core::fmt;

/// Errors raised by the random-access and sequential buffer primitives.
///
/// A bounds violation is always surfaced to the caller, never silently
/// truncated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// A read or write touched bytes outside the buffer's readable or
    /// writable range.
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::OutOfBounds {
                offset,
                length,
                capacity,
            } => {
                write!(
                    f,
                    "access of {length} byte(s) at offset {offset} is out of bounds for capacity {capacity}"
                )
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// Errors raised while reading or writing the protobuf wire format.
///
/// Parsers return these to their caller; none of the decode paths panic on
/// malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A buffer bounds violation occurred mid-field.
    Buffer(BufferError),
    /// A varint ran past its maximum encoded length or overflowed the target.
    InvalidVarint,
    /// The low three bits of a field key held a value outside `0..=5`.
    InvalidWireType { value: u8 },
    /// A field number was zero or above `2^29 - 1`.
    TagOutOfRange { tag: u32 },
    /// The input ended in the middle of a field.
    UnexpectedEof,
    /// A string field held bytes that are not valid UTF-8.
    InvalidUtf8,
    /// A length prefix exceeded the remaining input or addressable memory.
    LengthOverflow { value: u64 },
    /// Group wire types are proto2-era and never produced by proto3.
    DeprecatedGroupEncoding,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Buffer(e) => write!(f, "{e}"),
            WireError::InvalidVarint => write!(f, "invalid varint encoding"),
            WireError::InvalidWireType { value } => {
                write!(f, "invalid 'wire type' value: {value}")
            }
            WireError::TagOutOfRange { tag } => {
                write!(f, "field number {tag} is outside the valid tag range")
            }
            WireError::UnexpectedEof => write!(f, "unexpected end of buffer"),
            WireError::InvalidUtf8 => write!(f, "invalid UTF-8 in string field"),
            WireError::LengthOverflow { value } => {
                write!(f, "length prefix {value} exceeds the remaining input")
            }
            WireError::DeprecatedGroupEncoding => {
                write!(f, "deprecated group encoding not supported")
            }
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Buffer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BufferError> for WireError {
    fn from(e: BufferError) -> Self {
        WireError::Buffer(e)
    }
}
