//! Byte-buffer primitives and protobuf wire-format helpers for code produced
//! by `protoscribe-build`.
//!
//! Generated sources only ever reference the types exported here: the
//! immutable [`Bytes`] sequence, the [`BufferedData`] read/write buffer, the
//! [`ReadableSequentialData`] / [`WritableSequentialData`] cursor traits, and
//! the varint / UTF-8 helpers they are built on. The runtime is independent of
//! the compiler and carries its own test suite.
//!
//! # Example
//!
//! ```rust
//! use protoscribe::buffer::BufferedData;
//! use protoscribe::sequential::{ReadableSequentialData, WritableSequentialData};
//!
//! let mut buf = BufferedData::allocate(16);
//! buf.write_varint64(300)?;
//! buf.flip();
//! assert_eq!(buf.read_varint64()?, 300);
//! # Ok::<(), protoscribe::error::WireError>(())
//! ```

pub mod buffer;
pub mod bytes;
pub mod error;
pub mod sequential;
pub mod utf8;
pub mod varint;
pub mod wire;

pub use crate::buffer::BufferedData;
pub use crate::bytes::{Bytes, RandomAccessData};
pub use crate::error::{BufferError, WireError};
pub use crate::sequential::{ReadableSequentialData, WritableSequentialData};
