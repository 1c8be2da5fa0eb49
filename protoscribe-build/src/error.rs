//! Error types for protoscribe-build.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while compiling proto3 schemas.
///
/// Everything here is fatal: the generator propagates the first error to its
/// entry point and produces no further artifacts. Recoverable conditions
/// (unknown elements, unknown options) go through the warning sink instead.
#[derive(Debug)]
pub enum Error {
    /// IO error reading schemas or writing artifacts.
    Io(io::Error),
    /// A proto file failed to parse. No artifact is produced from that file.
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    /// A field referenced a message or enum that no loaded file declares.
    UnresolvedReference {
        symbol: String,
        referenced_by: String,
    },
    /// `map<K, V>` fields are not supported.
    UnsupportedMap { message: String, field: String },
    /// Two messages or enums share a name.
    DuplicateSymbol { symbol: String },
    /// A message reused a field number.
    DuplicateFieldNumber { message: String, number: u32 },
    /// An enum reused a value number.
    DuplicateEnumNumber { enum_name: String, number: i32 },
    /// A proto3 enum is missing its required zero value.
    MissingZeroValue { enum_name: String },
    /// No output directory configured and `OUT_DIR` is not set.
    MissingOutDir,
    /// An emitter produced tokens that are not a valid Rust file.
    EmitFailed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Parse {
                path,
                line,
                column,
                message,
            } => {
                write!(f, "{}:{}:{}: {}", path.display(), line, column, message)
            }
            Self::UnresolvedReference {
                symbol,
                referenced_by,
            } => {
                write!(
                    f,
                    "unresolved reference to '{}' from '{}'",
                    symbol, referenced_by
                )
            }
            Self::UnsupportedMap { message, field } => {
                write!(
                    f,
                    "map fields not supported: '{}' in message '{}'",
                    field, message
                )
            }
            Self::DuplicateSymbol { symbol } => {
                write!(f, "duplicate symbol '{}'", symbol)
            }
            Self::DuplicateFieldNumber { message, number } => {
                write!(
                    f,
                    "field number {} used more than once in message '{}'",
                    number, message
                )
            }
            Self::DuplicateEnumNumber { enum_name, number } => {
                write!(
                    f,
                    "value number {} used more than once in enum '{}'",
                    number, enum_name
                )
            }
            Self::MissingZeroValue { enum_name } => {
                write!(
                    f,
                    "proto3 enum '{}' must define a value numbered 0",
                    enum_name
                )
            }
            Self::MissingOutDir => {
                write!(f, "OUT_DIR not set. Run from build.rs or set out_dir().")
            }
            Self::EmitFailed(msg) => write!(f, "failed to parse generated code: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
