//! `protoscribe-build` compiles proto3 schema files into Rust sources for use
//! with the `protoscribe` runtime.
//!
//! For every message it emits four artifacts into kind-specific module
//! subtrees: the model type, a parser, a writer, and a unit test. The
//! compiler is a library with no CLI; a build script drives it:
//!
//! ```rust,no_run
//! // In build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     protoscribe_build::compile_protos("schemas/")?;
//!     Ok(())
//! }
//! ```
//!
//! Generating into the source tree gives an ordinary module to mount; the
//! emitted `mod.rs` chain then resolves like any hand-written tree:
//!
//! ```rust,ignore
//! // build.rs writes into src/generated, lib.rs mounts it:
//! mod generated;
//! ```
//!
//! # Customizing generation
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoscribe_build::Error> {
//!     protoscribe_build::Config::new()
//!         .out_dir("src/generated")
//!         .cycle_break(["THRESHOLD_KEY", "KEY_LIST"])
//!         .compile_protos("schemas/")?;
//!     Ok(())
//! }
//! ```

mod codegen;
mod config;
mod error;
pub mod lookup;
pub mod model;
pub mod parser;

pub use config::Config;
pub use error::Error;

use std::path::Path;

/// Compile every `.proto` file under `proto_dir` with default settings.
///
/// The directory is walked recursively; each file's parent directory name,
/// lowercased, becomes the namespace bucket its artifacts are emitted under.
pub fn compile_protos(proto_dir: impl AsRef<Path>) -> Result<(), Error> {
    Config::new().compile_protos(proto_dir)
}
