//! Configuration for schema compilation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default cycle-break set: oneof branches over recursive cryptographic key
/// structures, keyed by the upper-snake form of the branch field name.
const DEFAULT_CYCLE_BREAK: [&str; 4] = [
    "THRESHOLD_KEY",
    "KEY_LIST",
    "THRESHOLD_SIGNATURE",
    "SIGNATURE_LIST",
];

fn default_warning_sink(message: &str) {
    eprintln!("warning: {message}");
}

/// Configuration for schema compilation.
///
/// Each artifact kind gets its own module subtree under the output directory;
/// the module names here are the roots of those subtrees.
#[derive(Debug, Clone)]
pub struct Config {
    /// Output directory for generated files.
    pub(crate) out_dir: Option<PathBuf>,

    /// Module root for model sources.
    pub(crate) model_module: String,
    /// Module root for parser sources.
    pub(crate) parser_module: String,
    /// Module root for writer sources.
    pub(crate) writer_module: String,
    /// Module root for generated unit tests.
    pub(crate) test_module: String,
    /// Module root reserved for codec sources.
    pub(crate) codec_module: String,
    /// Module root reserved for JSON codec sources.
    pub(crate) json_codec_module: String,

    /// Oneof branches excluded from generated test data, keyed by the
    /// upper-snake form of the branch field name. Without this, test-data
    /// construction over recursive schemas would not terminate.
    pub(crate) cycle_break: BTreeSet<String>,

    /// Sink for non-fatal diagnostics. Warnings never alter the exit status.
    pub(crate) warning_sink: fn(&str),

    /// Disable formatting with prettyplease.
    pub(crate) skip_format: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            out_dir: None,
            model_module: "model".to_string(),
            parser_module: "parser".to_string(),
            writer_module: "writer".to_string(),
            test_module: "tests".to_string(),
            codec_module: "codec".to_string(),
            json_codec_module: "json".to_string(),
            cycle_break: DEFAULT_CYCLE_BREAK.iter().map(|s| s.to_string()).collect(),
            warning_sink: default_warning_sink,
            skip_format: false,
        }
    }
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory for generated Rust files.
    pub fn out_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the module root for model sources.
    pub fn model_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.model_module = name.into();
        self
    }

    /// Set the module root for parser sources.
    pub fn parser_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.parser_module = name.into();
        self
    }

    /// Set the module root for writer sources.
    pub fn writer_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.writer_module = name.into();
        self
    }

    /// Set the module root for generated unit tests.
    pub fn test_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.test_module = name.into();
        self
    }

    /// Replace the cycle-break set. Entries are upper-snake branch field
    /// names, e.g. `THRESHOLD_KEY`.
    pub fn cycle_break<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cycle_break = names.into_iter().map(Into::into).collect();
        self
    }

    /// Route warnings somewhere other than stderr.
    pub fn warning_sink(&mut self, sink: fn(&str)) -> &mut Self {
        self.warning_sink = sink;
        self
    }

    /// Skip formatting with prettyplease.
    pub fn skip_format(&mut self) -> &mut Self {
        self.skip_format = true;
        self
    }

    pub(crate) fn warn(&self, message: &str) {
        (self.warning_sink)(message);
    }

    /// Compile every `.proto` file under `proto_dir`.
    pub fn compile_protos(&self, proto_dir: impl AsRef<Path>) -> Result<(), crate::Error> {
        crate::codegen::compile(self, proto_dir.as_ref())
    }
}
