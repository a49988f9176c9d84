//! Converters between source files and the IR.
//!
//! A converter is a pair of pure functions over files:
//!
//! - `to_ir(path)` parses a source file into raw IR JSON (before migration)
//! - `from_ir(ir, path)` writes a source file for an IR document
//!
//! Its `id` is stable across runs and feeds the conversion cache key, so a
//! converter upgrade invalidates cached output.

mod command;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::ConverterSectionConfig;
use crate::core::Representation;
use crate::ir::IrDocument;

pub use command::CommandConverter;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to read `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to write `{0}`")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("converter `{converter}` failed on `{path}`: {message}")]
    Failed {
        converter: String,
        path: PathBuf,
        message: String,
    },

    #[error("converter `{converter}` produced invalid IR JSON for `{path}`")]
    InvalidOutput {
        converter: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Converter: Send + Sync {
    /// Stable identity, part of every cache key.
    fn id(&self) -> &str;

    fn to_ir(&self, path: &Path) -> Result<Value, ConversionError>;

    /// Write `output`, creating parent directories as needed.
    fn from_ir(&self, ir: &IrDocument, output: &Path) -> Result<(), ConversionError>;
}

/// The converters an engine works with.
#[derive(Clone)]
pub struct ConverterSet {
    pub a: Arc<dyn Converter>,
    pub b: Arc<dyn Converter>,
    /// Used for test and mock files; `None` disables syncing them
    pub tests: Option<Arc<dyn Converter>>,
}

impl ConverterSet {
    pub fn new(a: Arc<dyn Converter>, b: Arc<dyn Converter>) -> Self {
        Self { a, b, tests: None }
    }

    pub fn with_tests(mut self, tests: Arc<dyn Converter>) -> Self {
        self.tests = Some(tests);
        self
    }

    /// Command converters from `[converter.*]`, run from `root`.
    pub fn from_config(config: &ConverterSectionConfig, root: &Path) -> Self {
        let set = Self::new(
            Arc::new(CommandConverter::from_config(&config.a, root)),
            Arc::new(CommandConverter::from_config(&config.b, root)),
        );
        match &config.tests {
            Some(tests) => set.with_tests(Arc::new(CommandConverter::from_config(tests, root))),
            None => set,
        }
    }

    /// Converter that reads and writes files of `rep`.
    pub fn for_representation(&self, rep: Representation) -> &dyn Converter {
        match rep {
            Representation::A => self.a.as_ref(),
            Representation::B => self.b.as_ref(),
        }
    }

    pub fn tests(&self) -> Option<&dyn Converter> {
        self.tests.as_deref()
    }
}

impl std::fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterSet")
            .field("a", &self.a.id())
            .field("b", &self.b.id())
            .field("tests", &self.tests.as_ref().map(|t| t.id().to_owned()))
            .finish()
    }
}
