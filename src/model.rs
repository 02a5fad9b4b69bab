//! Shared data types: compiler configuration and the result bundle handed
//! to the writers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::compiler::source::SourceRef;

/// Which declared identifiers get replaced with generated short names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenameMode {
    /// Every non-imported symbol.
    All,
    /// Only symbols with internal linkage; attributes, uniforms, varyings
    /// and exported functions keep their names.
    InternalOnly,
    /// Leave every name unchanged.
    None,
}

/// Metadata format written next to the emitted shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Cpp,
    Rust,
}

/// Resolves an include reference: `(path, relative_to) -> Source`.
pub type FileAccess = Box<dyn Fn(&str, &str) -> Option<SourceRef>>;

/// Immutable configuration snapshot for one compile invocation.
pub struct CompilerOptions {
    /// Constant folding and trivial inlining.
    pub compact_tree: bool,
    /// Minified output text.
    pub remove_whitespace: bool,
    pub rename: RenameMode,
    /// Drop globals unreachable from the entry points.
    pub trim_symbols: bool,
    pub file_access: Option<FileAccess>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            compact_tree: true,
            remove_whitespace: false,
            rename: RenameMode::All,
            trim_symbols: true,
            file_access: None,
        }
    }
}

/// One emitted shader with its interface metadata. Attribute and uniform
/// maps go from the declared variable name to its type name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShaderOutput {
    pub name: String,
    pub contents: String,
    pub attributes: BTreeMap<String, String>,
    pub uniforms: BTreeMap<String, String>,
}

/// Everything a successful compile produces.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct CompilerResult {
    pub shaders: Vec<ShaderOutput>,
    /// Original declared name to final emitted name, for symbols that were
    /// renamed.
    pub renaming: BTreeMap<String, String>,
}
