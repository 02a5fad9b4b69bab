use clap::Parser;
use std::path::PathBuf;

use crate::model::{OutputFormat, RenameMode};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input shader source files, compiled together
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,
    /// Metadata format written next to the emitted shaders
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
    /// Strip insignificant whitespace from the emitted shaders
    #[arg(long)]
    pub minify: bool,
    /// Symbol renaming policy
    #[arg(long, value_enum, default_value = "all")]
    pub rename: RenameMode,
    /// Keep declarations even when nothing references them
    #[arg(long)]
    pub keep_unused: bool,
    /// Skip constant folding and trivial inlining
    #[arg(long)]
    pub no_compact: bool,
}
