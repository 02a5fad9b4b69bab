pub mod cli;
pub mod compiler;
pub mod model;
pub mod writer;

use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;

use compiler::log::Log;
use compiler::source::{Source, SourceRef};
use model::{CompilerOptions, OutputFormat};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Load ───────────────────────────────────────────────────────
    let mut sources: Vec<SourceRef> = Vec::new();
    for path in &args.inputs {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        sources.push(Source::new(path.display().to_string(), text));
    }

    let options = CompilerOptions {
        compact_tree: !args.no_compact,
        remove_whitespace: args.minify,
        rename: args.rename,
        trim_symbols: !args.keep_unused,
        file_access: Some(Box::new(|path, relative_to| {
            let base = Path::new(relative_to).parent().unwrap_or(Path::new(""));
            let full = base.join(path);
            let text = std::fs::read_to_string(&full).ok()?;
            Some(Source::new(full.display().to_string(), text))
        })),
    };

    // 2. ── Compile ─────────────────────────────────────────────────────
    let mut log = Log::new();
    let result = compiler::compile(&mut log, &sources, &options);
    for diagnostic in &log.diagnostics {
        eprintln!("{}", diagnostic.render());
    }
    let Some(result) = result else {
        bail!("compilation failed with {} error(s)", log.error_count());
    };

    // 3. ── Write outputs ───────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    writer::glsl::emit(&result, &args.output).with_context(|| "Writing shaders")?;
    match args.format {
        OutputFormat::Json => {
            writer::json::emit(&result, &args.output).with_context(|| "Writing JSON metadata")?
        }
        OutputFormat::Cpp => {
            writer::cpp::emit(&result, &args.output).with_context(|| "Writing C++ header")?
        }
        OutputFormat::Rust => {
            writer::rs::emit(&result, &args.output).with_context(|| "Writing Rust module")?
        }
    }

    Ok(())
}
