//! Emit a Rust module embedding the shader sources and renamed symbol names.

use crate::model::CompilerResult;
use crate::writer::{escape, screaming_snake};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub fn emit(result: &CompilerResult, out_dir: &Path) -> io::Result<()> {
    let mut f = File::create(out_dir.join("shaders.rs"))?;
    write!(f, "{}", render(result))?;
    Ok(())
}

pub fn render(result: &CompilerResult) -> String {
    let mut out = String::new();
    out.push_str("// Auto-generated – DO NOT EDIT\n\n");

    for shader in &result.shaders {
        out.push_str(&format!(
            "pub const SOURCE_{}: &str = \"{}\";\n",
            screaming_snake(&shader.name),
            escape(&shader.contents)
        ));
    }
    if !result.renaming.is_empty() {
        out.push('\n');
    }
    for (original, renamed) in &result.renaming {
        out.push_str(&format!(
            "pub const NAME_{}: &str = \"{}\";\n",
            screaming_snake(original),
            escape(renamed)
        ));
    }
    out
}
