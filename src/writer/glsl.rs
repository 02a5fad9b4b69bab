//! Write each emitted shader as its own `.glsl` file.

use crate::model::CompilerResult;
use std::fs;
use std::io;
use std::path::Path;

pub fn emit(result: &CompilerResult, out_dir: &Path) -> io::Result<()> {
    for shader in &result.shaders {
        fs::write(out_dir.join(format!("{}.glsl", shader.name)), &shader.contents)?;
    }
    Ok(())
}
