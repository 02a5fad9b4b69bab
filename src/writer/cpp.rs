//! Emit a C++ header embedding the shader sources and renamed symbol names.

use crate::model::CompilerResult;
use crate::writer::{escape, screaming_snake};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub fn emit(result: &CompilerResult, out_dir: &Path) -> io::Result<()> {
    let mut h = File::create(out_dir.join("shaders.h"))?;
    write!(h, "{}", render(result))?;
    Ok(())
}

pub fn render(result: &CompilerResult) -> String {
    let mut out = String::new();
    out.push_str("#pragma once\n");
    out.push_str("// Auto-generated – DO NOT EDIT\n\n");

    for shader in &result.shaders {
        out.push_str(&format!(
            "static const char *GLSLPACK_SOURCE_{} = \"{}\";\n",
            screaming_snake(&shader.name),
            escape(&shader.contents)
        ));
    }
    if !result.renaming.is_empty() {
        out.push('\n');
    }
    for (original, renamed) in &result.renaming {
        out.push_str(&format!(
            "static const char *GLSLPACK_NAME_{} = \"{}\";\n",
            screaming_snake(original),
            escape(renamed)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShaderOutput;
    use std::collections::BTreeMap;

    #[test]
    fn test_header_constants() {
        let mut renaming = BTreeMap::new();
        renaming.insert("lightColor".to_string(), "a".to_string());
        let result = CompilerResult {
            shaders: vec![ShaderOutput {
                name: "vertexMain".into(),
                contents: "void main() {\n}\n".into(),
                attributes: BTreeMap::new(),
                uniforms: BTreeMap::new(),
            }],
            renaming,
        };
        let text = render(&result);
        assert!(text.starts_with("#pragma once\n"));
        assert!(text.contains(
            "static const char *GLSLPACK_SOURCE_VERTEX_MAIN = \"void main() {\\n}\\n\";"
        ));
        assert!(text.contains("static const char *GLSLPACK_NAME_LIGHT_COLOR = \"a\";"));
    }
}
