//! JSON metadata: the whole compiler result, pretty-printed.

use crate::model::CompilerResult;
use std::fs::File;
use std::io;
use std::path::Path;

pub fn emit(result: &CompilerResult, out_dir: &Path) -> io::Result<()> {
    let file = File::create(out_dir.join("shaders.json"))?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}

pub fn to_string(result: &CompilerResult) -> String {
    serde_json::to_string_pretty(result).expect("result serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShaderOutput;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_shape() {
        let mut uniforms = BTreeMap::new();
        uniforms.insert("tint".to_string(), "vec3".to_string());
        let result = CompilerResult {
            shaders: vec![ShaderOutput {
                name: "fragmentMain".into(),
                contents: "void main() {\n}\n".into(),
                attributes: BTreeMap::new(),
                uniforms,
            }],
            renaming: BTreeMap::new(),
        };
        let text = to_string(&result);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["shaders"][0]["name"], "fragmentMain");
        assert_eq!(value["shaders"][0]["uniforms"]["tint"], "vec3");
    }
}
