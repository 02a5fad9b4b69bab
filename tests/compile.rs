use std::collections::BTreeMap;

use glslpack::compiler::log::Log;
use glslpack::compiler::source::{Source, SourceRef};
use glslpack::compiler::{compile, type_check};
use glslpack::model::{CompilerOptions, CompilerResult, RenameMode};

const TWO_STAGE: &str = "\
attribute vec4 position;\n\
attribute vec2 uv;\n\
varying vec2 vUv;\n\
uniform mat4 transform;\n\
uniform sampler2D image;\n\
export void vertexMain() {\n\
    vUv = uv;\n\
    gl_Position = transform * position;\n\
}\n\
export void fragmentMain() {\n\
    gl_FragColor = texture2D(image, vUv);\n\
}\n";

fn compile_one(
    text: &str,
    options: CompilerOptions,
) -> (Log, Option<CompilerResult>) {
    let mut log = Log::new();
    let sources = vec![Source::new("shader.glsl", text)];
    let result = compile(&mut log, &sources, &options);
    (log, result)
}

fn no_renaming() -> CompilerOptions {
    CompilerOptions {
        rename: RenameMode::None,
        ..CompilerOptions::default()
    }
}

#[test]
fn multi_export_isolation() {
    let (log, result) = compile_one(TWO_STAGE, no_renaming());
    assert!(!log.has_errors());
    let result = result.expect("compiles");
    assert_eq!(result.shaders.len(), 2);

    let vertex = &result.shaders[0];
    let fragment = &result.shaders[1];
    assert_eq!(vertex.name, "vertexMain");
    assert_eq!(fragment.name, "fragmentMain");

    // each program keeps only the globals it actually uses
    assert!(vertex.contents.contains("transform"));
    assert!(!vertex.contents.contains("image"));
    assert!(fragment.contents.contains("image"));
    assert!(!fragment.contents.contains("transform"));
    assert!(!fragment.contents.contains("position"));

    // and the interface maps are partitioned the same way
    let expect =
        |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
    assert_eq!(
        vertex.attributes,
        expect(&[("position", "vec4"), ("uv", "vec2")])
    );
    assert_eq!(vertex.uniforms, expect(&[("transform", "mat4")]));
    assert!(fragment.attributes.is_empty());
    assert_eq!(fragment.uniforms, expect(&[("image", "sampler2D")]));

    // every exported entry point compiles to a program whose entry is main
    assert!(vertex.contents.contains("void main()"));
    assert!(fragment.contents.contains("void main()"));
}

#[test]
fn import_filtering() {
    let (log, result) = compile_one(
        "export void fragmentMain() { gl_FragColor = vec4(sin(1.0), 0.0, 0.0, 1.0); }\n",
        no_renaming(),
    );
    assert!(!log.has_errors());
    let result = result.expect("compiles");
    let contents = &result.shaders[0].contents;

    // references to the API surface survive, its declarations never do
    assert!(contents.contains("sin(1.0)"));
    assert!(contents.contains("gl_FragColor"));
    assert!(!contents.contains("float sin("));
    assert!(!contents.contains("vec4 gl_FragColor;"));
}

#[test]
fn renaming_none_keeps_identifiers_all_replaces_them() {
    let (_, result) = compile_one(TWO_STAGE, no_renaming());
    let result = result.expect("compiles");
    assert!(result.renaming.is_empty());
    assert!(result.shaders[0].contents.contains("transform"));

    let options = CompilerOptions {
        rename: RenameMode::All,
        ..CompilerOptions::default()
    };
    let (log, result) = compile_one(TWO_STAGE, options);
    assert!(!log.has_errors());
    let result = result.expect("compiles");
    for shader in &result.shaders {
        assert!(!shader.contents.contains("transform"));
        assert!(!shader.contents.contains("vUv"));
        // imported names and the entry point are stable
        assert!(shader.contents.contains("main"));
    }
    // the varying renames consistently in both stages
    let renamed_vuv = result.renaming.get("vUv").expect("vUv renamed");
    assert!(result.shaders[0].contents.contains(renamed_vuv.as_str()));
    assert!(result.shaders[1].contents.contains(renamed_vuv.as_str()));
}

#[test]
fn unused_symbol_elimination_follows_the_toggle() {
    let source = "\
float unusedHelper(float x) { return x * 2.0; }\n\
export void vertexMain() { gl_Position = vec4(0.0, 0.0, 0.0, 1.0); }\n";

    let (_, result) = compile_one(source, no_renaming());
    let contents = &result.expect("compiles").shaders[0].contents;
    assert!(!contents.contains("unusedHelper"));

    let options = CompilerOptions {
        rename: RenameMode::None,
        trim_symbols: false,
        ..CompilerOptions::default()
    };
    let (_, result) = compile_one(source, options);
    let contents = &result.expect("compiles").shaders[0].contents;
    assert!(contents.contains("float unusedHelper(float x)"));
}

#[test]
fn compile_fails_with_a_located_diagnostic() {
    let (log, result) = compile_one("void main() {\n    float x = ;\n}\n", no_renaming());
    assert!(result.is_none());
    assert!(log.has_errors());

    let diagnostic = log
        .diagnostics
        .iter()
        .find(|d| d.range.is_some())
        .expect("diagnostic carries a range");
    let range = diagnostic.range.as_ref().unwrap();
    assert_eq!(range.text(), ";");
    let (line, col) = range.source.line_col(range.start);
    assert_eq!((line, col), (2, 15));
    assert_eq!(range.source.name, "shader.glsl");
}

#[test]
fn emitted_output_recompiles_to_the_same_text() {
    let options = CompilerOptions {
        rename: RenameMode::None,
        ..CompilerOptions::default()
    };
    let (_, result) = compile_one(TWO_STAGE, options);
    let first = result.expect("compiles").shaders[0].contents.clone();

    let (log, result) = compile_one(&first, no_renaming());
    assert!(!log.has_errors());
    let second = result.expect("recompiles").shaders[0].contents.clone();
    assert_eq!(first, second);
}

#[test]
fn includes_resolve_through_the_callback() {
    let library = "float doubleIt(float x) { return x * 2.0; }\n";
    let options = CompilerOptions {
        rename: RenameMode::None,
        file_access: Some(Box::new(move |path, _relative_to| {
            if path == "lib.glsl" {
                Some(Source::new("lib.glsl", library))
            } else {
                None
            }
        })),
        ..CompilerOptions::default()
    };
    let (log, result) = compile_one(
        "#include \"lib.glsl\"\n\
         export void vertexMain() { gl_PointSize = doubleIt(2.0); }\n",
        options,
    );
    assert!(!log.has_errors(), "{:?}", log.diagnostics.iter().map(|d| d.render()).collect::<Vec<_>>());
    let contents = &result.expect("compiles").shaders[0].contents;
    assert!(contents.contains("float doubleIt(float x)"));

    // without the callback the include is an error
    let (log, result) = compile_one(
        "#include \"lib.glsl\"\nexport void vertexMain() { }\n",
        no_renaming(),
    );
    assert!(result.is_none());
    assert!(log
        .diagnostics
        .iter()
        .any(|d| d.message.contains("lib.glsl")));
}

#[test]
fn type_check_returns_a_program_even_on_errors() {
    let mut log = Log::new();
    let sources: Vec<SourceRef> = vec![Source::new("bad.glsl", "void main() { missing(); }\n")];
    let program = type_check(&mut log, &sources, &CompilerOptions::default());
    assert!(log.has_errors());
    // the tree is still there for tooling
    assert!(program.tree.children(program.root).count() > 0);
}

#[test]
fn extension_directive_gates_and_survives_emission() {
    let source = "\
#extension GL_OES_standard_derivatives : enable\n\
export void fragmentMain() { gl_FragColor = vec4(dFdx(1.0)); }\n";
    let (log, result) = compile_one(source, no_renaming());
    assert!(!log.has_errors());
    let contents = &result.expect("compiles").shaders[0].contents;
    assert!(contents.starts_with("#extension GL_OES_standard_derivatives : enable\n"));

    let gated = "export void fragmentMain() { gl_FragColor = vec4(dFdx(1.0)); }\n";
    let (log, result) = compile_one(gated, no_renaming());
    assert!(result.is_none());
    assert!(log
        .diagnostics
        .iter()
        .any(|d| d.message.contains("GL_OES_standard_derivatives")));
}

#[test]
fn constant_folding_reaches_the_output() {
    let (_, result) = compile_one(
        "const float half = 0.5;\n\
         export void fragmentMain() { gl_FragColor = vec4(half * 2.0, 0.0, 0.0, 1.0); }\n",
        no_renaming(),
    );
    let contents = &result.expect("compiles").shaders[0].contents;
    assert!(contents.contains("vec4(1.0, 0.0, 0.0, 1.0)"));
    assert!(!contents.contains("half"));
}

#[test]
fn minified_output_has_no_insignificant_whitespace() {
    let options = CompilerOptions {
        rename: RenameMode::None,
        remove_whitespace: true,
        ..CompilerOptions::default()
    };
    let (_, result) = compile_one(
        "export void vertexMain() { gl_Position = vec4(0.0, 0.0, 0.0, 1.0); }\n",
        options,
    );
    let contents = &result.expect("compiles").shaders[0].contents;
    assert_eq!(contents, "void main(){gl_Position=vec4(0.0,0.0,0.0,1.0);}");
}
