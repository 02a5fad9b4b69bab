//! Final identifier assignment.
//!
//! Runs once across every specialized program so that symbols sharing a
//! name and a type (a uniform used by both the vertex and the fragment
//! stage, say) come out with one consistent generated identifier. Generated
//! names never collide with output-language keywords, with builtin names or
//! with identifiers that stay un-renamed.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::compiler::log::Log;
use crate::compiler::node::NodeId;
use crate::compiler::scope::{flags, ScopeKind, SymbolId, SymbolKind};
use crate::compiler::Program;
use crate::model::RenameMode;

/// Part of the public surface a shader presents to the host program.
const EXTERNAL: u32 = flags::EXPORTED | flags::ATTRIBUTE | flags::UNIFORM | flags::VARYING;

/// Words a generated identifier must never shadow.
const RESERVED: &[&str] = &[
    "attribute", "bool", "break", "const", "continue", "discard", "do", "else", "false", "float",
    "for", "highp", "if", "in", "inout", "int", "invariant", "lowp", "main", "mat2", "mat3",
    "mat4", "mediump", "out", "precision", "return", "sampler2D", "samplerCube", "struct", "true",
    "uniform", "varying", "vec2", "vec3", "vec4", "void", "while",
];

/// Rename symbols across all programs according to `mode` and return the
/// original-name to final-name mapping for the globally visible ones.
pub fn rename(log: &mut Log, programs: &mut [Program], mode: RenameMode) -> BTreeMap<String, String> {
    let mut renaming = BTreeMap::new();
    if mode == RenameMode::None || programs.is_empty() {
        return renaming;
    }

    // symbols that share (name, kind, type) across programs rename together
    struct Group {
        original: String,
        members: Vec<(usize, SymbolId)>,
        global: bool,
    }
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<(String, SymbolKind, String), usize> = HashMap::new();
    let mut reserved: HashSet<String> = RESERVED.iter().map(|s| s.to_string()).collect();
    // name -> (type name, external?) seen so far, for the cross-program
    // same-name-different-type check
    let mut seen_types: HashMap<String, (String, bool, usize)> = HashMap::new();

    for (program_index, program) in programs.iter().enumerate() {
        for symbol in used_symbols(program) {
            let s = program.symbols.symbol(symbol);
            let type_name = s.ty.name(&program.symbols);
            let external = s.flags & EXTERNAL != 0;

            match seen_types.get(&s.name) {
                Some((previous, was_external, _)) if *previous != type_name => {
                    if external || *was_external {
                        log.warning(
                            s.range.clone(),
                            format!(
                                "'{}' is declared as '{}' here but as '{}' in another shader",
                                s.name, type_name, previous
                            ),
                        );
                    }
                }
                Some(_) => {}
                None => {
                    seen_types
                        .insert(s.name.clone(), (type_name.clone(), external, program_index));
                }
            }

            if !renameable(program, symbol, mode) {
                reserved.insert(s.name.clone());
                continue;
            }
            let key = (s.name.clone(), s.kind, type_name);
            let index = *group_index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    original: s.name.clone(),
                    members: Vec::new(),
                    global: false,
                });
                groups.len() - 1
            });
            groups[index].members.push((program_index, symbol));
            if s.scope == crate::compiler::scope::GLOBAL_SCOPE {
                groups[index].global = true;
            }
        }
    }

    let mut generator = NameGenerator::new(reserved);
    for group in &groups {
        let generated = generator.next_name();
        for &(program_index, symbol) in &group.members {
            programs[program_index].symbols.symbol_mut(symbol).name = generated.clone();
        }
        if group.global && !renaming.contains_key(&group.original) {
            renaming.insert(group.original.clone(), generated);
        }
    }
    renaming
}

fn renameable(program: &Program, symbol: SymbolId, mode: RenameMode) -> bool {
    let s = program.symbols.symbol(symbol);
    if s.has(flags::IMPORTED) || s.name == "main" {
        return false;
    }
    match mode {
        RenameMode::All => true,
        RenameMode::InternalOnly => {
            // the external surface keeps its names, and so do struct fields
            // (a struct may type a uniform, and uniform members are set by
            // name from the host program)
            s.flags & EXTERNAL == 0
                && program.symbols.scope(s.scope).kind != ScopeKind::Struct
        }
        RenameMode::None => false,
    }
}

/// Symbols with a declaration or reference in the retained tree, in
/// document order.
fn used_symbols(program: &Program) -> Vec<SymbolId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    fn walk(program: &Program, id: NodeId, seen: &mut HashSet<SymbolId>, out: &mut Vec<SymbolId>) {
        if let Some(symbol) = program.tree.node(id).symbol {
            if seen.insert(symbol) {
                out.push(symbol);
            }
        }
        let mut child = program.tree.node(id).first_child;
        while let Some(c) = child {
            walk(program, c, seen, out);
            child = program.tree.node(c).next_sibling;
        }
    }
    walk(program, program.root, &mut seen, &mut out);
    out
}

/// Short-identifier sequence: a..z, A..Z, then two-character names.
struct NameGenerator {
    index: usize,
    reserved: HashSet<String>,
}

const HEAD: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TAIL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

impl NameGenerator {
    fn new(reserved: HashSet<String>) -> Self {
        Self { index: 0, reserved }
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = Self::spell(self.index);
            self.index += 1;
            if !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    fn spell(index: usize) -> String {
        let mut name = String::new();
        name.push(HEAD[index % HEAD.len()] as char);
        let mut rest = index / HEAD.len();
        while rest > 0 {
            rest -= 1;
            name.push(TAIL[rest % TAIL.len()] as char);
            rest /= TAIL.len();
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::emitter::emit;
    use crate::compiler::lexer::{tokenize, Token};
    use crate::compiler::node::{NodeKind, Tree};
    use crate::compiler::parser::parse;
    use crate::compiler::resolver::resolve;
    use crate::compiler::scope::SymbolTable;
    use crate::compiler::source::{Range, Source};
    use std::rc::Rc;

    fn program(text: &str) -> Program {
        let mut log = Log::new();
        let src = Source::new("test.glsl", text);
        let tokens = tokenize(&mut log, &src);
        let mut tree = Tree::new();
        let mut symbols = SymbolTable::new();
        let root = tree.add(NodeKind::Global, Range::new(&src, 0, text.len()));
        let mut no_includes =
            |_: &str, _: &str, _: &mut Log| -> Option<Rc<Vec<Token>>> { None };
        parse(&mut log, &tokens, &mut tree, &mut symbols, root, &mut no_includes);
        resolve(&mut log, &mut tree, &mut symbols, root);
        assert!(!log.has_errors(), "test source should resolve cleanly");
        Program { tree, symbols, root }
    }

    #[test]
    fn test_name_generator_sequence() {
        let mut generator = NameGenerator::new(HashSet::new());
        assert_eq!(generator.next_name(), "a");
        assert_eq!(generator.next_name(), "b");
        let mut last = String::new();
        for _ in 0..60 {
            last = generator.next_name();
        }
        // past one alphabet the names grow a second character
        assert!(last.len() >= 2);
    }

    #[test]
    fn test_generator_skips_reserved_words() {
        let reserved: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let mut generator = NameGenerator::new(reserved);
        assert_eq!(generator.next_name(), "c");
    }

    #[test]
    fn test_rename_none_keeps_every_identifier() {
        let mut log = Log::new();
        let mut programs = vec![program(
            "uniform vec2 offset;\nvec2 shift(vec2 p) { return p + offset; }\n",
        )];
        let renaming = rename(&mut log, &mut programs, RenameMode::None);
        assert!(renaming.is_empty());
        let out = emit(
            &programs[0].tree,
            &programs[0].symbols,
            programs[0].root,
            false,
        );
        assert!(out.contains("offset") && out.contains("shift"));
    }

    #[test]
    fn test_rename_all_replaces_user_identifiers() {
        let mut log = Log::new();
        let mut programs = vec![program(
            "uniform vec2 offset;\nvec2 shift(vec2 point) { return point + offset; }\n",
        )];
        let renaming = rename(&mut log, &mut programs, RenameMode::All);
        let out = emit(
            &programs[0].tree,
            &programs[0].symbols,
            programs[0].root,
            false,
        );
        assert!(!out.contains("offset") && !out.contains("shift") && !out.contains("point"));
        assert_eq!(renaming.get("offset").unwrap(), "a");
        // locals are renamed but only globals land in the map
        assert!(renaming.contains_key("shift"));
        assert!(!renaming.contains_key("point"));
    }

    #[test]
    fn test_internal_only_keeps_the_public_surface() {
        let mut log = Log::new();
        let mut programs = vec![program(
            "uniform vec2 offset;\nvec2 shift(vec2 p) { return p + offset; }\n",
        )];
        let renaming = rename(&mut log, &mut programs, RenameMode::InternalOnly);
        let out = emit(
            &programs[0].tree,
            &programs[0].symbols,
            programs[0].root,
            false,
        );
        assert!(out.contains("uniform vec2 offset;"));
        assert!(!out.contains("shift"));
        assert!(!renaming.contains_key("offset"));
    }

    #[test]
    fn test_shared_uniform_renames_consistently_across_programs() {
        let mut log = Log::new();
        let mut programs = vec![
            program("uniform vec2 shared_offset;\nvec2 a_fn() { return shared_offset; }\n"),
            program("uniform vec2 shared_offset;\nvec2 b_fn() { return shared_offset * 2.0; }\n"),
        ];
        let _renaming = rename(&mut log, &mut programs, RenameMode::All);
        let first = emit(&programs[0].tree, &programs[0].symbols, programs[0].root, false);
        let second = emit(&programs[1].tree, &programs[1].symbols, programs[1].root, false);
        let name_in = |out: &str| {
            out.lines()
                .find(|l| l.starts_with("uniform"))
                .unwrap()
                .trim_end_matches(';')
                .rsplit(' ')
                .next()
                .unwrap()
                .to_string()
        };
        assert_eq!(name_in(&first), name_in(&second));
    }

    #[test]
    fn test_same_name_different_type_warns() {
        let mut log = Log::new();
        let mut programs = vec![
            program("uniform vec2 tint;\nvec2 f() { return tint; }\n"),
            program("uniform vec3 tint;\nvec3 g() { return tint; }\n"),
        ];
        let _ = rename(&mut log, &mut programs, RenameMode::All);
        assert!(!log.has_errors());
        assert_eq!(log.diagnostics.len(), 1);
        assert!(log.diagnostics[0].message.contains("another shader"));
    }
}
