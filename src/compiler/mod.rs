//! The compilation pipeline.
//!
//! `type_check` runs parse + resolve once over a shared tree (editor
//! tooling wants the tree even when it has errors). `compile` runs the full
//! pipeline: tokenize every source once, type-check the shared program,
//! then build one isolated program per exported entry function by
//! re-parsing the cached tokens, prune each program to its single export,
//! rewrite, collect the attribute/uniform interface, rename across all
//! programs together and emit.

pub mod api;
pub mod emitter;
pub mod lexer;
pub mod log;
pub mod node;
pub mod parser;
pub mod renamer;
pub mod resolver;
pub mod rewriter;
pub mod scope;
pub mod source;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::model::{CompilerOptions, CompilerResult, ShaderOutput};

use lexer::Token;
use log::Log;
use node::{NodeId, NodeKind, Tree};
use scope::{flags, SymbolId, SymbolKind, SymbolTable, GLOBAL_SCOPE};
use source::{Range, Source, SourceRef};

/// One parsed-and-resolved program: the tree, its symbols and the root node.
pub struct Program {
    pub tree: Tree,
    pub symbols: SymbolTable,
    pub root: NodeId,
}

/// Per-compile state: the cached token streams (each source is tokenized
/// exactly once, re-parses reuse the cache) and resolved includes.
struct Session<'o> {
    options: &'o CompilerOptions,
    sources: Vec<SourceRef>,
    tokens: Vec<Rc<Vec<Token>>>,
    include_cache: HashMap<String, Rc<Vec<Token>>>,
}

impl<'o> Session<'o> {
    fn new(log: &mut Log, user_sources: &[SourceRef], options: &'o CompilerOptions) -> Self {
        let mut sources = vec![Source::new(api::NAME, api::SOURCE)];
        sources.extend(user_sources.iter().cloned());
        let tokens = sources
            .iter()
            .map(|s| Rc::new(lexer::tokenize(log, s)))
            .collect();
        Self {
            options,
            sources,
            tokens,
            include_cache: HashMap::new(),
        }
    }

    /// Parse the API source plus every user source into one fresh program
    /// and resolve it. Symbols declared by the API source are flagged
    /// imported before user code is parsed.
    fn build_program(&mut self, log: &mut Log) -> Program {
        let mut tree = Tree::new();
        let mut symbols = SymbolTable::new();
        let root_range = Range::new(&self.sources[0], 0, 0);
        let root = tree.add(NodeKind::Global, root_range);

        let options = self.options;
        let include_cache = &mut self.include_cache;
        let mut resolve_include =
            |path: &str, relative_to: &str, log: &mut Log| -> Option<Rc<Vec<Token>>> {
                if let Some(cached) = include_cache.get(path) {
                    return Some(cached.clone());
                }
                let file_access = options.file_access.as_ref()?;
                let source = file_access(path, relative_to)?;
                let tokens = Rc::new(lexer::tokenize(log, &source));
                include_cache.insert(path.to_string(), tokens.clone());
                Some(tokens)
            };

        for (index, tokens) in self.tokens.iter().enumerate() {
            parser::parse(log, tokens, &mut tree, &mut symbols, root, &mut resolve_include);
            if index == 0 {
                for id in symbols.symbol_ids() {
                    symbols.symbol_mut(id).flags |= flags::IMPORTED;
                }
            }
        }
        resolver::resolve(log, &mut tree, &mut symbols, root);
        Program { tree, symbols, root }
    }
}

/// Parse and resolve, returning the program even when the log has errors.
pub fn type_check(log: &mut Log, sources: &[SourceRef], options: &CompilerOptions) -> Program {
    let mut session = Session::new(log, sources, options);
    session.build_program(log)
}

/// Full pipeline. Returns `None` iff the log holds at least one error.
pub fn compile(
    log: &mut Log,
    sources: &[SourceRef],
    options: &CompilerOptions,
) -> Option<CompilerResult> {
    let mut session = Session::new(log, sources, options);
    let shared = session.build_program(log);
    if log.has_errors() {
        return None;
    }

    let exports = find_exports(&shared, log);
    if log.has_errors() {
        return None;
    }

    let mut names = Vec::new();
    let mut programs = Vec::new();
    if exports.is_empty() {
        names.push(default_shader_name(sources));
        programs.push(shared);
    } else {
        for export in &exports {
            // a fresh tree, scope and symbol-id space per export: pruning and
            // renaming one program can never leak into another
            let mut scratch = Log::new();
            let mut program = session.build_program(&mut scratch);
            debug_assert!(!scratch.has_errors(), "shared program resolved cleanly");
            specialize(&mut program, export, log);
            names.push(export.clone());
            programs.push(program);
        }
    }

    for program in &mut programs {
        rewriter::rewrite(
            &mut program.tree,
            &mut program.symbols,
            program.root,
            options.compact_tree,
            options.trim_symbols,
        );
    }

    let interfaces: Vec<_> = programs.iter().map(collect_interface).collect();
    let renaming = renamer::rename(log, &mut programs, options.rename);

    let shaders = names
        .into_iter()
        .zip(programs.iter().zip(interfaces))
        .map(|(name, (program, (attributes, uniforms)))| ShaderOutput {
            name,
            contents: emitter::emit(
                &program.tree,
                &program.symbols,
                program.root,
                options.remove_whitespace,
            ),
            attributes,
            uniforms,
        })
        .collect();

    if log.has_errors() {
        return None;
    }
    Some(CompilerResult { shaders, renaming })
}

/// Exported entry functions of the shared program, in declaration order.
fn find_exports(program: &Program, log: &mut Log) -> Vec<String> {
    let mut exports = Vec::new();
    for id in program.symbols.symbol_ids() {
        let symbol = program.symbols.symbol(id);
        if symbol.kind != SymbolKind::Function || !symbol.has(flags::EXPORTED) {
            continue;
        }
        if program.symbols.overloads_of_name(&symbol.name).len() > 1 {
            log.error(
                symbol.range.clone(),
                format!("exported function '{}' cannot be overloaded", symbol.name),
            );
            continue;
        }
        let has_body = symbol.node.is_some_and(|n| {
            program
                .tree
                .children(n)
                .any(|c| matches!(program.tree.kind(c), NodeKind::Block))
        });
        if !has_body {
            log.error(
                symbol.range.clone(),
                format!("exported function '{}' has no body", symbol.name),
            );
            continue;
        }
        exports.push(symbol.name.clone());
    }
    exports
}

impl SymbolTable {
    /// Overload chain for a global name, or empty when absent.
    fn overloads_of_name(&self, name: &str) -> Vec<SymbolId> {
        match self.find_local(GLOBAL_SCOPE, name) {
            Some(head) => self.overloads(head),
            None => Vec::new(),
        }
    }
}

/// Prune a fresh program down to one entry point: every other export loses
/// its flag (so trimming can drop it) and the target becomes `main`.
fn specialize(program: &mut Program, target: &str, log: &mut Log) {
    if target != "main" {
        if let Some(existing) = program.symbols.find_local(GLOBAL_SCOPE, "main") {
            let range = program.symbols.symbol(existing).range.clone();
            log.error(
                range,
                format!(
                    "'main' conflicts with the entry point generated for '{}'",
                    target
                ),
            );
        }
    }
    for id in program.symbols.symbol_ids() {
        let symbol = program.symbols.symbol(id);
        if symbol.kind == SymbolKind::Function
            && symbol.has(flags::EXPORTED)
            && symbol.name != target
        {
            program.symbols.symbol_mut(id).flags &= !flags::EXPORTED;
        }
    }
    if let Some(symbol) = program.symbols.find_local(GLOBAL_SCOPE, target) {
        // the prototype, if any, shares this symbol, so both declarations
        // pick up the new name
        program.symbols.symbol_mut(symbol).name = "main".into();
    }
}

/// Attribute and uniform variables still declared after rewriting, mapped
/// to their type names.
fn collect_interface(program: &Program) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut attributes = BTreeMap::new();
    let mut uniforms = BTreeMap::new();
    for (_, &id) in &program.symbols.scope(GLOBAL_SCOPE).names {
        let symbol = program.symbols.symbol(id);
        if symbol.kind != SymbolKind::Variable {
            continue;
        }
        let type_name = symbol.ty.name(&program.symbols);
        if symbol.has(flags::ATTRIBUTE) {
            attributes.insert(symbol.name.clone(), type_name);
        } else if symbol.has(flags::UNIFORM) {
            uniforms.insert(symbol.name.clone(), type_name);
        }
    }
    (attributes, uniforms)
}

fn default_shader_name(sources: &[SourceRef]) -> String {
    let name = match sources.first() {
        Some(source) => &source.name,
        None => return "shader".into(),
    };
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = base.split('.').next().unwrap_or(base);
    if stem.is_empty() {
        "shader".into()
    } else {
        stem.to_string()
    }
}
