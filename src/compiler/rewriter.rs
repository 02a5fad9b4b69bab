//! Tree-level optimization: import stripping, constant folding, trivial
//! inlining and unused-symbol elimination.
//!
//! Every edit is a structural splice on the arena tree; a declaration is
//! only ever removed once it is demonstrably unreferenced from the retained
//! tree, so scope and reference integrity hold by construction.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::compiler::node::{BinaryOp, NodeId, NodeKind, Tree, UnaryOp};
use crate::compiler::scope::{flags, Constant, SymbolId, SymbolKind, SymbolTable, Type, GLOBAL_SCOPE};

/// Run the rewrite passes over one resolved program.
///
/// Imported declarations are always stripped. `compact` enables constant
/// folding and trivial inlining; `trim` enables removal of unused
/// non-exported globals. With `trim` off, unused symbols are kept verbatim.
pub fn rewrite(tree: &mut Tree, symbols: &mut SymbolTable, root: NodeId, compact: bool, trim: bool) {
    strip_imports(tree, symbols, root);
    if compact {
        fold_constants(tree, symbols, root);
        inline_trivial_calls(tree, symbols, root);
        fold_constants(tree, symbols, root);
    }
    if trim {
        trim_unused(tree, symbols, root);
    }
}

// ── import stripping ───────────────────────────────────────────────────

/// Remove every declaration whose symbol came from the injected API source.
/// Call sites keep referring to the symbols; the GLSL environment provides
/// them at runtime.
fn strip_imports(tree: &mut Tree, symbols: &mut SymbolTable, root: NodeId) {
    let mut child = tree.node(root).first_child;
    while let Some(decl) = child {
        child = tree.node(decl).next_sibling;
        match tree.kind(decl) {
            NodeKind::Function | NodeKind::Struct => {
                let symbol = tree.node(decl).symbol.expect("declaration has a symbol");
                if symbols.symbol(symbol).has(flags::IMPORTED) {
                    remove_declaration(tree, symbols, decl, symbol);
                }
            }
            NodeKind::Variables => {
                let mut var = tree.node(decl).first_child;
                while let Some(v) = var {
                    var = tree.node(v).next_sibling;
                    let symbol = tree.node(v).symbol.expect("declarator has a symbol");
                    if symbols.symbol(symbol).has(flags::IMPORTED) {
                        remove_declaration(tree, symbols, v, symbol);
                    }
                }
                if tree.node(decl).first_child.is_none() {
                    tree.remove(decl);
                }
            }
            _ => {}
        }
    }
}

fn remove_declaration(tree: &mut Tree, symbols: &mut SymbolTable, node: NodeId, symbol: SymbolId) {
    tree.remove(node);
    let name = symbols.symbol(symbol).name.clone();
    // only unbind if the scope still maps the name to this symbol; an
    // overload chain head stays bound until its own declaration goes
    if symbols.find_local(GLOBAL_SCOPE, &name) == Some(symbol)
        && symbols.symbol(symbol).previous_overload.is_none()
    {
        symbols.unbind(GLOBAL_SCOPE, &name);
    }
}

// ── constant folding ───────────────────────────────────────────────────

fn constant_of(kind: &NodeKind) -> Option<Constant> {
    match kind {
        NodeKind::IntLiteral(v) => Some(Constant::Int(*v)),
        NodeKind::FloatLiteral(v) => Some(Constant::Float(*v)),
        NodeKind::BoolLiteral(v) => Some(Constant::Bool(*v)),
        _ => None,
    }
}

fn literal_kind(constant: Constant) -> NodeKind {
    match constant {
        Constant::Int(v) => NodeKind::IntLiteral(v),
        Constant::Float(v) => NodeKind::FloatLiteral(v),
        Constant::Bool(v) => NodeKind::BoolLiteral(v),
    }
}

fn fold_constants(tree: &mut Tree, symbols: &mut SymbolTable, id: NodeId) {
    // children first, so operands are already literals where possible
    let mut child = tree.node(id).first_child;
    while let Some(c) = child {
        child = tree.node(c).next_sibling;
        fold_constants(tree, symbols, c);
    }

    match tree.kind(id).clone() {
        NodeKind::Name(_) => {
            if let Some(symbol) = tree.node(id).symbol {
                if let Some(constant) = symbols.symbol(symbol).constant {
                    tree.node_mut(id).kind = literal_kind(constant);
                    tree.node_mut(id).symbol = None;
                }
            }
        }
        NodeKind::Unary(op) => {
            let operand = match tree.node(id).first_child {
                Some(o) => o,
                None => return,
            };
            if let Some(value) = constant_of(tree.kind(operand)) {
                if let Some(folded) = fold_unary(op, value) {
                    tree.remove(operand);
                    tree.node_mut(id).kind = literal_kind(folded);
                }
            }
        }
        NodeKind::Binary(op) => {
            let (left, right) = match (tree.node(id).first_child, tree.node(id).last_child) {
                (Some(l), Some(r)) if l != r => (l, r),
                _ => return,
            };
            if let (Some(l), Some(r)) = (constant_of(tree.kind(left)), constant_of(tree.kind(right))) {
                if let Some(folded) = fold_binary(op, l, r) {
                    tree.remove(left);
                    tree.remove(right);
                    tree.node_mut(id).kind = literal_kind(folded);
                }
            }
        }
        NodeKind::Ternary => {
            let condition = match tree.node(id).first_child {
                Some(c) => c,
                None => return,
            };
            if let Some(Constant::Bool(take_then)) = constant_of(tree.kind(condition)) {
                let then = tree.node(condition).next_sibling.expect("ternary has a then");
                let otherwise = tree.node(then).next_sibling.expect("ternary has an else");
                let keep = if take_then { then } else { otherwise };
                tree.remove(keep);
                tree.replace(id, keep);
            }
        }
        NodeKind::Variable => {
            // remember the folded value of scalar constants so later uses
            // collapse to literals
            let symbol = match tree.node(id).symbol {
                Some(s) => s,
                None => return,
            };
            if !symbols.symbol(symbol).has(flags::CONST) {
                return;
            }
            if let Some(init) = tree.node(id).first_child {
                if let Some(value) = constant_of(tree.kind(init)) {
                    symbols.symbol_mut(symbol).constant = Some(value);
                }
            }
        }
        _ => {}
    }
}

fn fold_unary(op: UnaryOp, value: Constant) -> Option<Constant> {
    let folded = match (op, value) {
        (UnaryOp::Negate, Constant::Int(v)) => Constant::Int(v.checked_neg()?),
        (UnaryOp::Negate, Constant::Float(v)) => Constant::Float(-v),
        (UnaryOp::Plus, v @ (Constant::Int(_) | Constant::Float(_))) => v,
        (UnaryOp::Not, Constant::Bool(v)) => Constant::Bool(!v),
        _ => return None,
    };
    Some(folded)
}

fn fold_binary(op: BinaryOp, l: Constant, r: Constant) -> Option<Constant> {
    use BinaryOp::*;
    use Constant::*;
    // a fold must never manufacture a literal the language cannot spell
    fn finite(v: f32) -> Option<Constant> {
        v.is_finite().then_some(Float(v))
    }
    let folded = match (op, l, r) {
        (Add, Int(a), Int(b)) => Int(a.checked_add(b)?),
        (Subtract, Int(a), Int(b)) => Int(a.checked_sub(b)?),
        (Multiply, Int(a), Int(b)) => Int(a.checked_mul(b)?),
        (Divide, Int(a), Int(b)) => Int(a.checked_div(b)?),
        (Add, Float(a), Float(b)) => finite(a + b)?,
        (Subtract, Float(a), Float(b)) => finite(a - b)?,
        (Multiply, Float(a), Float(b)) => finite(a * b)?,
        (Divide, Float(a), Float(b)) if b != 0.0 => finite(a / b)?,
        (Less, Int(a), Int(b)) => Bool(a < b),
        (LessEqual, Int(a), Int(b)) => Bool(a <= b),
        (Greater, Int(a), Int(b)) => Bool(a > b),
        (GreaterEqual, Int(a), Int(b)) => Bool(a >= b),
        (Less, Float(a), Float(b)) => Bool(a < b),
        (LessEqual, Float(a), Float(b)) => Bool(a <= b),
        (Greater, Float(a), Float(b)) => Bool(a > b),
        (GreaterEqual, Float(a), Float(b)) => Bool(a >= b),
        (Equal, Int(a), Int(b)) => Bool(a == b),
        (NotEqual, Int(a), Int(b)) => Bool(a != b),
        (Equal, Float(a), Float(b)) => Bool(a == b),
        (NotEqual, Float(a), Float(b)) => Bool(a != b),
        (Equal, Bool(a), Bool(b)) => Bool(a == b),
        (NotEqual, Bool(a), Bool(b)) => Bool(a != b),
        (And, Bool(a), Bool(b)) => Bool(a && b),
        (Or, Bool(a), Bool(b)) => Bool(a || b),
        _ => return None,
    };
    Some(folded)
}

// ── trivial inlining ───────────────────────────────────────────────────

/// Inline calls to functions whose whole body is `return <literal>;` or
/// `return <parameter>;`. Arguments must be side-effect free (names or
/// literals) so dropping them cannot change behavior.
fn inline_trivial_calls(tree: &mut Tree, symbols: &SymbolTable, id: NodeId) {
    let mut child = tree.node(id).first_child;
    while let Some(c) = child {
        child = tree.node(c).next_sibling;
        inline_trivial_calls(tree, symbols, c);
    }

    if !matches!(tree.kind(id), NodeKind::Call) {
        return;
    }
    let callee = match tree.node(id).first_child {
        Some(c) => c,
        None => return,
    };
    let symbol = match tree.node(callee).symbol {
        Some(s) if symbols.symbol(s).kind == SymbolKind::Function => s,
        _ => return,
    };
    if symbols.symbol(symbol).has(flags::IMPORTED) {
        return;
    }
    let args: Vec<NodeId> = tree.children(id).skip(1).collect();
    let effect_free = args.iter().all(|&a| {
        matches!(
            tree.kind(a),
            NodeKind::Name(_)
                | NodeKind::IntLiteral(_)
                | NodeKind::FloatLiteral(_)
                | NodeKind::BoolLiteral(_)
        )
    });
    if !effect_free {
        return;
    }

    let Some(body) = trivial_body(tree, symbols, symbol) else {
        return;
    };
    match body {
        TrivialBody::Literal(kind) => {
            let children: Vec<NodeId> = tree.children(id).collect();
            for c in children {
                tree.remove(c);
            }
            tree.node_mut(id).kind = kind;
            tree.node_mut(id).symbol = None;
        }
        TrivialBody::Parameter(index) => {
            let Some(&arg) = args.get(index) else { return };
            tree.remove(arg);
            tree.replace(id, arg);
        }
    }
}

enum TrivialBody {
    Literal(NodeKind),
    Parameter(usize),
}

fn trivial_body(tree: &Tree, symbols: &SymbolTable, symbol: SymbolId) -> Option<TrivialBody> {
    let function = symbols.symbol(symbol).node?;
    let block = tree
        .children(function)
        .find(|&c| matches!(tree.kind(c), NodeKind::Block))?;
    if tree.child_count(block) != 1 {
        return None;
    }
    let statement = tree.child(block, 0)?;
    if !matches!(tree.kind(statement), NodeKind::Return) {
        return None;
    }
    let value = tree.child(statement, 0)?;
    match tree.kind(value) {
        NodeKind::IntLiteral(_) | NodeKind::FloatLiteral(_) | NodeKind::BoolLiteral(_) => {
            Some(TrivialBody::Literal(tree.kind(value).clone()))
        }
        NodeKind::Name(_) => {
            let param_symbol = tree.node(value).symbol?;
            let index = tree
                .children(function)
                .filter(|&c| matches!(tree.kind(c), NodeKind::Variable))
                .position(|c| tree.node(c).symbol == Some(param_symbol))?;
            Some(TrivialBody::Parameter(index))
        }
        _ => None,
    }
}

// ── unused-symbol elimination ──────────────────────────────────────────

/// Remove global declarations that are unreachable from the retained entry
/// points. Roots are the exported symbols, or a function named `main` when
/// nothing is exported; with no roots at all, everything is kept.
fn trim_unused(tree: &mut Tree, symbols: &mut SymbolTable, root: NodeId) {
    // map each global symbol to its declaration nodes (a function can have a
    // prototype and a definition)
    let mut declarations: HashMap<SymbolId, Vec<NodeId>> = HashMap::new();
    for decl in tree.children(root) {
        match tree.kind(decl) {
            NodeKind::Function | NodeKind::Struct => {
                let symbol = tree.node(decl).symbol.expect("declaration has a symbol");
                declarations.entry(symbol).or_default().push(decl);
            }
            NodeKind::Variables => {
                for var in tree.children(decl) {
                    let symbol = tree.node(var).symbol.expect("declarator has a symbol");
                    declarations.entry(symbol).or_default().push(var);
                }
            }
            _ => {}
        }
    }

    let mut roots: Vec<SymbolId> = declarations
        .keys()
        .copied()
        .filter(|&s| symbols.symbol(s).has(flags::EXPORTED))
        .collect();
    if roots.is_empty() {
        roots = declarations
            .keys()
            .copied()
            .filter(|&s| {
                symbols.symbol(s).kind == SymbolKind::Function && symbols.symbol(s).name == "main"
            })
            .collect();
    }
    if roots.is_empty() {
        return;
    }

    // transitively mark everything reachable from the roots
    let mut reached: HashSet<SymbolId> = HashSet::new();
    let mut queue: VecDeque<SymbolId> = roots.into_iter().collect();
    while let Some(symbol) = queue.pop_front() {
        if !reached.insert(symbol) {
            continue;
        }
        mark_type(symbols.symbol(symbol).ty, &reached, &mut queue);
        for &decl in declarations.get(&symbol).into_iter().flatten() {
            collect_references(tree, decl, &reached, &mut queue);
        }
    }

    let mut child = tree.node(root).first_child;
    while let Some(decl) = child {
        child = tree.node(decl).next_sibling;
        match tree.kind(decl) {
            NodeKind::Function | NodeKind::Struct => {
                let symbol = tree.node(decl).symbol.expect("declaration has a symbol");
                if !reached.contains(&symbol) {
                    remove_declaration(tree, symbols, decl, symbol);
                }
            }
            NodeKind::Variables => {
                let mut var = tree.node(decl).first_child;
                while let Some(v) = var {
                    var = tree.node(v).next_sibling;
                    let symbol = tree.node(v).symbol.expect("declarator has a symbol");
                    if !reached.contains(&symbol) {
                        remove_declaration(tree, symbols, v, symbol);
                    }
                }
                // removing the last declarator removes the whole group
                if tree.node(decl).first_child.is_none() {
                    tree.remove(decl);
                }
            }
            _ => {}
        }
    }
}

fn mark_type(ty: Type, reached: &HashSet<SymbolId>, queue: &mut VecDeque<SymbolId>) {
    if let Type::Struct(symbol) = ty {
        if !reached.contains(&symbol) {
            queue.push_back(symbol);
        }
    }
}

fn collect_references(
    tree: &Tree,
    id: NodeId,
    reached: &HashSet<SymbolId>,
    queue: &mut VecDeque<SymbolId>,
) {
    if let Some(symbol) = tree.node(id).symbol {
        if !reached.contains(&symbol) {
            queue.push_back(symbol);
        }
    }
    if let Some(ty) = tree.node(id).resolved_type {
        mark_type(ty, reached, queue);
    }
    let mut child = tree.node(id).first_child;
    while let Some(c) = child {
        collect_references(tree, c, reached, queue);
        child = tree.node(c).next_sibling;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::{tokenize, Token};
    use crate::compiler::log::Log;
    use crate::compiler::parser::parse;
    use crate::compiler::resolver::resolve;
    use crate::compiler::source::{Range, Source};
    use std::rc::Rc;

    fn build(text: &str) -> (Tree, SymbolTable, NodeId) {
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
        (tree, symbols, root)
    }

    fn global_symbol_names(tree: &Tree, symbols: &SymbolTable, root: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        for decl in tree.children(root) {
            match tree.kind(decl) {
                NodeKind::Function | NodeKind::Struct => {
                    let s = tree.node(decl).symbol.unwrap();
                    names.push(symbols.symbol(s).name.clone());
                }
                NodeKind::Variables => {
                    for var in tree.children(decl) {
                        let s = tree.node(var).symbol.unwrap();
                        names.push(symbols.symbol(s).name.clone());
                    }
                }
                _ => {}
            }
        }
        names
    }

    #[test]
    fn test_constant_folding_collapses_expressions() {
        let (mut tree, mut symbols, root) = build(
            "const float k = 2.0;\n\
             export float f() { return k * 3.0 + 1.0; }\n",
        );
        rewrite(&mut tree, &mut symbols, root, true, false);

        // find the return value inside f
        let function = tree
            .children(root)
            .find(|&c| matches!(tree.kind(c), NodeKind::Function))
            .unwrap();
        let block = tree
            .children(function)
            .find(|&c| matches!(tree.kind(c), NodeKind::Block))
            .unwrap();
        let ret = tree.child(block, 0).unwrap();
        let value = tree.child(ret, 0).unwrap();
        assert_eq!(*tree.kind(value), NodeKind::FloatLiteral(7.0));
    }

    #[test]
    fn test_ternary_with_literal_condition_folds() {
        let (mut tree, mut symbols, root) =
            build("export float f() { return true ? 1.0 : 2.0; }\n");
        rewrite(&mut tree, &mut symbols, root, true, false);
        let function = tree.child(root, 0).unwrap();
        let block = tree
            .children(function)
            .find(|&c| matches!(tree.kind(c), NodeKind::Block))
            .unwrap();
        let ret = tree.child(block, 0).unwrap();
        let value = tree.child(ret, 0).unwrap();
        assert_eq!(*tree.kind(value), NodeKind::FloatLiteral(1.0));
    }

    #[test]
    fn test_unused_symbols_trimmed_only_when_enabled() {
        let source = "float unusedHelper(float x) { return x; }\n\
                      uniform vec2 unusedUniform;\n\
                      export void vertexMain() { }\n";

        let (mut tree, mut symbols, root) = build(source);
        rewrite(&mut tree, &mut symbols, root, false, true);
        assert_eq!(
            global_symbol_names(&tree, &symbols, root),
            vec!["vertexMain"]
        );

        let (mut tree, mut symbols, root) = build(source);
        rewrite(&mut tree, &mut symbols, root, false, false);
        assert_eq!(
            global_symbol_names(&tree, &symbols, root),
            vec!["unusedHelper", "unusedUniform", "vertexMain"]
        );
    }

    #[test]
    fn test_trim_keeps_transitive_dependencies() {
        let (mut tree, mut symbols, root) = build(
            "struct Light { vec3 color; };\n\
             uniform vec3 tint;\n\
             vec3 shade(Light l) { return l.color * tint; }\n\
             vec3 unused() { return vec3(0.0, 0.0, 0.0); }\n\
             export vec3 fragmentMain() { return shade(Light(tint)); }\n",
        );
        rewrite(&mut tree, &mut symbols, root, false, true);
        let names = global_symbol_names(&tree, &symbols, root);
        assert_eq!(names, vec!["Light", "tint", "shade", "fragmentMain"]);
    }

    #[test]
    fn test_partial_variables_group_removal() {
        let (mut tree, mut symbols, root) = build(
            "uniform vec2 used, unused;\n\
             export vec2 f() { return used; }\n",
        );
        rewrite(&mut tree, &mut symbols, root, false, true);
        let names = global_symbol_names(&tree, &symbols, root);
        assert_eq!(names, vec!["used", "f"]);
    }

    #[test]
    fn test_import_stripping_is_unconditional() {
        let (mut tree, mut symbols, root) = build(
            "float helper(float x) { return x; }\n\
             export float f() { return helper(1.0); }\n",
        );
        // pretend 'helper' came from the API source
        let helper = symbols.find(GLOBAL_SCOPE, "helper").unwrap();
        symbols.symbol_mut(helper).flags |= flags::IMPORTED;

        rewrite(&mut tree, &mut symbols, root, false, false);
        let names = global_symbol_names(&tree, &symbols, root);
        assert_eq!(names, vec!["f"]);
        // the call site still references the imported symbol
        let f = tree
            .children(root)
            .find(|&c| matches!(tree.kind(c), NodeKind::Function))
            .unwrap();
        let mut found = false;
        tree.visit(f, &mut |n| {
            if tree.node(n).symbol == Some(helper) {
                found = true;
            }
        });
        assert!(found);
    }

    #[test]
    fn test_trivial_inlining() {
        let (mut tree, mut symbols, root) = build(
            "float identity(float x) { return x; }\n\
             float two() { return 2.0; }\n\
             export float f() { return identity(two()); }\n",
        );
        rewrite(&mut tree, &mut symbols, root, true, true);
        // two() folds to a literal, then identity(literal) folds to the
        // literal itself, leaving both helpers unused
        let names = global_symbol_names(&tree, &symbols, root);
        assert_eq!(names, vec!["f"]);
        let function = tree.child(root, 0).unwrap();
        let block = tree
            .children(function)
            .find(|&c| matches!(tree.kind(c), NodeKind::Block))
            .unwrap();
        let ret = tree.child(block, 0).unwrap();
        let value = tree.child(ret, 0).unwrap();
        assert_eq!(*tree.kind(value), NodeKind::FloatLiteral(2.0));
    }
}
