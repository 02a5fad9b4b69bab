//! Type checking and name binding.
//!
//! Runs after every source (including the injected API declarations) has
//! been parsed into one tree. A first sweep resolves the spelled type of
//! every declared symbol, so forward references work no matter the
//! declaration order; a second document-order sweep types every expression,
//! binds every `Name` to a symbol and selects function overloads. Errors are
//! recorded and the offending node gets the `<error>` type so the rest of
//! the tree still resolves.

use std::collections::HashSet;

use crate::compiler::log::Log;
use crate::compiler::node::{AssignOp, BinaryOp, NodeId, NodeKind, Tree, UnaryOp};
use crate::compiler::scope::{flags, ScopeId, SymbolId, SymbolKind, SymbolTable, Type, GLOBAL_SCOPE};
use crate::compiler::source::Range;

/// Builtins that are only valid once their extension has been enabled by a
/// preceding `#extension` directive.
fn required_extension(function: &str) -> Option<&'static str> {
    match function {
        "dFdx" | "dFdy" | "fwidth" => Some("GL_OES_standard_derivatives"),
        "texture2DLodEXT" | "textureCubeLodEXT" => Some("GL_EXT_shader_texture_lod"),
        _ => None,
    }
}

pub fn resolve(log: &mut Log, tree: &mut Tree, symbols: &mut SymbolTable, root: NodeId) {
    let mut resolver = Resolver {
        log,
        tree,
        symbols,
        extensions: HashSet::new(),
        current_function: None,
        current_declarator: None,
        loop_depth: 0,
    };
    resolver.declare_types(root);
    resolver.resolve_node(root, GLOBAL_SCOPE);
}

struct Resolver<'c> {
    log: &'c mut Log,
    tree: &'c mut Tree,
    symbols: &'c mut SymbolTable,
    extensions: HashSet<String>,
    current_function: Option<SymbolId>,
    /// Set while resolving a variable initializer: references to variables
    /// declared at or after this one are use-before-declaration errors.
    current_declarator: Option<SymbolId>,
    loop_depth: usize,
}

impl<'c> Resolver<'c> {
    // ── pass 1: declared types ─────────────────────────────────────────

    fn declare_types(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Function | NodeKind::Variable => {
                if let Some(symbol) = self.tree.node(id).symbol {
                    self.resolve_symbol_type(symbol);
                }
            }
            _ => {}
        }
        let mut child = self.tree.node(id).first_child;
        while let Some(c) = child {
            self.declare_types(c);
            child = self.tree.node(c).next_sibling;
        }
    }

    fn resolve_symbol_type(&mut self, id: SymbolId) {
        let (declared, range, kind) = {
            let s = self.symbols.symbol(id);
            (s.declared_type.clone(), s.range.clone(), s.kind)
        };
        let ty = self.resolve_type_name(&declared, &range);
        if ty == Type::Void && kind == SymbolKind::Variable {
            self.log.error(range, "a variable cannot have type 'void'");
            self.symbols.symbol_mut(id).ty = Type::Error;
            return;
        }
        self.symbols.symbol_mut(id).ty = ty;
    }

    fn resolve_type_name(&mut self, name: &str, range: &Range) -> Type {
        if let Some(ty) = Type::from_name(name) {
            return ty;
        }
        match self.symbols.find(GLOBAL_SCOPE, name) {
            Some(id) if self.symbols.symbol(id).kind == SymbolKind::Struct => Type::Struct(id),
            _ => {
                self.log
                    .error(range.clone(), format!("'{}' is not a type name", name));
                Type::Error
            }
        }
    }

    // ── pass 2: statements ─────────────────────────────────────────────

    fn resolve_node(&mut self, id: NodeId, scope: ScopeId) {
        let kind = self.tree.kind(id).clone();
        match kind {
            NodeKind::Global => {
                let mut child = self.tree.node(id).first_child;
                while let Some(c) = child {
                    self.resolve_node(c, scope);
                    child = self.tree.node(c).next_sibling;
                }
            }
            NodeKind::Extension { name, behavior } => match behavior.as_str() {
                "disable" => {
                    self.extensions.remove(&name);
                }
                _ => {
                    self.extensions.insert(name);
                }
            },
            NodeKind::Function => {
                let inner = self.tree.node(id).scope.unwrap_or(scope);
                let symbol = self.tree.node(id).symbol;
                let previous = self.current_function;
                self.current_function = symbol;
                let mut child = self.tree.node(id).first_child;
                while let Some(c) = child {
                    if matches!(self.tree.kind(c), NodeKind::Block) {
                        self.resolve_node(c, inner);
                    }
                    child = self.tree.node(c).next_sibling;
                }
                self.current_function = previous;
            }
            NodeKind::Struct => {
                // field types were resolved in pass 1; initializers are not
                // part of the grammar
            }
            NodeKind::Variables => {
                let mut child = self.tree.node(id).first_child;
                while let Some(c) = child {
                    self.resolve_node(c, scope);
                    child = self.tree.node(c).next_sibling;
                }
            }
            NodeKind::Variable => self.resolve_variable(id, scope),
            NodeKind::Block => {
                let inner = self.tree.node(id).scope.unwrap_or(scope);
                let mut child = self.tree.node(id).first_child;
                while let Some(c) = child {
                    self.resolve_node(c, inner);
                    child = self.tree.node(c).next_sibling;
                }
            }
            NodeKind::If => {
                let condition = self.tree.child(id, 0).expect("if has a condition");
                self.check_condition(condition, scope);
                let mut child = self.tree.node(condition).next_sibling;
                while let Some(c) = child {
                    self.resolve_node(c, scope);
                    child = self.tree.node(c).next_sibling;
                }
            }
            NodeKind::While => {
                let condition = self.tree.child(id, 0).expect("while has a condition");
                let body = self.tree.child(id, 1).expect("while has a body");
                self.check_condition(condition, scope);
                self.loop_depth += 1;
                self.resolve_node(body, scope);
                self.loop_depth -= 1;
            }
            NodeKind::DoWhile => {
                let body = self.tree.child(id, 0).expect("do has a body");
                let condition = self.tree.child(id, 1).expect("do has a condition");
                self.loop_depth += 1;
                self.resolve_node(body, scope);
                self.loop_depth -= 1;
                self.check_condition(condition, scope);
            }
            NodeKind::For => {
                let inner = self.tree.node(id).scope.unwrap_or(scope);
                let init = self.tree.child(id, 0).expect("for has an initializer");
                let condition = self.tree.child(id, 1).expect("for has a condition");
                let update = self.tree.child(id, 2).expect("for has an update");
                let body = self.tree.child(id, 3).expect("for has a body");
                self.resolve_node(init, inner);
                if !matches!(self.tree.kind(condition), NodeKind::Empty) {
                    self.check_condition(condition, inner);
                }
                if !matches!(self.tree.kind(update), NodeKind::Empty) {
                    self.resolve_expression(update, inner);
                }
                self.loop_depth += 1;
                self.resolve_node(body, inner);
                self.loop_depth -= 1;
            }
            NodeKind::Return => self.resolve_return(id, scope),
            NodeKind::Break | NodeKind::Continue => {
                if self.loop_depth == 0 {
                    let what = if matches!(kind, NodeKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    let range = self.tree.node(id).range.clone();
                    self.log
                        .error(range, format!("'{}' is only allowed inside a loop", what));
                }
            }
            NodeKind::Discard | NodeKind::Empty => {}
            NodeKind::ExpressionStmt => {
                if let Some(expr) = self.tree.child(id, 0) {
                    self.resolve_expression(expr, scope);
                }
            }
            _ => {
                // an expression in statement position (for-loop update)
                self.resolve_expression(id, scope);
            }
        }
    }

    fn resolve_variable(&mut self, id: NodeId, scope: ScopeId) {
        let symbol = self.tree.node(id).symbol.expect("variable has a symbol");
        let ty = self.symbols.symbol(symbol).ty;
        self.tree.node_mut(id).resolved_type = Some(ty);

        let initializer = self.tree.child(id, 0);
        let (is_const, is_external, range) = {
            let s = self.symbols.symbol(symbol);
            (
                s.has(flags::CONST),
                s.has(flags::ATTRIBUTE) || s.has(flags::UNIFORM) || s.has(flags::VARYING),
                s.range.clone(),
            )
        };
        match initializer {
            Some(init) => {
                if is_external {
                    self.log.error(
                        range,
                        "a uniform, attribute or varying cannot have an initializer",
                    );
                }
                let previous = self.current_declarator;
                self.current_declarator = Some(symbol);
                let init_ty = self.resolve_expression(init, scope);
                self.current_declarator = previous;
                self.check_types_match(init_ty, ty, init, "initializer");
            }
            None => {
                if is_const {
                    self.log
                        .error(range, "a constant must have an initializer");
                }
            }
        }
    }

    fn resolve_return(&mut self, id: NodeId, scope: ScopeId) {
        let expected = self
            .current_function
            .map(|f| self.symbols.symbol(f).ty)
            .unwrap_or(Type::Void);
        let range = self.tree.node(id).range.clone();
        match self.tree.child(id, 0) {
            Some(value) => {
                let ty = self.resolve_expression(value, scope);
                if expected == Type::Void {
                    self.log
                        .error(range, "a void function cannot return a value");
                } else {
                    self.check_types_match(ty, expected, value, "return value");
                }
            }
            None => {
                if expected != Type::Void && expected != Type::Error {
                    self.log.error(range, "expected a return value");
                }
            }
        }
    }

    fn check_condition(&mut self, id: NodeId, scope: ScopeId) {
        let ty = self.resolve_expression(id, scope);
        if ty != Type::Bool && ty != Type::Error {
            let range = self.tree.node(id).range.clone();
            let name = ty.name(self.symbols);
            self.log
                .error(range, format!("a condition must be 'bool', not '{}'", name));
        }
    }

    fn check_types_match(&mut self, actual: Type, expected: Type, node: NodeId, what: &str) {
        if actual == expected || actual == Type::Error || expected == Type::Error {
            return;
        }
        let range = self.tree.node(node).range.clone();
        let actual_name = actual.name(self.symbols);
        let expected_name = expected.name(self.symbols);
        self.log.error(
            range,
            format!(
                "the {} has type '{}' but '{}' was expected",
                what, actual_name, expected_name
            ),
        );
    }

    // ── pass 2: expressions ────────────────────────────────────────────

    fn resolve_expression(&mut self, id: NodeId, scope: ScopeId) -> Type {
        let kind = self.tree.kind(id).clone();
        let ty = match kind {
            NodeKind::IntLiteral(_) => Type::Int,
            NodeKind::FloatLiteral(_) => Type::Float,
            NodeKind::BoolLiteral(_) => Type::Bool,
            NodeKind::Name(ref name) => self.resolve_name(id, name, scope),
            NodeKind::Unary(op) => self.resolve_unary(id, op, scope),
            NodeKind::Postfix(_) => {
                let operand = self.tree.child(id, 0).expect("postfix has an operand");
                let ty = self.resolve_expression(operand, scope);
                self.check_increment_target(operand, ty)
            }
            NodeKind::Binary(op) => self.resolve_binary(id, op, scope),
            NodeKind::Assign(op) => self.resolve_assign(id, op, scope),
            NodeKind::Ternary => {
                let condition = self.tree.child(id, 0).expect("ternary has a condition");
                let then = self.tree.child(id, 1).expect("ternary has a then");
                let otherwise = self.tree.child(id, 2).expect("ternary has an else");
                self.check_condition(condition, scope);
                let then_ty = self.resolve_expression(then, scope);
                let else_ty = self.resolve_expression(otherwise, scope);
                if then_ty == Type::Error || else_ty == Type::Error {
                    Type::Error
                } else if then_ty != else_ty {
                    let range = self.tree.node(id).range.clone();
                    let a = then_ty.name(self.symbols);
                    let b = else_ty.name(self.symbols);
                    self.log.error(
                        range,
                        format!("the branches have different types '{}' and '{}'", a, b),
                    );
                    Type::Error
                } else {
                    then_ty
                }
            }
            NodeKind::Call => self.resolve_call(id, scope),
            NodeKind::Dot(ref field) => self.resolve_dot(id, field, scope),
            NodeKind::Index => self.resolve_index(id, scope),
            _ => Type::Error,
        };
        self.tree.node_mut(id).resolved_type = Some(ty);
        ty
    }

    fn resolve_name(&mut self, id: NodeId, name: &str, scope: ScopeId) -> Type {
        match self.symbols.find(scope, name) {
            Some(symbol) => {
                self.tree.node_mut(id).symbol = Some(symbol);
                match self.symbols.symbol(symbol).kind {
                    SymbolKind::Variable => {
                        if let Some(declarator) = self.current_declarator {
                            if symbol.0 >= declarator.0 {
                                let range = self.tree.node(id).range.clone();
                                self.log.error(
                                    range,
                                    format!("'{}' is used before it is declared", name),
                                );
                                return Type::Error;
                            }
                        }
                        self.symbols.symbol(symbol).ty
                    }
                    SymbolKind::Function | SymbolKind::Struct => {
                        let range = self.tree.node(id).range.clone();
                        self.log
                            .error(range, format!("'{}' cannot be used as a value", name));
                        Type::Error
                    }
                }
            }
            None => {
                let range = self.tree.node(id).range.clone();
                self.log
                    .error(range, format!("'{}' is not declared", name));
                Type::Error
            }
        }
    }

    fn resolve_unary(&mut self, id: NodeId, op: UnaryOp, scope: ScopeId) -> Type {
        let operand = self.tree.child(id, 0).expect("unary has an operand");
        let ty = self.resolve_expression(operand, scope);
        if ty == Type::Error {
            return Type::Error;
        }
        match op {
            UnaryOp::Negate | UnaryOp::Plus => {
                if ty.is_numeric() {
                    ty
                } else {
                    self.operand_error(id, "a numeric operand", ty)
                }
            }
            UnaryOp::Not => {
                if ty == Type::Bool {
                    ty
                } else {
                    self.operand_error(id, "a 'bool' operand", ty)
                }
            }
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                self.check_increment_target(operand, ty)
            }
        }
    }

    fn check_increment_target(&mut self, operand: NodeId, ty: Type) -> Type {
        if ty == Type::Error {
            return Type::Error;
        }
        if ty != Type::Int && ty != Type::Float {
            return self.operand_error(operand, "an 'int' or 'float' operand", ty);
        }
        self.check_assignable(operand);
        ty
    }

    fn operand_error(&mut self, node: NodeId, expected: &str, actual: Type) -> Type {
        let range = self.tree.node(node).range.clone();
        let name = actual.name(self.symbols);
        self.log
            .error(range, format!("expected {}, not '{}'", expected, name));
        Type::Error
    }

    fn resolve_binary(&mut self, id: NodeId, op: BinaryOp, scope: ScopeId) -> Type {
        let left = self.tree.child(id, 0).expect("binary has a left operand");
        let right = self.tree.child(id, 1).expect("binary has a right operand");
        let l = self.resolve_expression(left, scope);
        let r = self.resolve_expression(right, scope);
        if l == Type::Error || r == Type::Error {
            return Type::Error;
        }
        match Self::binary_type(op, l, r) {
            Some(ty) => ty,
            None => {
                let range = self.tree.node(id).range.clone();
                let ln = l.name(self.symbols);
                let rn = r.name(self.symbols);
                self.log.error(
                    range,
                    format!("no operator for '{}' and '{}'", ln, rn),
                );
                Type::Error
            }
        }
    }

    fn binary_type(op: BinaryOp, l: Type, r: Type) -> Option<Type> {
        use BinaryOp::*;
        match op {
            Add | Subtract | Multiply | Divide => {
                // component-wise on equal numeric types, scalar broadcast,
                // plus the matrix products for '*'
                if l == r && l.is_numeric() {
                    return Some(l);
                }
                if l == Type::Float && (r.vector_size().is_some() || r.matrix_size().is_some()) {
                    return Some(r);
                }
                if r == Type::Float && (l.vector_size().is_some() || l.matrix_size().is_some()) {
                    return Some(l);
                }
                if op == Multiply {
                    match (l.matrix_size(), r.vector_size()) {
                        (Some(m), Some(v)) if m == v => return Some(r),
                        _ => {}
                    }
                    match (l.vector_size(), r.matrix_size()) {
                        (Some(v), Some(m)) if m == v => return Some(l),
                        _ => {}
                    }
                }
                None
            }
            Less | LessEqual | Greater | GreaterEqual => match (l, r) {
                (Type::Int, Type::Int) | (Type::Float, Type::Float) => Some(Type::Bool),
                _ => None,
            },
            Equal | NotEqual => {
                let comparable = l == r
                    && l != Type::Void
                    && !matches!(l, Type::Sampler2D | Type::SamplerCube);
                if comparable {
                    Some(Type::Bool)
                } else {
                    None
                }
            }
            And | Or => {
                if l == Type::Bool && r == Type::Bool {
                    Some(Type::Bool)
                } else {
                    None
                }
            }
        }
    }

    fn resolve_assign(&mut self, id: NodeId, op: AssignOp, scope: ScopeId) -> Type {
        let target = self.tree.child(id, 0).expect("assignment has a target");
        let value = self.tree.child(id, 1).expect("assignment has a value");
        let target_ty = self.resolve_expression(target, scope);
        let value_ty = self.resolve_expression(value, scope);
        self.check_assignable(target);
        if target_ty == Type::Error || value_ty == Type::Error {
            return Type::Error;
        }
        let result = match op {
            AssignOp::Assign => {
                if target_ty == value_ty {
                    Some(target_ty)
                } else {
                    None
                }
            }
            AssignOp::Add => Self::binary_type(BinaryOp::Add, target_ty, value_ty),
            AssignOp::Subtract => Self::binary_type(BinaryOp::Subtract, target_ty, value_ty),
            AssignOp::Multiply => Self::binary_type(BinaryOp::Multiply, target_ty, value_ty),
            AssignOp::Divide => Self::binary_type(BinaryOp::Divide, target_ty, value_ty),
        };
        match result {
            Some(ty) if ty == target_ty => target_ty,
            _ => {
                let range = self.tree.node(id).range.clone();
                let tn = target_ty.name(self.symbols);
                let vn = value_ty.name(self.symbols);
                self.log.error(
                    range,
                    format!("cannot assign '{}' to '{}'", vn, tn),
                );
                Type::Error
            }
        }
    }

    /// Report assignments through anything that is not a mutable variable
    /// access path.
    fn check_assignable(&mut self, id: NodeId) {
        match self.tree.kind(id).clone() {
            NodeKind::Name(name) => {
                if let Some(symbol) = self.tree.node(id).symbol {
                    let s = self.symbols.symbol(symbol);
                    let blocked = if s.has(flags::CONST) {
                        Some("constant")
                    } else if s.has(flags::UNIFORM) {
                        Some("uniform")
                    } else if s.has(flags::ATTRIBUTE) {
                        Some("attribute")
                    } else {
                        None
                    };
                    if let Some(what) = blocked {
                        let range = self.tree.node(id).range.clone();
                        self.log
                            .error(range, format!("cannot assign to {} '{}'", what, name));
                    }
                }
            }
            NodeKind::Dot(_) | NodeKind::Index => {
                let base = self.tree.child(id, 0).expect("access has a base");
                self.check_assignable(base);
            }
            _ => {
                let range = self.tree.node(id).range.clone();
                self.log.error(range, "invalid assignment target");
            }
        }
    }

    fn resolve_call(&mut self, id: NodeId, scope: ScopeId) -> Type {
        let callee = self.tree.child(id, 0).expect("call has a callee");
        let args: Vec<NodeId> = self.tree.children(id).skip(1).collect();
        let arg_types: Vec<Type> = args
            .iter()
            .map(|&a| self.resolve_expression(a, scope))
            .collect();

        let name = match self.tree.kind(callee).clone() {
            NodeKind::Name(name) => name,
            _ => {
                let range = self.tree.node(callee).range.clone();
                self.log.error(range, "expected a function name");
                return Type::Error;
            }
        };
        let range = self.tree.node(id).range.clone();

        if arg_types.contains(&Type::Error) {
            return Type::Error; // already reported at the argument
        }

        // builtin type constructors: vec3(...), float(...), mat4(...)
        if let Some(ty) = Type::from_name(&name) {
            self.tree.node_mut(callee).resolved_type = Some(ty);
            return self.check_constructor(ty, &arg_types, &range);
        }

        let symbol = match self.symbols.find(scope, &name) {
            Some(s) => s,
            None => {
                self.log
                    .error(range, format!("'{}' is not declared", name));
                return Type::Error;
            }
        };
        match self.symbols.symbol(symbol).kind {
            SymbolKind::Struct => {
                self.tree.node_mut(callee).symbol = Some(symbol);
                self.check_struct_constructor(symbol, &arg_types, &range)
            }
            SymbolKind::Variable => {
                self.log
                    .error(range, format!("'{}' is a variable, not a function", name));
                Type::Error
            }
            SymbolKind::Function => {
                for overload in self.symbols.overloads(symbol) {
                    if self.parameter_types(overload) == arg_types {
                        self.tree.node_mut(callee).symbol = Some(overload);
                        self.check_extension_gate(overload, &range);
                        return self.symbols.symbol(overload).ty;
                    }
                }
                let spelled: Vec<String> =
                    arg_types.iter().map(|t| t.name(self.symbols)).collect();
                self.log.error(
                    range,
                    format!(
                        "no overload of '{}' matches ({})",
                        name,
                        spelled.join(", ")
                    ),
                );
                Type::Error
            }
        }
    }

    fn parameter_types(&self, overload: SymbolId) -> Vec<Type> {
        let Some(node) = self.symbols.symbol(overload).node else {
            return Vec::new();
        };
        self.tree
            .children(node)
            .filter(|&c| matches!(self.tree.kind(c), NodeKind::Variable))
            .map(|c| {
                let sym = self.tree.node(c).symbol.expect("parameter has a symbol");
                self.symbols.symbol(sym).ty
            })
            .collect()
    }

    fn check_extension_gate(&mut self, symbol: SymbolId, range: &Range) {
        let s = self.symbols.symbol(symbol);
        if !s.has(flags::IMPORTED) {
            return;
        }
        let name = s.name.clone();
        if let Some(extension) = required_extension(&name) {
            if !self.extensions.contains(extension) {
                self.log.error(
                    range.clone(),
                    format!(
                        "'{}' requires \"#extension {} : enable\"",
                        name, extension
                    ),
                );
            }
        }
    }

    fn check_constructor(&mut self, ty: Type, arg_types: &[Type], range: &Range) -> Type {
        let ok = if ty.is_scalar() {
            arg_types.len() == 1 && arg_types[0].is_scalar()
        } else if let Some(size) = ty.vector_size() {
            let numeric = arg_types
                .iter()
                .all(|t| matches!(t, Type::Int | Type::Float) || t.vector_size().is_some());
            let components: usize = arg_types.iter().map(|t| t.component_count()).sum();
            numeric && (components == size || (arg_types.len() == 1 && arg_types[0].is_scalar()))
        } else if let Some(size) = ty.matrix_size() {
            let from_scalar = arg_types.len() == 1 && arg_types[0].is_scalar();
            let from_columns = arg_types.len() == size
                && arg_types.iter().all(|t| t.vector_size() == Some(size));
            let from_components = arg_types
                .iter()
                .all(|t| matches!(t, Type::Int | Type::Float))
                && arg_types.len() == size * size;
            from_scalar || from_columns || from_components
        } else {
            false
        };
        if !ok {
            let name = ty.name(self.symbols);
            let spelled: Vec<String> = arg_types.iter().map(|t| t.name(self.symbols)).collect();
            self.log.error(
                range.clone(),
                format!("cannot construct '{}' from ({})", name, spelled.join(", ")),
            );
        }
        // even a malformed constructor has a known result type
        ty
    }

    fn check_struct_constructor(
        &mut self,
        symbol: SymbolId,
        arg_types: &[Type],
        range: &Range,
    ) -> Type {
        let fields = self.struct_field_types(symbol);
        if fields.len() != arg_types.len()
            || fields.iter().zip(arg_types).any(|(f, a)| f != a && *f != Type::Error)
        {
            let name = self.symbols.symbol(symbol).name.clone();
            self.log.error(
                range.clone(),
                format!("wrong arguments to construct '{}'", name),
            );
        }
        Type::Struct(symbol)
    }

    fn struct_field_types(&self, symbol: SymbolId) -> Vec<Type> {
        let Some(node) = self.symbols.symbol(symbol).node else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for group in self.tree.children(node) {
            for var in self.tree.children(group) {
                if let Some(sym) = self.tree.node(var).symbol {
                    out.push(self.symbols.symbol(sym).ty);
                }
            }
        }
        out
    }

    fn resolve_dot(&mut self, id: NodeId, field: &str, scope: ScopeId) -> Type {
        let object = self.tree.child(id, 0).expect("member access has an object");
        let ty = self.resolve_expression(object, scope);
        match ty {
            Type::Error => Type::Error,
            Type::Struct(symbol) => {
                let struct_scope = self
                    .symbols
                    .symbol(symbol)
                    .node
                    .and_then(|n| self.tree.node(n).scope);
                let member =
                    struct_scope.and_then(|s| self.symbols.find_local(s, field));
                match member {
                    Some(m) => {
                        self.tree.node_mut(id).symbol = Some(m);
                        self.symbols.symbol(m).ty
                    }
                    None => {
                        let range = self.tree.node(id).range.clone();
                        let name = self.symbols.symbol(symbol).name.clone();
                        self.log.error(
                            range,
                            format!("no member '{}' in '{}'", field, name),
                        );
                        Type::Error
                    }
                }
            }
            _ => self.resolve_swizzle(id, field, ty),
        }
    }

    fn resolve_swizzle(&mut self, id: NodeId, field: &str, ty: Type) -> Type {
        let size = match ty.vector_size() {
            Some(size) => size,
            None => {
                let range = self.tree.node(id).range.clone();
                let name = ty.name(self.symbols);
                self.log.error(
                    range,
                    format!("no member '{}' on type '{}'", field, name),
                );
                return Type::Error;
            }
        };
        let in_range = |c: char, family: &str| {
            family.find(c).map(|i| i < size).unwrap_or(false)
        };
        let valid = !field.is_empty()
            && field.len() <= 4
            && ["xyzw", "rgba", "stpq"]
                .iter()
                .any(|family| field.chars().all(|c| in_range(c, family)));
        if !valid {
            let range = self.tree.node(id).range.clone();
            let name = ty.name(self.symbols);
            self.log.error(
                range,
                format!("invalid swizzle '{}' on '{}'", field, name),
            );
            return Type::Error;
        }
        Type::vector_of(field.len())
    }

    fn resolve_index(&mut self, id: NodeId, scope: ScopeId) -> Type {
        let object = self.tree.child(id, 0).expect("index has an object");
        let index = self.tree.child(id, 1).expect("index has a subscript");
        let object_ty = self.resolve_expression(object, scope);
        let index_ty = self.resolve_expression(index, scope);
        if object_ty == Type::Error || index_ty == Type::Error {
            return Type::Error;
        }
        if index_ty != Type::Int {
            return self.operand_error(index, "an 'int' index", index_ty);
        }
        let (result, size) = match object_ty {
            ty if ty.vector_size().is_some() => (Type::Float, ty.vector_size()),
            ty if ty.matrix_size().is_some() => (
                Type::vector_of(ty.matrix_size().expect("matrix size")),
                ty.matrix_size(),
            ),
            _ => {
                return self.operand_error(object, "a vector or matrix", object_ty);
            }
        };
        if let (NodeKind::IntLiteral(i), Some(size)) = (self.tree.kind(index), size) {
            if *i < 0 || *i as usize >= size {
                let range = self.tree.node(index).range.clone();
                let value = *i;
                self.log
                    .error(range, format!("index {} is out of range", value));
            }
        }
        result
    }
}
