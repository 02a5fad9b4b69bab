//! GLSL text emission.
//!
//! A pure function of the tree and the whitespace option: no mutation, no
//! diagnostics. Parentheses are re-derived from operator precedence, so the
//! output parses back to the same tree shape regardless of how the input was
//! written.

use crate::compiler::node::{AssignOp, BinaryOp, NodeId, NodeKind, PostfixOp, Tree, UnaryOp};
use crate::compiler::scope::{flags, SymbolId, SymbolTable, Type};

pub fn emit(tree: &Tree, symbols: &SymbolTable, root: NodeId, minify: bool) -> String {
    let mut emitter = Emitter {
        tree,
        symbols,
        minify,
        out: String::new(),
        indent: 0,
    };
    for decl in tree.children(root) {
        emitter.emit_global(decl);
    }
    emitter.out
}

struct Emitter<'a> {
    tree: &'a Tree,
    symbols: &'a SymbolTable,
    minify: bool,
    out: String,
    indent: usize,
}

impl<'a> Emitter<'a> {
    // ── small writing helpers ──────────────────────────────────────────

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// A space that only survives pretty mode.
    fn space(&mut self) {
        if !self.minify {
            self.out.push(' ');
        }
    }

    fn newline(&mut self) {
        if !self.minify {
            self.out.push('\n');
        }
    }

    fn pad(&mut self) {
        if !self.minify {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
        }
    }

    fn symbol_name(&self, id: SymbolId) -> &str {
        &self.symbols.symbol(id).name
    }

    fn type_name(&self, id: SymbolId) -> String {
        let s = self.symbols.symbol(id);
        match s.ty {
            Type::Error => s.declared_type.clone(),
            ty => ty.name(self.symbols),
        }
    }

    fn qualifier(&self, id: SymbolId) -> &'static str {
        let s = self.symbols.symbol(id);
        if s.has(flags::ATTRIBUTE) {
            "attribute "
        } else if s.has(flags::UNIFORM) {
            "uniform "
        } else if s.has(flags::VARYING) {
            "varying "
        } else if s.has(flags::CONST) {
            "const "
        } else {
            ""
        }
    }

    // ── declarations ───────────────────────────────────────────────────

    fn emit_global(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Extension { name, behavior } => {
                // a directive must end its own line, even minified
                self.write(&format!("#extension {} : {}", name, behavior));
                self.out.push('\n');
            }
            NodeKind::Struct => {
                self.emit_struct(id);
                self.newline();
            }
            NodeKind::Variables => {
                self.emit_variables(id);
                self.newline();
            }
            NodeKind::Function => {
                self.emit_function(id);
                self.newline();
            }
            _ => {}
        }
    }

    fn emit_struct(&mut self, id: NodeId) {
        let symbol = self.tree.node(id).symbol.expect("struct has a symbol");
        self.write("struct ");
        self.write(&self.symbol_name(symbol).to_string());
        self.space();
        self.write("{");
        self.newline();
        self.indent += 1;
        for group in self.tree.children(id) {
            self.pad();
            self.emit_variables(group);
            self.newline();
        }
        self.indent -= 1;
        self.pad();
        self.write("};");
    }

    fn emit_variables(&mut self, id: NodeId) {
        let mut first = true;
        for var in self.tree.children(id) {
            let symbol = self.tree.node(var).symbol.expect("declarator has a symbol");
            if first {
                let qualifier = self.qualifier(symbol);
                self.write(qualifier);
                let ty = self.type_name(symbol);
                self.write(&ty);
                self.write(" ");
                first = false;
            } else {
                self.write(",");
                self.space();
            }
            self.write(&self.symbol_name(symbol).to_string());
            if let Some(init) = self.tree.node(var).first_child {
                self.space();
                self.write("=");
                self.space();
                self.emit_expression(init, 2);
            }
        }
        self.write(";");
    }

    fn emit_function(&mut self, id: NodeId) {
        let symbol = self.tree.node(id).symbol.expect("function has a symbol");
        let ty = self.type_name(symbol);
        self.write(&ty);
        self.write(" ");
        self.write(&self.symbol_name(symbol).to_string());
        self.write("(");
        let mut first = true;
        let mut body = None;
        for child in self.tree.children(id) {
            match self.tree.kind(child) {
                NodeKind::Variable => {
                    if !first {
                        self.write(",");
                        self.space();
                    }
                    first = false;
                    let param = self.tree.node(child).symbol.expect("parameter has a symbol");
                    if self.symbols.symbol(param).has(flags::CONST) {
                        self.write("const ");
                    }
                    let pty = self.type_name(param);
                    self.write(&pty);
                    self.write(" ");
                    self.write(&self.symbol_name(param).to_string());
                }
                NodeKind::Block => body = Some(child),
                _ => {}
            }
        }
        self.write(")");
        match body {
            Some(block) => {
                self.space();
                self.emit_block(block);
            }
            None => self.write(";"),
        }
    }

    // ── statements ─────────────────────────────────────────────────────

    fn emit_block(&mut self, id: NodeId) {
        self.write("{");
        self.newline();
        self.indent += 1;
        for stmt in self.tree.children(id) {
            self.pad();
            self.emit_statement(stmt);
            self.newline();
        }
        self.indent -= 1;
        self.pad();
        self.write("}");
    }

    fn emit_statement(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Block => self.emit_block(id),
            NodeKind::Variables => self.emit_variables(id),
            NodeKind::Empty => self.write(";"),
            NodeKind::Break => self.write("break;"),
            NodeKind::Continue => self.write("continue;"),
            NodeKind::Discard => self.write("discard;"),
            NodeKind::Return => match self.tree.node(id).first_child {
                Some(value) => {
                    self.write("return ");
                    self.emit_expression(value, 1);
                    self.write(";");
                }
                None => self.write("return;"),
            },
            NodeKind::ExpressionStmt => {
                if let Some(expr) = self.tree.node(id).first_child {
                    self.emit_expression(expr, 1);
                }
                self.write(";");
            }
            NodeKind::If => self.emit_if(id),
            NodeKind::While => {
                let condition = self.tree.child(id, 0).expect("while has a condition");
                let body = self.tree.child(id, 1).expect("while has a body");
                self.write("while");
                self.space();
                self.write("(");
                self.emit_expression(condition, 1);
                self.write(")");
                self.emit_embedded_statement(body);
            }
            NodeKind::DoWhile => {
                let body = self.tree.child(id, 0).expect("do has a body");
                let condition = self.tree.child(id, 1).expect("do has a condition");
                self.write("do");
                if matches!(self.tree.kind(body), NodeKind::Block) {
                    self.space();
                    self.emit_block(body);
                    self.space();
                } else {
                    self.write(" ");
                    self.emit_statement(body);
                    self.write(" ");
                }
                self.write("while");
                self.space();
                self.write("(");
                self.emit_expression(condition, 1);
                self.write(");");
            }
            NodeKind::For => self.emit_for(id),
            _ => {
                // an expression placed directly in statement position
                self.emit_expression(id, 1);
                self.write(";");
            }
        }
    }

    fn emit_embedded_statement(&mut self, id: NodeId) {
        if matches!(self.tree.kind(id), NodeKind::Block) {
            self.space();
            self.emit_block(id);
        } else if self.minify {
            self.emit_statement(id);
        } else {
            self.newline();
            self.indent += 1;
            self.pad();
            self.emit_statement(id);
            self.indent -= 1;
        }
    }

    fn emit_if(&mut self, id: NodeId) {
        let condition = self.tree.child(id, 0).expect("if has a condition");
        let then = self.tree.child(id, 1).expect("if has a then branch");
        let otherwise = self.tree.child(id, 2);
        self.write("if");
        self.space();
        self.write("(");
        self.emit_expression(condition, 1);
        self.write(")");
        self.emit_embedded_statement(then);
        if let Some(otherwise) = otherwise {
            if matches!(self.tree.kind(then), NodeKind::Block) {
                self.space();
            } else {
                self.newline();
                self.pad();
            }
            if matches!(self.tree.kind(otherwise), NodeKind::Block) {
                self.write("else");
                self.space();
                self.emit_block(otherwise);
            } else {
                self.write("else ");
                self.emit_statement(otherwise);
            }
        }
    }

    fn emit_for(&mut self, id: NodeId) {
        let init = self.tree.child(id, 0).expect("for has an initializer");
        let condition = self.tree.child(id, 1).expect("for has a condition");
        let update = self.tree.child(id, 2).expect("for has an update");
        let body = self.tree.child(id, 3).expect("for has a body");
        self.write("for");
        self.space();
        self.write("(");
        match self.tree.kind(init) {
            NodeKind::Empty => self.write(";"),
            _ => self.emit_statement(init), // a statement carries its own ';'
        }
        self.space();
        if !matches!(self.tree.kind(condition), NodeKind::Empty) {
            self.emit_expression(condition, 1);
        }
        self.write(";");
        if !matches!(self.tree.kind(update), NodeKind::Empty) {
            self.space();
            self.emit_expression(update, 1);
        }
        self.write(")");
        self.emit_embedded_statement(body);
    }

    // ── expressions ────────────────────────────────────────────────────

    fn precedence(kind: &NodeKind) -> u8 {
        use BinaryOp::*;
        match kind {
            NodeKind::Assign(_) => 1,
            NodeKind::Ternary => 2,
            NodeKind::Binary(Or) => 3,
            NodeKind::Binary(And) => 4,
            NodeKind::Binary(Equal | NotEqual) => 5,
            NodeKind::Binary(Less | LessEqual | Greater | GreaterEqual) => 6,
            NodeKind::Binary(Add | Subtract) => 7,
            NodeKind::Binary(Multiply | Divide) => 8,
            NodeKind::Unary(_) => 9,
            NodeKind::Postfix(_) | NodeKind::Call | NodeKind::Dot(_) | NodeKind::Index => 10,
            _ => 11,
        }
    }

    fn emit_expression(&mut self, id: NodeId, parent_precedence: u8) {
        let precedence = Self::precedence(self.tree.kind(id));
        let parenthesize = precedence < parent_precedence;
        if parenthesize {
            self.write("(");
        }
        match self.tree.kind(id).clone() {
            NodeKind::IntLiteral(v) => self.write(&v.to_string()),
            NodeKind::FloatLiteral(v) => {
                let text = format_float(v);
                self.write(&text);
            }
            NodeKind::BoolLiteral(v) => self.write(if v { "true" } else { "false" }),
            NodeKind::Name(text) => match self.tree.node(id).symbol {
                Some(symbol) => self.write(&self.symbol_name(symbol).to_string()),
                None => self.write(&text),
            },
            NodeKind::Unary(op) => {
                let operand = self.tree.node(id).first_child.expect("unary operand");
                self.write(match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                    UnaryOp::PreIncrement => "++",
                    UnaryOp::PreDecrement => "--",
                });
                // avoid gluing '- -x' into '--x'
                let inner = matches!(self.tree.kind(operand), NodeKind::Unary(_));
                self.emit_expression(operand, if inner { 10 } else { precedence });
            }
            NodeKind::Postfix(op) => {
                let operand = self.tree.node(id).first_child.expect("postfix operand");
                self.emit_expression(operand, precedence);
                self.write(match op {
                    PostfixOp::Increment => "++",
                    PostfixOp::Decrement => "--",
                });
            }
            NodeKind::Binary(op) => {
                let left = self.tree.node(id).first_child.expect("binary left");
                let right = self.tree.node(id).last_child.expect("binary right");
                self.emit_expression(left, precedence);
                self.space();
                self.write(Self::binary_text(op));
                self.space();
                // minified 'a - -b' would glue into 'a--b'; force parentheses
                let glue = self.minify
                    && matches!(
                        (op, self.tree.kind(right)),
                        (
                            BinaryOp::Subtract,
                            NodeKind::Unary(UnaryOp::Negate | UnaryOp::PreDecrement)
                        ) | (
                            BinaryOp::Add,
                            NodeKind::Unary(UnaryOp::Plus | UnaryOp::PreIncrement)
                        )
                    );
                self.emit_expression(right, if glue { 10 } else { precedence + 1 });
            }
            NodeKind::Assign(op) => {
                let target = self.tree.node(id).first_child.expect("assignment target");
                let value = self.tree.node(id).last_child.expect("assignment value");
                self.emit_expression(target, precedence + 1);
                self.space();
                self.write(match op {
                    AssignOp::Assign => "=",
                    AssignOp::Add => "+=",
                    AssignOp::Subtract => "-=",
                    AssignOp::Multiply => "*=",
                    AssignOp::Divide => "/=",
                });
                self.space();
                self.emit_expression(value, precedence);
            }
            NodeKind::Ternary => {
                let condition = self.tree.child(id, 0).expect("ternary condition");
                let then = self.tree.child(id, 1).expect("ternary then");
                let otherwise = self.tree.child(id, 2).expect("ternary else");
                self.emit_expression(condition, precedence + 1);
                self.space();
                self.write("?");
                self.space();
                self.emit_expression(then, 1);
                self.space();
                self.write(":");
                self.space();
                self.emit_expression(otherwise, precedence);
            }
            NodeKind::Call => {
                let callee = self.tree.node(id).first_child.expect("call callee");
                self.emit_expression(callee, precedence);
                self.write("(");
                let mut first = true;
                for arg in self.tree.children(id).skip(1) {
                    if !first {
                        self.write(",");
                        self.space();
                    }
                    first = false;
                    self.emit_expression(arg, 1);
                }
                self.write(")");
            }
            NodeKind::Dot(field) => {
                let object = self.tree.node(id).first_child.expect("member object");
                self.emit_expression(object, precedence);
                self.write(".");
                // a struct member may have been renamed through its symbol
                match self.tree.node(id).symbol {
                    Some(symbol) => self.write(&self.symbol_name(symbol).to_string()),
                    None => self.write(&field),
                }
            }
            NodeKind::Index => {
                let object = self.tree.child(id, 0).expect("index object");
                let index = self.tree.child(id, 1).expect("index subscript");
                self.emit_expression(object, precedence);
                self.write("[");
                self.emit_expression(index, 1);
                self.write("]");
            }
            _ => {}
        }
        if parenthesize {
            self.write(")");
        }
    }

    fn binary_text(op: BinaryOp) -> &'static str {
        match op {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// GLSL float literals must stay recognisably floating point: `1` comes out
/// as `1.0`.
fn format_float(value: f32) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::api;
    use crate::compiler::lexer::{tokenize, Token};
    use crate::compiler::log::Log;
    use crate::compiler::node::Tree;
    use crate::compiler::parser::parse;
    use crate::compiler::resolver::resolve;
    use crate::compiler::rewriter::rewrite;
    use crate::compiler::scope::flags;
    use crate::compiler::source::{Range, Source};
    use std::rc::Rc;

    fn emit_text(text: &str, minify: bool) -> String {
        let mut log = Log::new();
        let api_src = Source::new(api::NAME, api::SOURCE);
        let api_tokens = tokenize(&mut log, &api_src);
        let src = Source::new("test.glsl", text);
        let tokens = tokenize(&mut log, &src);
        let mut tree = Tree::new();
        let mut symbols = SymbolTable::new();
        let root = tree.add(NodeKind::Global, Range::new(&src, 0, text.len()));
        let mut no_includes =
            |_: &str, _: &str, _: &mut Log| -> Option<Rc<Vec<Token>>> { None };
        parse(&mut log, &api_tokens, &mut tree, &mut symbols, root, &mut no_includes);
        for id in symbols.symbol_ids() {
            symbols.symbol_mut(id).flags |= flags::IMPORTED;
        }
        parse(&mut log, &tokens, &mut tree, &mut symbols, root, &mut no_includes);
        resolve(&mut log, &mut tree, &mut symbols, root);
        assert!(!log.has_errors(), "test source should resolve cleanly");
        // Strip the injected API declarations (as the pipeline does) without
        // enabling constant folding or trimming, so user formatting is intact.
        rewrite(&mut tree, &mut symbols, root, false, false);
        emit(&tree, &symbols, root, minify)
    }

    #[test]
    fn test_formatted_output() {
        let out = emit_text(
            "uniform vec2 scale;void main(){gl_pos(scale*2.0);}\
             void gl_pos(vec2 v){}",
            false,
        );
        assert_eq!(
            out,
            "uniform vec2 scale;\n\
             void main() {\n    gl_pos(scale * 2.0);\n}\n\
             void gl_pos(vec2 v) {\n}\n"
        );
    }

    #[test]
    fn test_minified_output() {
        let out = emit_text(
            "uniform vec2 scale;\n\
             void main() {\n\
                 float x = scale.x * 2.0;\n\
                 if (x > 1.0) { x = 1.0; } else { x += 0.5; }\n\
             }\n",
            true,
        );
        assert_eq!(
            out,
            "uniform vec2 scale;void main(){float x=scale.x*2.0;if(x>1.0){x=1.0;}else{x+=0.5;}}"
        );
    }

    #[test]
    fn test_precedence_parentheses_roundtrip() {
        let out = emit_text(
            "float f(float a, float b) { return (a + b) * a - -b; }\n",
            false,
        );
        assert!(out.contains("(a + b) * a - -b"), "got: {}", out);
    }

    #[test]
    fn test_float_literals_stay_floats() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-3.0), "-3.0");
    }

    #[test]
    fn test_directive_keeps_its_newline_when_minified() {
        let out = emit_text(
            "#extension GL_OES_standard_derivatives : enable\n\
             void main() { float x = dFdx(1.0); }\n",
            true,
        );
        assert!(out.starts_with("#extension GL_OES_standard_derivatives : enable\n"));
        assert!(!out[out.find('\n').unwrap() + 1..].contains('\n'));
    }

    #[test]
    fn test_struct_and_for_loop_emission() {
        let out = emit_text(
            "struct Light { vec3 color; float power; };\n\
             float sum(Light l) {\n\
                 float total = 0.0;\n\
                 for (int i = 0; i < 3; i++) total += l.color[i];\n\
                 return total * l.power;\n\
             }\n",
            false,
        );
        assert!(out.contains("struct Light {\n    vec3 color;\n    float power;\n};\n"));
        assert!(out.contains("for (int i = 0; i < 3; i++)\n        total += l.color[i];"));
    }

    #[test]
    fn test_prototype_emission() {
        let out = emit_text("float later(float x);\nfloat use_it() { return later(1.0); }\nfloat later(float x) { return x; }\n", false);
        assert!(out.starts_with("float later(float x);\n"));
    }
}
