//! Parser that consumes the token stream and appends declarations to the
//! shared tree and scope.
//!
//! Functions and structs are registered in the enclosing scope before their
//! bodies are parsed so later declarations can reference them (forward
//! references). Re-declaring a function with a new signature appends to its
//! overload chain; signature conflicts are left to the resolver. A syntax
//! error aborts only the current declaration: the parser reports it, skips
//! to the next `;` or `}` at brace depth zero, and keeps going.

use std::rc::Rc;

use crate::compiler::lexer::{Token, TokenKind};
use crate::compiler::log::Log;
use crate::compiler::node::{AssignOp, BinaryOp, NodeId, NodeKind, PostfixOp, Tree, UnaryOp};
use crate::compiler::scope::{flags, ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable, Type, GLOBAL_SCOPE};
use crate::compiler::source::Range;

const MAX_INCLUDE_DEPTH: usize = 16;

/// Append every top-level declaration in `tokens` to `root` and the global
/// scope. Mutates the tree, scope and log in place; malformed declarations
/// are reported and skipped individually. `includes` resolves an `#include`
/// path to a cached token stream (`None` when the file cannot be found); the
/// compile session supplies it.
pub fn parse<F>(
    log: &mut Log,
    tokens: &[Token],
    tree: &mut Tree,
    symbols: &mut SymbolTable,
    root: NodeId,
    includes: &mut F,
) where
    F: FnMut(&str, &str, &mut Log) -> Option<Rc<Vec<Token>>>,
{
    let mut parser = Parser {
        tokens,
        pos: 0,
        log,
        tree,
        symbols,
        includes,
        depth: 0,
    };
    parser.parse_globals(root);
}

struct Parser<'t, 'c, F> {
    tokens: &'t [Token],
    pos: usize,
    log: &'c mut Log,
    tree: &'c mut Tree,
    symbols: &'c mut SymbolTable,
    includes: &'c mut F,
    depth: usize,
}

impl<'t, 'c, F> Parser<'t, 'c, F>
where
    F: FnMut(&str, &str, &mut Log) -> Option<Rc<Vec<Token>>>,
{
    // ── token plumbing ─────────────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_ahead(&self, n: usize) -> &TokenKind {
        let i = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn here(&self) -> Range {
        self.tokens[self.pos].range.clone()
    }

    fn previous_range(&self) -> Range {
        self.tokens[self.pos.saturating_sub(1)].range.clone()
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(&kind) {
            true
        } else {
            let range = self.here();
            self.log.error(range, format!("expected {}", what));
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<(String, Range)> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let range = self.here();
                self.advance();
                Some((name, range))
            }
            _ => {
                let range = self.here();
                self.log.error(range, format!("expected {}", what));
                None
            }
        }
    }

    /// Skip to the next `;` or the `}` closing the current brace depth, so an
    /// error in one declaration does not poison the rest of the file.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::EndOfFile => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LeftBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RightBrace => {
                    self.advance();
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── declarations ───────────────────────────────────────────────────

    fn parse_globals(&mut self, root: NodeId) {
        while *self.peek() != TokenKind::EndOfFile {
            if self.parse_global(root).is_none() {
                self.synchronize();
            }
        }
    }

    fn parse_global(&mut self, root: NodeId) -> Option<()> {
        match self.peek() {
            TokenKind::Semicolon => {
                self.advance(); // stray semicolon
                Some(())
            }
            TokenKind::Extension => self.parse_extension(root),
            TokenKind::Include => self.parse_include(root),
            TokenKind::Struct => self.parse_struct(root),
            _ => self.parse_global_declaration(root),
        }
    }

    fn parse_extension(&mut self, root: NodeId) -> Option<()> {
        let start = self.here();
        self.advance();
        let (name, _) = self.expect_ident("an extension name after '#extension'")?;
        if !self.expect(TokenKind::Colon, "':' in '#extension'") {
            return None;
        }
        let (behavior, _) = self.expect_ident("a behavior after ':'")?;
        if !matches!(behavior.as_str(), "enable" | "require" | "warn" | "disable") {
            let range = self.previous_range();
            self.log.error(
                range,
                format!("unknown extension behavior '{}'", behavior),
            );
        }
        let node = self
            .tree
            .add(NodeKind::Extension { name, behavior }, start.span_to(&self.previous_range()));
        self.tree.append_child(root, node);
        Some(())
    }

    fn parse_include(&mut self, root: NodeId) -> Option<()> {
        let start = self.here();
        self.advance();
        let path = match self.peek() {
            TokenKind::StringLiteral(path) => {
                let p = path.clone();
                self.advance();
                p
            }
            _ => {
                let range = self.here();
                self.log.error(range, "expected a quoted path after '#include'");
                return None;
            }
        };
        if self.depth >= MAX_INCLUDE_DEPTH {
            self.log
                .error(start, format!("include depth limit reached at '{}'", path));
            return Some(());
        }
        let relative_to = start.source.name.clone();
        let tokens = match (self.includes)(&path, &relative_to, self.log) {
            Some(tokens) => tokens,
            None => {
                self.log
                    .error(start, format!("cannot resolve include '{}'", path));
                return Some(());
            }
        };
        let mut sub = Parser {
            tokens: &tokens,
            pos: 0,
            log: &mut *self.log,
            tree: &mut *self.tree,
            symbols: &mut *self.symbols,
            includes: &mut *self.includes,
            depth: self.depth + 1,
        };
        sub.parse_globals(root);
        Some(())
    }

    fn parse_struct(&mut self, root: NodeId) -> Option<()> {
        let start = self.here();
        self.advance();
        let (name, name_range) = self.expect_ident("a struct name")?;

        if let Some(existing) = self.symbols.find_local(GLOBAL_SCOPE, &name) {
            let previous = self.symbols.symbol(existing).range.clone();
            self.log
                .error(name_range.clone(), format!("'{}' is already declared", name));
            self.log.note(previous, "previous declaration is here");
        }
        let symbol = self
            .symbols
            .declare(GLOBAL_SCOPE, &name, SymbolKind::Struct, name_range, &name);
        self.symbols.symbol_mut(symbol).ty = Type::Struct(symbol);

        let scope = self.symbols.push_scope(ScopeKind::Struct, GLOBAL_SCOPE);
        let node = self.tree.add(NodeKind::Struct, start.clone());
        self.tree.node_mut(node).symbol = Some(symbol);
        self.tree.node_mut(node).scope = Some(scope);
        self.symbols.symbol_mut(symbol).node = Some(node);

        if !self.expect(TokenKind::LeftBrace, "'{' after the struct name") {
            return None;
        }
        while !self.eat(&TokenKind::RightBrace) {
            if *self.peek() == TokenKind::EndOfFile {
                self.log.error(self.here(), "unterminated struct declaration");
                return None;
            }
            let (ty, _) = self.parse_type_name("a field type")?;
            let group = self.parse_variable_group(scope, 0, &ty)?;
            self.tree.append_child(node, group);
        }
        self.expect(TokenKind::Semicolon, "';' after the struct declaration");
        self.tree.node_mut(node).range = start.span_to(&self.previous_range());
        self.tree.append_child(root, node);
        Some(())
    }

    fn parse_global_declaration(&mut self, root: NodeId) -> Option<()> {
        let start = self.here();
        let mut modifier_flags = 0u32;
        let mut exported = false;
        loop {
            match self.peek() {
                TokenKind::Export => {
                    exported = true;
                    self.advance();
                }
                TokenKind::Attribute => {
                    modifier_flags |= flags::ATTRIBUTE;
                    self.advance();
                }
                TokenKind::Uniform => {
                    modifier_flags |= flags::UNIFORM;
                    self.advance();
                }
                TokenKind::Varying => {
                    modifier_flags |= flags::VARYING;
                    self.advance();
                }
                TokenKind::Const => {
                    modifier_flags |= flags::CONST;
                    self.advance();
                }
                _ => break,
            }
        }

        let (ty, _) = self.parse_type_name("a type name")?;
        let (name, name_range) = self.expect_ident("a declaration name")?;

        if *self.peek() == TokenKind::LeftParen {
            if modifier_flags != 0 {
                self.log.error(
                    name_range.clone(),
                    "qualifiers are not allowed on a function",
                );
            }
            self.parse_function(root, start, exported, &ty, name, name_range)
        } else {
            if exported {
                self.log
                    .error(name_range.clone(), "only functions can be exported");
            }
            let group =
                self.parse_variable_group_named(GLOBAL_SCOPE, modifier_flags, &ty, name, name_range)?;
            self.tree.node_mut(group).range = start.span_to(&self.previous_range());
            self.tree.append_child(root, group);
            Some(())
        }
    }

    fn parse_type_name(&mut self, what: &str) -> Option<(String, Range)> {
        match self.peek() {
            TokenKind::Void => {
                let range = self.here();
                self.advance();
                Some(("void".into(), range))
            }
            TokenKind::Ident(_) => self.expect_ident(what),
            _ => {
                let range = self.here();
                self.log.error(range, format!("expected {}", what));
                None
            }
        }
    }

    /// Parse `name [= init] (, name [= init])* ;` into a `Variables` group.
    fn parse_variable_group_named(
        &mut self,
        scope: ScopeId,
        modifier_flags: u32,
        ty: &str,
        first_name: String,
        first_range: Range,
    ) -> Option<NodeId> {
        let group = self.tree.add(NodeKind::Variables, first_range.clone());
        let mut name = first_name;
        let mut name_range = first_range;
        loop {
            let symbol = self.declare_variable(scope, &name, name_range.clone(), ty, modifier_flags);
            let var = self.tree.add(NodeKind::Variable, name_range.clone());
            self.tree.node_mut(var).symbol = Some(symbol);
            self.symbols.symbol_mut(symbol).node = Some(var);
            if self.eat(&TokenKind::Assign) {
                let init = self.parse_expression()?;
                self.tree.append_child(var, init);
            }
            self.tree.append_child(group, var);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            let (n, r) = self.expect_ident("a declarator name after ','")?;
            name = n;
            name_range = r;
        }
        self.expect(TokenKind::Semicolon, "';' after the declaration");
        Some(group)
    }

    fn parse_variable_group(
        &mut self,
        scope: ScopeId,
        modifier_flags: u32,
        ty: &str,
    ) -> Option<NodeId> {
        let (name, range) = self.expect_ident("a declarator name")?;
        self.parse_variable_group_named(scope, modifier_flags, ty, name, range)
    }

    fn declare_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        range: Range,
        ty: &str,
        modifier_flags: u32,
    ) -> SymbolId {
        if let Some(existing) = self.symbols.find_local(scope, name) {
            let previous = self.symbols.symbol(existing).range.clone();
            self.log
                .error(range.clone(), format!("'{}' is already declared", name));
            self.log.note(previous, "previous declaration is here");
        }
        let symbol = self
            .symbols
            .declare(scope, name, SymbolKind::Variable, range, ty);
        self.symbols.symbol_mut(symbol).flags |= modifier_flags;
        symbol
    }

    fn parse_function(
        &mut self,
        root: NodeId,
        start: Range,
        exported: bool,
        return_type: &str,
        name: String,
        name_range: Range,
    ) -> Option<()> {
        let scope = self.symbols.push_scope(ScopeKind::Function, GLOBAL_SCOPE);
        let node = self.tree.add(NodeKind::Function, start.clone());
        self.tree.node_mut(node).scope = Some(scope);

        self.advance(); // '('
        let mut param_types = Vec::new();
        if !self.eat(&TokenKind::RightParen) {
            if *self.peek() == TokenKind::Void && *self.peek_ahead(1) == TokenKind::RightParen {
                self.advance();
                self.advance();
            } else {
                loop {
                    let is_const = self.eat(&TokenKind::Const);
                    let (pty, _) = self.parse_type_name("a parameter type")?;
                    let (pname, prange) = self.expect_ident("a parameter name")?;
                    let symbol = self.declare_variable(
                        scope,
                        &pname,
                        prange.clone(),
                        &pty,
                        if is_const { flags::CONST } else { 0 },
                    );
                    let param = self.tree.add(NodeKind::Variable, prange);
                    self.tree.node_mut(param).symbol = Some(symbol);
                    self.symbols.symbol_mut(symbol).node = Some(param);
                    self.tree.append_child(node, param);
                    param_types.push(pty);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                if !self.expect(TokenKind::RightParen, "')' after the parameter list") {
                    return None;
                }
            }
        }

        let symbol = self.bind_function_symbol(&name, name_range, return_type, &param_types, node);
        self.tree.node_mut(node).symbol = Some(symbol);
        if exported {
            self.symbols.symbol_mut(symbol).flags |= flags::EXPORTED;
        }

        if self.eat(&TokenKind::Semicolon) {
            // forward declaration
        } else {
            let had_body = {
                let existing = self.symbols.symbol(symbol);
                existing.node != Some(node) && self.function_has_body(existing.node)
            };
            if had_body {
                self.log.error(
                    self.tree.node(node).range.clone(),
                    format!("function '{}' is already defined", name),
                );
            }
            let body = self.parse_block(scope)?;
            self.tree.append_child(node, body);
            // the defining node wins the symbol's back reference
            self.symbols.symbol_mut(symbol).node = Some(node);
        }
        self.tree.node_mut(node).range = start.span_to(&self.previous_range());
        self.tree.append_child(root, node);
        Some(())
    }

    fn function_has_body(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|n| {
            self.tree
                .children(n)
                .any(|c| matches!(self.tree.kind(c), NodeKind::Block))
        })
    }

    /// Find or create the symbol for a function with this signature. A
    /// matching signature merges with the forward declaration; a different
    /// one extends the overload chain.
    fn bind_function_symbol(
        &mut self,
        name: &str,
        name_range: Range,
        return_type: &str,
        param_types: &[String],
        node: NodeId,
    ) -> SymbolId {
        if let Some(existing) = self.symbols.find_local(GLOBAL_SCOPE, name) {
            if self.symbols.symbol(existing).kind != SymbolKind::Function {
                let previous = self.symbols.symbol(existing).range.clone();
                self.log
                    .error(name_range.clone(), format!("'{}' is already declared", name));
                self.log.note(previous, "previous declaration is here");
            } else {
                for overload in self.symbols.overloads(existing) {
                    let candidate_node = self.symbols.symbol(overload).node;
                    if self.parameter_types_of(candidate_node) == param_types {
                        if self.symbols.symbol(overload).declared_type != return_type {
                            self.log.error(
                                name_range,
                                format!(
                                    "overload of '{}' differs only by return type",
                                    name
                                ),
                            );
                        }
                        return overload;
                    }
                }
                // new overload
                let head = existing;
                let symbol = self.symbols.declare(
                    GLOBAL_SCOPE,
                    name,
                    SymbolKind::Function,
                    name_range,
                    return_type,
                );
                self.symbols.symbol_mut(symbol).previous_overload = Some(head);
                self.symbols.symbol_mut(symbol).node = Some(node);
                return symbol;
            }
        }
        let symbol = self.symbols.declare(
            GLOBAL_SCOPE,
            name,
            SymbolKind::Function,
            name_range,
            return_type,
        );
        self.symbols.symbol_mut(symbol).node = Some(node);
        symbol
    }

    fn parameter_types_of(&self, node: Option<NodeId>) -> Vec<String> {
        let Some(node) = node else { return Vec::new() };
        self.tree
            .children(node)
            .filter(|&c| matches!(self.tree.kind(c), NodeKind::Variable))
            .map(|c| {
                let sym = self.tree.node(c).symbol.expect("parameter has a symbol");
                self.symbols.symbol(sym).declared_type.clone()
            })
            .collect()
    }

    // ── statements ─────────────────────────────────────────────────────

    fn parse_block(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        if !self.expect(TokenKind::LeftBrace, "'{'") {
            return None;
        }
        let node = self.tree.add(NodeKind::Block, start.clone());
        self.tree.node_mut(node).scope = Some(scope);
        while !self.eat(&TokenKind::RightBrace) {
            if *self.peek() == TokenKind::EndOfFile {
                self.log.error(self.here(), "unterminated block");
                return None;
            }
            let stmt = self.parse_statement(scope)?;
            self.tree.append_child(node, stmt);
        }
        self.tree.node_mut(node).range = start.span_to(&self.previous_range());
        Some(node)
    }

    fn parse_statement(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        match self.peek() {
            TokenKind::LeftBrace => {
                let inner = self.symbols.push_scope(ScopeKind::Local, scope);
                self.parse_block(inner)
            }
            TokenKind::Semicolon => {
                self.advance();
                Some(self.tree.add(NodeKind::Empty, start))
            }
            TokenKind::If => self.parse_if(scope),
            TokenKind::While => self.parse_while(scope),
            TokenKind::Do => self.parse_do_while(scope),
            TokenKind::For => self.parse_for(scope),
            TokenKind::Return => {
                self.advance();
                let node = self.tree.add(NodeKind::Return, start.clone());
                if !self.eat(&TokenKind::Semicolon) {
                    let value = self.parse_expression()?;
                    self.tree.append_child(node, value);
                    self.expect(TokenKind::Semicolon, "';' after the return value");
                }
                self.tree.node_mut(node).range = start.span_to(&self.previous_range());
                Some(node)
            }
            TokenKind::Break => self.parse_bare_statement(NodeKind::Break, "break"),
            TokenKind::Continue => self.parse_bare_statement(NodeKind::Continue, "continue"),
            TokenKind::Discard => self.parse_bare_statement(NodeKind::Discard, "discard"),
            TokenKind::Const | TokenKind::Attribute | TokenKind::Uniform | TokenKind::Varying => {
                self.parse_local_declaration(scope)
            }
            TokenKind::Ident(_) if matches!(self.peek_ahead(1), TokenKind::Ident(_)) => {
                self.parse_local_declaration(scope)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon, "';' after the expression");
                let node = self
                    .tree
                    .add(NodeKind::ExpressionStmt, start.span_to(&self.previous_range()));
                self.tree.append_child(node, expr);
                Some(node)
            }
        }
    }

    fn parse_bare_statement(&mut self, kind: NodeKind, what: &str) -> Option<NodeId> {
        let start = self.here();
        self.advance();
        self.expect(TokenKind::Semicolon, &format!("';' after '{}'", what));
        Some(self.tree.add(kind, start))
    }

    fn parse_local_declaration(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        let mut modifier_flags = 0u32;
        loop {
            match self.peek() {
                TokenKind::Const => {
                    modifier_flags |= flags::CONST;
                    self.advance();
                }
                TokenKind::Attribute | TokenKind::Uniform | TokenKind::Varying => {
                    let range = self.here();
                    self.log
                        .error(range, "this qualifier is only allowed at global scope");
                    self.advance();
                }
                _ => break,
            }
        }
        let (ty, _) = self.parse_type_name("a type name")?;
        let group = self.parse_variable_group(scope, modifier_flags, &ty)?;
        self.tree.node_mut(group).range = start.span_to(&self.previous_range());
        Some(group)
    }

    fn parse_if(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        self.advance();
        self.expect(TokenKind::LeftParen, "'(' after 'if'");
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "')' after the condition");
        let then = self.parse_statement(scope)?;
        let node = self.tree.add(NodeKind::If, start.clone());
        self.tree.append_child(node, condition);
        self.tree.append_child(node, then);
        if self.eat(&TokenKind::Else) {
            let otherwise = self.parse_statement(scope)?;
            self.tree.append_child(node, otherwise);
        }
        self.tree.node_mut(node).range = start.span_to(&self.previous_range());
        Some(node)
    }

    fn parse_while(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        self.advance();
        self.expect(TokenKind::LeftParen, "'(' after 'while'");
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "')' after the condition");
        let body = self.parse_statement(scope)?;
        let node = self.tree.add(NodeKind::While, start.span_to(&self.previous_range()));
        self.tree.append_child(node, condition);
        self.tree.append_child(node, body);
        Some(node)
    }

    fn parse_do_while(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        self.advance();
        let body = self.parse_statement(scope)?;
        self.expect(TokenKind::While, "'while' after the 'do' body");
        self.expect(TokenKind::LeftParen, "'(' after 'while'");
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "')' after the condition");
        self.expect(TokenKind::Semicolon, "';' after 'do'/'while'");
        let node = self
            .tree
            .add(NodeKind::DoWhile, start.span_to(&self.previous_range()));
        self.tree.append_child(node, body);
        self.tree.append_child(node, condition);
        Some(node)
    }

    fn parse_for(&mut self, scope: ScopeId) -> Option<NodeId> {
        let start = self.here();
        self.advance();
        self.expect(TokenKind::LeftParen, "'(' after 'for'");
        let inner = self.symbols.push_scope(ScopeKind::Local, scope);
        let node = self.tree.add(NodeKind::For, start.clone());
        self.tree.node_mut(node).scope = Some(inner);

        // init
        let init = if self.eat(&TokenKind::Semicolon) {
            self.tree.add(NodeKind::Empty, self.previous_range())
        } else if matches!(self.peek(), TokenKind::Const)
            || (matches!(self.peek(), TokenKind::Ident(_))
                && matches!(self.peek_ahead(1), TokenKind::Ident(_)))
        {
            self.parse_local_declaration(inner)?
        } else {
            let expr = self.parse_expression()?;
            self.expect(TokenKind::Semicolon, "';' after the loop initializer");
            let stmt = self.tree.add(NodeKind::ExpressionStmt, self.previous_range());
            self.tree.append_child(stmt, expr);
            stmt
        };
        self.tree.append_child(node, init);

        // condition
        let condition = if self.eat(&TokenKind::Semicolon) {
            self.tree.add(NodeKind::Empty, self.previous_range())
        } else {
            let expr = self.parse_expression()?;
            self.expect(TokenKind::Semicolon, "';' after the loop condition");
            expr
        };
        self.tree.append_child(node, condition);

        // update
        let update = if *self.peek() == TokenKind::RightParen {
            self.tree.add(NodeKind::Empty, self.here())
        } else {
            self.parse_expression()?
        };
        self.tree.append_child(node, update);
        self.expect(TokenKind::RightParen, "')' after the loop header");

        let body = self.parse_statement(inner)?;
        self.tree.append_child(node, body);
        self.tree.node_mut(node).range = start.span_to(&self.previous_range());
        Some(node)
    }

    // ── expressions ────────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Option<NodeId> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Option<NodeId> {
        let target = self.parse_ternary()?;
        let op = match self.peek() {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Subtract,
            TokenKind::StarAssign => AssignOp::Multiply,
            TokenKind::SlashAssign => AssignOp::Divide,
            _ => return Some(target),
        };
        self.advance();
        let value = self.parse_assignment()?; // right-associative
        let range = self
            .tree
            .node(target)
            .range
            .span_to(&self.tree.node(value).range);
        let node = self.tree.add(NodeKind::Assign(op), range);
        self.tree.append_child(node, target);
        self.tree.append_child(node, value);
        Some(node)
    }

    fn parse_ternary(&mut self) -> Option<NodeId> {
        let condition = self.parse_binary(0)?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then = self.parse_assignment()?;
        self.expect(TokenKind::Colon, "':' in the conditional expression");
        let otherwise = self.parse_assignment()?;
        let range = self
            .tree
            .node(condition)
            .range
            .span_to(&self.tree.node(otherwise).range);
        let node = self.tree.add(NodeKind::Ternary, range);
        self.tree.append_child(node, condition);
        self.tree.append_child(node, then);
        self.tree.append_child(node, otherwise);
        Some(node)
    }

    /// Binary operators by precedence level, lowest first.
    fn binary_op(level: usize, kind: &TokenKind) -> Option<BinaryOp> {
        let op = match (level, kind) {
            (0, TokenKind::OrOr) => BinaryOp::Or,
            (1, TokenKind::AndAnd) => BinaryOp::And,
            (2, TokenKind::Equal) => BinaryOp::Equal,
            (2, TokenKind::NotEqual) => BinaryOp::NotEqual,
            (3, TokenKind::Less) => BinaryOp::Less,
            (3, TokenKind::LessEqual) => BinaryOp::LessEqual,
            (3, TokenKind::Greater) => BinaryOp::Greater,
            (3, TokenKind::GreaterEqual) => BinaryOp::GreaterEqual,
            (4, TokenKind::Plus) => BinaryOp::Add,
            (4, TokenKind::Minus) => BinaryOp::Subtract,
            (5, TokenKind::Star) => BinaryOp::Multiply,
            (5, TokenKind::Slash) => BinaryOp::Divide,
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, level: usize) -> Option<NodeId> {
        if level > 5 {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = Self::binary_op(level, self.peek()) {
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let range = self
                .tree
                .node(left)
                .range
                .span_to(&self.tree.node(right).range);
            let node = self.tree.add(NodeKind::Binary(op), range);
            self.tree.append_child(node, left);
            self.tree.append_child(node, right);
            left = node;
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<NodeId> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Increment => UnaryOp::PreIncrement,
            TokenKind::Decrement => UnaryOp::PreDecrement,
            _ => return self.parse_postfix(),
        };
        let start = self.here();
        self.advance();
        let operand = self.parse_unary()?;
        let range = start.span_to(&self.tree.node(operand).range);
        let node = self.tree.add(NodeKind::Unary(op), range);
        self.tree.append_child(node, operand);
        Some(node)
    }

    fn parse_postfix(&mut self) -> Option<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::LeftParen => {
                    self.advance();
                    let node = self.tree.add(NodeKind::Call, self.tree.node(expr).range.clone());
                    self.tree.append_child(node, expr);
                    if !self.eat(&TokenKind::RightParen) {
                        loop {
                            let arg = self.parse_assignment()?;
                            self.tree.append_child(node, arg);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                        self.expect(TokenKind::RightParen, "')' after the arguments");
                    }
                    self.tree.node_mut(node).range = self
                        .tree
                        .node(node)
                        .range
                        .span_to(&self.previous_range());
                    expr = node;
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket, "']' after the index");
                    let range = self
                        .tree
                        .node(expr)
                        .range
                        .span_to(&self.previous_range());
                    let node = self.tree.add(NodeKind::Index, range);
                    self.tree.append_child(node, expr);
                    self.tree.append_child(node, index);
                    expr = node;
                }
                TokenKind::Dot => {
                    self.advance();
                    let (field, field_range) = self.expect_ident("a member name after '.'")?;
                    let range = self.tree.node(expr).range.span_to(&field_range);
                    let node = self.tree.add(NodeKind::Dot(field), range);
                    self.tree.append_child(node, expr);
                    expr = node;
                }
                TokenKind::Increment | TokenKind::Decrement => {
                    let op = if *self.peek() == TokenKind::Increment {
                        PostfixOp::Increment
                    } else {
                        PostfixOp::Decrement
                    };
                    self.advance();
                    let range = self
                        .tree
                        .node(expr)
                        .range
                        .span_to(&self.previous_range());
                    let node = self.tree.add(NodeKind::Postfix(op), range);
                    self.tree.append_child(node, expr);
                    expr = node;
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Option<NodeId> {
        let range = self.here();
        let kind = match self.peek() {
            TokenKind::IntLiteral(v) => NodeKind::IntLiteral(*v),
            TokenKind::FloatLiteral(v) => NodeKind::FloatLiteral(*v),
            TokenKind::True => NodeKind::BoolLiteral(true),
            TokenKind::False => NodeKind::BoolLiteral(false),
            TokenKind::Ident(name) => NodeKind::Name(name.clone()),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "')'");
                return Some(inner);
            }
            _ => {
                self.log.error(range, "expected an expression");
                return None;
            }
        };
        self.advance();
        Some(self.tree.add(kind, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::source::Source;

    fn parse_text(text: &str) -> (Log, Tree, SymbolTable, NodeId) {
        let mut log = Log::new();
        let src = Source::new("test.glsl", text);
        let tokens = tokenize(&mut log, &src);
        let mut tree = Tree::new();
        let mut symbols = SymbolTable::new();
        let root = tree.add(NodeKind::Global, Range::new(&src, 0, text.len()));
        let mut no_includes =
            |_: &str, _: &str, _: &mut Log| -> Option<Rc<Vec<Token>>> { None };
        parse(&mut log, &tokens, &mut tree, &mut symbols, root, &mut no_includes);
        (log, tree, symbols, root)
    }

    #[test]
    fn test_global_declarations_build_symbols() {
        let (log, tree, symbols, root) = parse_text(
            "uniform vec2 resolution;\n\
             attribute vec4 position, normal;\n\
             struct Light { vec3 color; float power; };\n\
             float helper(float x) { return x; }\n",
        );
        assert!(!log.has_errors());
        assert_eq!(tree.child_count(root), 4);

        let res = symbols.find(GLOBAL_SCOPE, "resolution").unwrap();
        assert!(symbols.symbol(res).has(flags::UNIFORM));
        let normal = symbols.find(GLOBAL_SCOPE, "normal").unwrap();
        assert!(symbols.symbol(normal).has(flags::ATTRIBUTE));
        assert!(symbols.find(GLOBAL_SCOPE, "Light").is_some());
        assert!(symbols.find(GLOBAL_SCOPE, "helper").is_some());
    }

    #[test]
    fn test_forward_reference_and_prototype_merge() {
        let (log, _tree, symbols, _root) = parse_text(
            "float later(float x);\n\
             float caller() { return later(1.0); }\n\
             float later(float x) { return x + 1.0; }\n",
        );
        assert!(!log.has_errors());
        // prototype and definition share one symbol; no overload chain
        let later = symbols.find(GLOBAL_SCOPE, "later").unwrap();
        assert_eq!(symbols.overloads(later).len(), 1);
    }

    #[test]
    fn test_overload_chain_is_built() {
        let (log, _tree, symbols, _root) = parse_text(
            "float pick(float x) { return x; }\n\
             float pick(int x) { return 0.0; }\n",
        );
        assert!(!log.has_errors());
        let head = symbols.find(GLOBAL_SCOPE, "pick").unwrap();
        assert_eq!(symbols.overloads(head).len(), 2);
    }

    #[test]
    fn test_redefining_a_function_is_an_error() {
        let (log, _, _, _) = parse_text(
            "float f() { return 1.0; }\n\
             float f() { return 2.0; }\n",
        );
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_export_marks_the_symbol() {
        let (log, _tree, symbols, _root) =
            parse_text("export void vertexMain() { }\n");
        assert!(!log.has_errors());
        let sym = symbols.find(GLOBAL_SCOPE, "vertexMain").unwrap();
        assert!(symbols.symbol(sym).has(flags::EXPORTED));
    }

    #[test]
    fn test_error_recovery_parses_following_declarations() {
        let (log, _tree, symbols, _root) = parse_text(
            "float broken(;\n\
             uniform vec3 ok;\n\
             uniform vec3 9bad;\n\
             uniform vec3 ok2;\n",
        );
        assert!(log.has_errors());
        assert!(log.error_count() >= 2);
        // independent declarations after each error still land in the scope
        assert!(symbols.find(GLOBAL_SCOPE, "ok").is_some());
        assert!(symbols.find(GLOBAL_SCOPE, "ok2").is_some());
    }

    #[test]
    fn test_statement_and_expression_structure() {
        let (log, tree, _symbols, root) = parse_text(
            "void main() {\n\
                 float x = 1.0;\n\
                 for (int i = 0; i < 4; i++) { x += 2.0 * float(i); }\n\
                 if (x > 3.0) { discard; } else x = 0.0;\n\
             }\n",
        );
        assert!(!log.has_errors());
        let function = tree.child(root, 0).unwrap();
        let block = tree
            .children(function)
            .find(|&c| matches!(tree.kind(c), NodeKind::Block))
            .unwrap();
        let kinds: Vec<_> = tree.children(block).map(|c| tree.kind(c).clone()).collect();
        assert!(matches!(kinds[0], NodeKind::Variables));
        assert!(matches!(kinds[1], NodeKind::For));
        assert!(matches!(kinds[2], NodeKind::If));
    }

    #[test]
    fn test_precedence_shapes_the_tree() {
        let (log, tree, _symbols, root) = parse_text("float x = 1.0 + 2.0 * 3.0;");
        assert!(!log.has_errors());
        let group = tree.child(root, 0).unwrap();
        let var = tree.child(group, 0).unwrap();
        let init = tree.child(var, 0).unwrap();
        // '+' at the top, '*' underneath on the right
        assert!(matches!(tree.kind(init), NodeKind::Binary(BinaryOp::Add)));
        let right = tree.child(init, 1).unwrap();
        assert!(matches!(
            tree.kind(right),
            NodeKind::Binary(BinaryOp::Multiply)
        ));
    }

    #[test]
    fn test_unresolved_include_is_reported() {
        let (log, _, _, _) = parse_text("#include \"missing.glsl\"\nuniform vec2 u;");
        assert_eq!(log.error_count(), 1);
        assert!(log.diagnostics[0].message.contains("missing.glsl"));
    }

    #[test]
    fn test_duplicate_variable_gets_note() {
        let (log, _, _, _) = parse_text("uniform vec2 u;\nuniform vec3 u;");
        assert_eq!(log.error_count(), 1);
        assert!(log.diagnostics[0].note.is_some());
    }
}
