//! Nested lexical scopes, declared symbols and the shading-language types.
//!
//! Symbols live in a per-program arena; a `SymbolId` is both the stable
//! reference used by tree nodes and the monotonically increasing identity of
//! the symbol within one compile. Function symbols of the same name form a
//! singly-linked overload chain.

use std::collections::HashMap;

use crate::compiler::node::NodeId;
use crate::compiler::source::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// Built-in and user types. Overload selection compares these for equality;
/// the language has no implicit conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    /// Best-effort type assigned when resolution fails; checks involving it
    /// are skipped so one mistake produces one diagnostic.
    Error,
    Void,
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
    Struct(SymbolId),
}

impl Type {
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "void" => Type::Void,
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float" => Type::Float,
            "vec2" => Type::Vec2,
            "vec3" => Type::Vec3,
            "vec4" => Type::Vec4,
            "mat2" => Type::Mat2,
            "mat3" => Type::Mat3,
            "mat4" => Type::Mat4,
            "sampler2D" => Type::Sampler2D,
            "samplerCube" => Type::SamplerCube,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(&self, symbols: &SymbolTable) -> String {
        match self {
            Type::Error => "<error>".into(),
            Type::Void => "void".into(),
            Type::Bool => "bool".into(),
            Type::Int => "int".into(),
            Type::Float => "float".into(),
            Type::Vec2 => "vec2".into(),
            Type::Vec3 => "vec3".into(),
            Type::Vec4 => "vec4".into(),
            Type::Mat2 => "mat2".into(),
            Type::Mat3 => "mat3".into(),
            Type::Mat4 => "mat4".into(),
            Type::Sampler2D => "sampler2D".into(),
            Type::SamplerCube => "samplerCube".into(),
            Type::Struct(id) => symbols.symbol(*id).name.clone(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Float)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            Type::Error | Type::Void | Type::Bool | Type::Sampler2D | Type::SamplerCube | Type::Struct(_)
        )
    }

    pub fn vector_size(&self) -> Option<usize> {
        match self {
            Type::Vec2 => Some(2),
            Type::Vec3 => Some(3),
            Type::Vec4 => Some(4),
            _ => None,
        }
    }

    pub fn matrix_size(&self) -> Option<usize> {
        match self {
            Type::Mat2 => Some(2),
            Type::Mat3 => Some(3),
            Type::Mat4 => Some(4),
            _ => None,
        }
    }

    pub fn vector_of(size: usize) -> Type {
        match size {
            1 => Type::Float,
            2 => Type::Vec2,
            3 => Type::Vec3,
            _ => Type::Vec4,
        }
    }

    /// Components a constructor argument of this type contributes.
    pub fn component_count(&self) -> usize {
        match self {
            Type::Bool | Type::Int | Type::Float => 1,
            Type::Vec2 => 2,
            Type::Vec3 => 3,
            Type::Vec4 => 4,
            Type::Mat2 => 4,
            Type::Mat3 => 9,
            Type::Mat4 => 16,
            _ => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Variable,
    Struct,
}

/// Symbol flag bits.
pub mod flags {
    /// Declared by the injected built-in API source; never emitted.
    pub const IMPORTED: u32 = 1 << 0;
    /// Shader entry point (functions) or part of the public surface.
    pub const EXPORTED: u32 = 1 << 1;
    pub const ATTRIBUTE: u32 = 1 << 2;
    pub const UNIFORM: u32 = 1 << 3;
    pub const VARYING: u32 = 1 << 4;
    pub const CONST: u32 = 1 << 5;
}

/// Value of a `const` scalar folded during rewriting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constant {
    Bool(bool),
    Int(i32),
    Float(f32),
}

pub struct Symbol {
    /// Mutable: entry-point specialization and renaming rewrite it.
    pub name: String,
    pub kind: SymbolKind,
    pub flags: u32,
    /// Scope the symbol was declared in.
    pub scope: ScopeId,
    pub range: Range,
    /// Spelled type name from the declaration (return type for functions);
    /// resolved into `ty` by the resolver once all structs are known.
    pub declared_type: String,
    /// Resolved type; return type for functions, the type itself for structs.
    pub ty: Type,
    /// Head-to-tail overload chain for same-named functions in one scope.
    pub previous_overload: Option<SymbolId>,
    /// Declaration node (the defining one, for prototype/definition pairs).
    pub node: Option<NodeId>,
    pub constant: Option<Constant>,
}

impl Symbol {
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Local,
    Struct,
}

pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Name to most recent symbol; older function overloads hang off the
    /// symbol's `previous_overload` chain.
    pub names: HashMap<String, SymbolId>,
}

#[derive(Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

pub const GLOBAL_SCOPE: ScopeId = ScopeId(0);

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self::default();
        table.scopes.push(Scope {
            kind: ScopeKind::Global,
            parent: None,
            names: HashMap::new(),
        });
        table
    }

    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            names: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_ids(&self) -> Vec<SymbolId> {
        (0..self.symbols.len()).map(SymbolId).collect()
    }

    /// Create a symbol and bind it in `scope`, replacing any previous binding
    /// of the same name. Overload chaining and duplicate detection are the
    /// parser's decision; see `Parser::declare_*`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        kind: SymbolKind,
        range: Range,
        declared_type: impl Into<String>,
    ) -> SymbolId {
        let name = name.into();
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            name: name.clone(),
            kind,
            flags: 0,
            scope,
            range,
            declared_type: declared_type.into(),
            ty: Type::Error,
            previous_overload: None,
            node: None,
            constant: None,
        });
        self.scopes[scope.0].names.insert(name, id);
        id
    }

    /// Look up a name in this scope only.
    pub fn find_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.0].names.get(name).copied()
    }

    /// Look up a name through the lexical scope chain.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(&sym) = self.scopes[id.0].names.get(name) {
                return Some(sym);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Remove a name binding from the scope that declared it (used when the
    /// rewriter deletes a declaration).
    pub fn unbind(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.0].names.remove(name);
    }

    /// All overloads of a function symbol, most recent first.
    pub fn overloads(&self, head: SymbolId) -> Vec<SymbolId> {
        let mut out = vec![head];
        let mut current = self.symbol(head).previous_overload;
        while let Some(id) = current {
            out.push(id);
            current = self.symbol(id).previous_overload;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::source::Source;

    fn dummy_range() -> Range {
        let src = Source::new("t.glsl", "x");
        Range::new(&src, 0, 1)
    }

    #[test]
    fn test_lexical_lookup_walks_parents() {
        let mut table = SymbolTable::new();
        let outer = table.declare(
            GLOBAL_SCOPE,
            "x",
            SymbolKind::Variable,
            dummy_range(),
            "float",
        );
        let inner = table.push_scope(ScopeKind::Local, GLOBAL_SCOPE);

        assert_eq!(table.find(inner, "x"), Some(outer));
        assert_eq!(table.find_local(inner, "x"), None);

        let shadow = table.declare(inner, "x", SymbolKind::Variable, dummy_range(), "int");
        assert_eq!(table.find(inner, "x"), Some(shadow));
        assert_eq!(table.find(GLOBAL_SCOPE, "x"), Some(outer));
    }

    #[test]
    fn test_overload_chain_order() {
        let mut table = SymbolTable::new();
        let first = table.declare(
            GLOBAL_SCOPE,
            "f",
            SymbolKind::Function,
            dummy_range(),
            "float",
        );
        let second = table.declare(
            GLOBAL_SCOPE,
            "f",
            SymbolKind::Function,
            dummy_range(),
            "float",
        );
        table.symbol_mut(second).previous_overload = Some(first);

        assert_eq!(table.find(GLOBAL_SCOPE, "f"), Some(second));
        assert_eq!(table.overloads(second), vec![second, first]);
    }

    #[test]
    fn test_type_names_and_shapes() {
        let table = SymbolTable::new();
        assert_eq!(Type::from_name("vec3"), Some(Type::Vec3));
        assert_eq!(Type::Vec3.name(&table), "vec3");
        assert_eq!(Type::Vec3.vector_size(), Some(3));
        assert_eq!(Type::Mat3.matrix_size(), Some(3));
        assert_eq!(Type::Mat3.component_count(), 9);
        assert_eq!(Type::vector_of(1), Type::Float);
        assert_eq!(Type::vector_of(4), Type::Vec4);
        assert!(Type::Int.is_scalar());
        assert!(!Type::Sampler2D.is_numeric());
    }
}
