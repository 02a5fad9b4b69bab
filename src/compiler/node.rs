//! Mutable syntax tree stored in an arena.
//!
//! Nodes are addressed by stable `NodeId` indices and linked through
//! parent / first-child / last-child / sibling indices, so removing or
//! replacing a node is an O(1) re-link that never invalidates other ids.
//! Every semantically meaningful node may carry a resolved type and a bound
//! symbol.

use crate::compiler::scope::{ScopeId, SymbolId, Type};
use crate::compiler::source::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    PreIncrement,
    PreDecrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Root; children are top-level declarations and directives.
    Global,

    // Declarations. The bound symbol identifies the declared entity.
    /// Children: parameter `Variable`s, then an optional `Block` body.
    /// No body means this is a forward declaration.
    Function,
    /// Children: `Variables` groups, one per field declaration.
    Struct,
    /// One declaration statement; children are `Variable` declarators that
    /// share the written qualifier and type.
    Variables,
    /// Single declarator; optional initializer child.
    Variable,
    Extension {
        name: String,
        behavior: String,
    },

    // Statements
    Block,
    If,      // children: condition, then, [else]
    While,   // children: condition, body
    DoWhile, // children: body, condition
    For,     // children: init, condition, update, body ("Empty" when absent)
    Return,  // children: [value]
    Break,
    Continue,
    Discard,
    ExpressionStmt, // child: expression
    Empty,

    // Expressions
    Name(String),
    IntLiteral(i32),
    FloatLiteral(f32),
    BoolLiteral(bool),
    Unary(UnaryOp),
    Postfix(PostfixOp),
    Binary(BinaryOp),  // children: left, right
    Assign(AssignOp),  // children: target, value
    Ternary,           // children: condition, then, else
    Call,              // children: callee, arguments...
    Dot(String),       // child: object; field or swizzle name in payload
    Index,             // children: object, index
}

#[derive(Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
    pub parent: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    /// Assigned by the resolver.
    pub resolved_type: Option<Type>,
    /// Bound symbol: the declared entity for declarations, the referenced
    /// entity for `Name` nodes.
    pub symbol: Option<SymbolId>,
    /// Set on nodes that introduce a scope (function, block, for).
    pub scope: Option<ScopeId>,
}

#[derive(Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, range: Range) -> NodeId {
        self.nodes.push(Node {
            kind,
            range,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            resolved_type: None,
            symbol: None,
            scope: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none(), "node already attached");
        self.nodes[child.0].parent = Some(parent);
        match self.nodes[parent.0].last_child {
            Some(last) => {
                self.nodes[last.0].next_sibling = Some(child);
                self.nodes[child.0].prev_sibling = Some(last);
                self.nodes[parent.0].last_child = Some(child);
            }
            None => {
                self.nodes[parent.0].first_child = Some(child);
                self.nodes[parent.0].last_child = Some(child);
            }
        }
    }

    /// Unlink a node from its parent and siblings in O(1). The arena slot is
    /// simply abandoned; ids of other nodes stay valid.
    pub fn remove(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.0];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = next,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.0].prev_sibling = prev,
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].last_child = prev;
                }
            }
        }
        let n = &mut self.nodes[id.0];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Replace `old` with `new` in the sibling list. `new` must be detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        debug_assert!(self.nodes[new.0].parent.is_none(), "node already attached");
        let (parent, prev, next) = {
            let n = &self.nodes[old.0];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].prev_sibling = prev;
        self.nodes[new.0].next_sibling = next;
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = Some(new),
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].first_child = Some(new);
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.0].prev_sibling = Some(new),
            None => {
                if let Some(par) = parent {
                    self.nodes[par.0].last_child = Some(new);
                }
            }
        }
        let o = &mut self.nodes[old.0];
        o.parent = None;
        o.prev_sibling = None;
        o.next_sibling = None;
    }

    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            tree: self,
            next: self.nodes[id.0].first_child,
        }
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).nth(index)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Depth-first walk of a subtree, parents before children.
    pub fn visit(&self, root: NodeId, visitor: &mut impl FnMut(NodeId)) {
        visitor(root);
        let mut child = self.nodes[root.0].first_child;
        while let Some(c) = child {
            // grab the link before the callback mutates anything observable
            let next = self.nodes[c.0].next_sibling;
            self.visit(c, visitor);
            child = next;
        }
    }
}

pub struct ChildIter<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.node(id).next_sibling;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::source::{Range, Source};

    fn r() -> Range {
        let src = Source::new("t.glsl", "");
        Range::new(&src, 0, 0)
    }

    #[test]
    fn test_append_and_iterate() {
        let mut tree = Tree::new();
        let root = tree.add(NodeKind::Global, r());
        let a = tree.add(NodeKind::Break, r());
        let b = tree.add(NodeKind::Continue, r());
        let c = tree.add(NodeKind::Discard, r());
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(root, c);

        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(tree.node(b).parent, Some(root));
        assert_eq!(tree.child(root, 2), Some(c));
    }

    #[test]
    fn test_remove_relinks_neighbours() {
        let mut tree = Tree::new();
        let root = tree.add(NodeKind::Global, r());
        let a = tree.add(NodeKind::Break, r());
        let b = tree.add(NodeKind::Continue, r());
        let c = tree.add(NodeKind::Discard, r());
        for id in [a, b, c] {
            tree.append_child(root, id);
        }

        tree.remove(b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.node(a).next_sibling, Some(c));
        assert_eq!(tree.node(c).prev_sibling, Some(a));

        tree.remove(a);
        tree.remove(c);
        assert_eq!(tree.node(root).first_child, None);
        assert_eq!(tree.node(root).last_child, None);
    }

    #[test]
    fn test_replace_preserves_position() {
        let mut tree = Tree::new();
        let root = tree.add(NodeKind::Global, r());
        let a = tree.add(NodeKind::Break, r());
        let b = tree.add(NodeKind::Continue, r());
        let c = tree.add(NodeKind::Discard, r());
        for id in [a, b, c] {
            tree.append_child(root, id);
        }

        let lit = tree.add(NodeKind::IntLiteral(7), r());
        tree.replace(b, lit);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, lit, c]);
        assert_eq!(tree.node(b).parent, None);
    }
}
