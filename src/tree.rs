/// Resolved syntax trees and the frame-carrying traversal over them.
use std::path::PathBuf;

use serde::Serialize;

use crate::types::{Member, Symbol};

/// Byte range and start position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    /// One-based start column, in bytes.
    pub column: u32,
    /// End byte offset, exclusive.
    pub end: u32,
    /// One-based start line.
    pub line: u32,
    /// Start byte offset.
    pub start: u32,
}

impl Span {
    /// Span of a tree-sitter node.
    pub fn of(node: tree_sitter::Node<'_>) -> Self {
        let position = node.start_position();
        let to_u32 = |n: usize| return u32::try_from(n).unwrap_or(u32::MAX);
        return Self {
            column: to_u32(position.column).saturating_add(1),
            end: to_u32(node.end_byte()),
            line: to_u32(position.row).saturating_add(1),
            start: to_u32(node.start_byte()),
        };
    }
}

/// Node categories the extractor distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "kebab-case")]
pub enum NodeKind {
    /// A field access site.
    FieldAccess {
        /// Bound field, or the written name.
        target: Symbol,
    },
    /// One declarator of a field declaration.
    FieldDeclaration {
        /// The declared field.
        field: Member,
    },
    /// A method or constructor declaration.
    MethodDeclaration {
        /// Javadoc block tags, e.g. `@param who`.
        doc_tags: Vec<String>,
        /// The declared method.
        method: Member,
    },
    /// A method invocation site.
    MethodInvocation {
        /// Bound method, or the written name.
        target: Symbol,
    },
    /// Any other grammar node.
    Other {
        /// Grammar node kind.
        syntax: &'static str,
    },
    /// A class, interface, enum, record, annotation type or anonymous class body.
    TypeDeclaration {
        /// Binary name of the declared type.
        binary_name: String,
    },
}

impl NodeKind {
    /// Short label for tree dumps.
    pub fn label(&self) -> &str {
        return match self {
            Self::FieldAccess { .. } => "FieldAccess",
            Self::FieldDeclaration { .. } => "FieldDeclaration",
            Self::MethodDeclaration { .. } => "MethodDeclaration",
            Self::MethodInvocation { .. } => "MethodInvocation",
            Self::Other { syntax } => syntax,
            Self::TypeDeclaration { .. } => "TypeDeclaration",
        };
    }
}

/// A node of a resolved tree. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Children in source order.
    pub children: Vec<Node>,
    /// What the node is, with its binding.
    pub kind: NodeKind,
    /// Where it is.
    pub span: Span,
}

impl Node {
    /// An `Other` node.
    pub fn other(syntax: &'static str, span: Span, children: Vec<Self>) -> Self {
        return Self {
            children,
            kind: NodeKind::Other { syntax },
            span,
        };
    }
}

/// Why a file or node has a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    /// Code nested too deeply to bind; the subtree is kept as a bare node.
    Nesting,
    /// `ERROR` or missing grammar nodes.
    Syntax,
    /// The file could not be read, decoded or parsed at all.
    Unreadable,
    /// A field access did not bind.
    UnresolvedField,
    /// A method invocation did not bind.
    UnresolvedMethod,
    /// A written type name did not resolve.
    UnresolvedType,
}

/// A parse or binding problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Category.
    pub kind: ProblemKind,
    /// Human-readable description.
    pub message: String,
    /// Where.
    pub span: Span,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}:{}: {}", self.span.line, self.span.column, self.message);
    }
}

/// A documentation notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Human-readable description.
    pub message: String,
    /// Where.
    pub span: Span,
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}:{}: {}", self.span.line, self.span.column, self.message);
    }
}

/// The binding-resolved form of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTree {
    /// Documentation notices.
    pub messages: Vec<Message>,
    /// Source file.
    pub path: PathBuf,
    /// Non-fatal problems.
    pub problems: Vec<Problem>,
    /// Compilation unit.
    pub root: Node,
}

/// Outcome of parsing one file: a tree, or the problems that made it fatal.
pub type ParseResult = Result<ResolvedTree, Vec<Problem>>;

/// Traversal state at one node. A child frame is derived from its parent's
/// and dropped on the way back up, so leaving a node restores the parent frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frame<'t> {
    /// Innermost enclosing method or field declarator, if any.
    pub context: Option<&'t Member>,
    /// Nesting depth; 0 at the root.
    pub depth: usize,
}

impl<'t> Frame<'t> {
    /// Frame of `node`'s own subtree.
    pub fn enter(&self, node: &'t Node) -> Self {
        let context = match &node.kind {
            NodeKind::MethodDeclaration { method, .. } => Some(method),
            NodeKind::FieldDeclaration { field } => Some(field),
            NodeKind::TypeDeclaration { .. } => None,
            NodeKind::FieldAccess { .. } | NodeKind::MethodInvocation { .. } | NodeKind::Other { .. } => {
                self.context
            },
        };
        return Self {
            context,
            depth: self.depth.saturating_add(1),
        };
    }
}

/// Depth-first pre-order walk. `visit` sees each node with the frame of its
/// parent, i.e. the context the node itself is attributed to.
pub fn walk<'t, F>(node: &'t Node, frame: &Frame<'t>, visit: &mut F)
where
    F: FnMut(&'t Node, &Frame<'t>),
{
    visit(node, frame);
    let inner = frame.enter(node);
    for child in &node.children {
        walk(child, &inner, visit);
    }
}
