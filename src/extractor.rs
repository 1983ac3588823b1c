/// Reference-edge extraction from resolved trees.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::tree::{self, Frame, NodeKind, ParseResult, ResolvedTree};
use crate::types::{Context, ReferenceEdge, ReferenceKind, SourceLocation};

/// Edges of one tree, in source (pre-order) order.
pub fn extract(tree: &ResolvedTree) -> Vec<ReferenceEdge> {
    let mut edges = Vec::new();
    tree::walk(&tree.root, &Frame::default(), &mut |node, frame| {
        let (kind, target) = match &node.kind {
            NodeKind::FieldAccess { target } => (ReferenceKind::FieldAccess, target),
            NodeKind::MethodInvocation { target } => (ReferenceKind::MethodCall, target),
            NodeKind::FieldDeclaration { .. }
            | NodeKind::MethodDeclaration { .. }
            | NodeKind::Other { .. }
            | NodeKind::TypeDeclaration { .. } => return,
        };
        edges.push(ReferenceEdge {
            context: frame.context.map_or(Context::Outside, |m| return Context::Member(m.clone())),
            kind,
            location: location(&tree.path, node.span),
            referenced: target.clone(),
        });
    });
    return edges;
}

/// Edges of every successfully parsed file, files in path order.
pub fn extract_all(results: &BTreeMap<PathBuf, ParseResult>) -> Vec<ReferenceEdge> {
    return results.values().flatten().flat_map(extract).collect();
}

/// Where an edge occurs.
fn location(file: &Path, span: tree::Span) -> SourceLocation {
    return SourceLocation {
        column: span.column,
        file: file.to_path_buf(),
        line: span.line,
        offset: span.start,
    };
}
