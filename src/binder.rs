/// Per-file lowering of a tree-sitter CST into a binding-resolved tree.
///
/// Expressions are typed bottom-up: locals and parameters carry their
/// declared (or `var`-inferred) types, member lookups yield field types and
/// return types, and the receiver type of each invocation or field access
/// selects the member it binds to. Anything that fails to bind is kept as
/// an unresolved symbol with a `Problem`.
use std::collections::HashMap;
use std::path::Path;

use tree_sitter::Node as TsNode;

use crate::declarations::{self, DeclaredType, FileDeclarations, compact, named_children, text};
use crate::javadoc;
use crate::symbols::{self, MemberMatch, OBJECT, Origin, TypeContext, TypeDecl, TypeLookup, TypeTable};
use crate::tree::{Message, Node, NodeKind, Problem, ProblemKind, ResolvedTree, Span};
use crate::types::{Member, Symbol};

/// Node kinds that open a scope for local variables.
const SCOPE_KINDS: &[&str] = &[
    "block",
    "catch_clause",
    "constructor_body",
    "enhanced_for_statement",
    "for_statement",
    "switch_block_statement_group",
    "switch_rule",
    "try_with_resources_statement",
];

/// Parents under which a type declaration is a member type, not a local class.
const MEMBER_TYPE_PARENTS: &[&str] = &[
    "annotation_type_body",
    "class_body",
    "enum_body_declarations",
    "interface_body",
    "program",
];

/// Longest source excerpt quoted in a syntax problem.
const SNIPPET_LEN: usize = 40;

/// Deepest syntax nesting that is lowered; deeper subtrees become bare nodes.
const MAX_NESTING: usize = 256;

/// A lowered node and the static type of the expression it denotes.
struct Lowered {
    /// The node.
    node: Node,
    /// Binary type name, if the node is a typed expression.
    ty: Option<String>,
}

impl Lowered {
    /// An untyped node.
    fn untyped(node: Node) -> Self {
        return Self { node, ty: None };
    }
}

/// What the left side of `x.m()` or `x.f` denotes.
enum Receiver {
    /// `super`.
    Super,
    /// A type name: static member access.
    Type(String),
    /// A name that resolves to nothing.
    Unknown,
    /// A value whose type could not be determined.
    Untyped,
    /// A value of this type.
    Value(String),
}

/// Binary names and counters of one enclosing type.
struct TypeFrame {
    /// Anonymous classes declared so far.
    anonymous: usize,
    /// Binary name.
    binary_name: String,
    /// Local classes declared so far, per simple name.
    local: HashMap<String, usize>,
}

/// One lexical scope of local variables.
#[derive(Default)]
struct LocalScope {
    /// `local_types` length when the scope opened.
    local_types_mark: usize,
    /// Variable name to type.
    variables: HashMap<String, Option<String>>,
}

/// The type table plus anonymous and local classes of the file being bound.
struct Overlay<'a> {
    /// Types discovered while binding.
    local: HashMap<String, TypeDecl>,
    /// Project and classpath types.
    table: &'a TypeTable,
}

impl TypeLookup for Overlay<'_> {
    fn type_decl(&self, binary_name: &str) -> Option<&TypeDecl> {
        return self.local.get(binary_name).or_else(|| self.table.type_decl(binary_name));
    }
}

/// Lowering state of one file.
struct Binder<'a> {
    /// Nesting of the node being lowered.
    depth: usize,
    /// Binary names of enclosing types, outermost first.
    enclosing: Vec<String>,
    /// First-pass declarations of this file.
    file: &'a FileDeclarations,
    /// Counters of enclosing types, parallel to `enclosing`.
    frames: Vec<TypeFrame>,
    /// Local classes in scope.
    local_types: Vec<(String, String)>,
    /// Type lookup.
    lookup: Overlay<'a>,
    /// Documentation notices.
    messages: Vec<Message>,
    /// Problems.
    problems: Vec<Problem>,
    /// Local variable scopes, innermost last.
    scopes: Vec<LocalScope>,
    /// File content.
    source: &'a str,
    /// Type parameters of enclosing declarations.
    type_variables: Vec<String>,
}

/// Lower and bind one parsed file.
pub fn bind(path: &Path, source: &str, root: TsNode<'_>, file: &FileDeclarations, table: &TypeTable) -> ResolvedTree {
    let mut binder = Binder {
        depth: 0,
        enclosing: Vec::new(),
        file,
        frames: Vec::new(),
        local_types: Vec::new(),
        lookup: Overlay {
            local: HashMap::new(),
            table,
        },
        messages: Vec::new(),
        problems: Vec::new(),
        scopes: vec![LocalScope::default()],
        source,
        type_variables: Vec::new(),
    };
    let root = binder.lower(root).node;
    tracing::trace!(
        file = %path.display(),
        problems = binder.problems.len(),
        local_types = binder.lookup.local.len(),
        "file bound"
    );
    return ResolvedTree {
        messages: binder.messages,
        path: path.to_path_buf(),
        problems: binder.problems,
        root,
    };
}

/// Whether `node` is `a`, `a.b`, `a.b.c`, ... made of plain identifiers.
fn is_name_chain(node: TsNode<'_>) -> bool {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" => return true,
            "field_access" => {
                if !current.child_by_field_name("field").is_some_and(|f| f.kind() == "identifier") {
                    return false;
                }
                let Some(object) = current.child_by_field_name("object") else {
                    return false;
                };
                current = object;
            },
            _ => return false,
        }
    }
}

/// Names declared by the `type_parameters` of a type or method declaration.
fn type_parameter_names(ts: TsNode<'_>, source: &str) -> Vec<String> {
    return named_children(ts)
        .into_iter()
        .filter(|c| c.kind() == "type_parameters")
        .flat_map(named_children)
        .filter_map(|p| named_children(p).into_iter().find(|c| c.kind() == "type_identifier"))
        .map(|n| text(n, source).to_string())
        .collect();
}

/// Leftmost identifier of a name chain.
fn chain_head(node: TsNode<'_>) -> TsNode<'_> {
    let mut current = node;
    while let Some(object) = current.child_by_field_name("object") {
        current = object;
    }
    return current;
}

impl Binder<'_> {
    // ── Dispatch ───────────────────────────────────────────────────────

    /// Lower one named node, or keep it as a bare node past `MAX_NESTING`.
    fn lower(&mut self, ts: TsNode<'_>) -> Lowered {
        if self.depth >= MAX_NESTING {
            self.problem(
                ProblemKind::Nesting,
                ts,
                format!("Code nested deeper than {MAX_NESTING} levels is not bound"),
            );
            return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), Vec::new()));
        }
        self.depth = self.depth.saturating_add(1);
        let lowered = self.lower_node(ts);
        self.depth = self.depth.saturating_sub(1);
        return lowered;
    }

    /// Lower one named node by kind.
    fn lower_node(&mut self, ts: TsNode<'_>) -> Lowered {
        if ts.is_error() {
            let excerpt: String = text(ts, self.source)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            self.problem(ProblemKind::Syntax, ts, format!("Syntax error on \"{excerpt}\""));
        } else if ts.is_missing() {
            self.problem(ProblemKind::Syntax, ts, format!("Syntax error, insert \"{}\"", ts.kind()));
        }

        let kind = ts.kind();
        if declarations::is_type_declaration(kind) {
            return self.lower_type_declaration(ts);
        }
        return match kind {
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                self.lower_method_declaration(ts)
            },
            "field_declaration" | "constant_declaration" => self.lower_field_declaration(ts),
            "local_variable_declaration" => self.lower_local_declaration(ts),
            "method_invocation" => self.lower_invocation(ts),
            "field_access" => self.lower_field_access(ts),
            "object_creation_expression" => self.lower_object_creation(ts),
            "enum_constant" => self.lower_enum_constant(ts),
            "lambda_expression" => self.lower_lambda(ts),
            "enhanced_for_statement" => self.lower_enhanced_for(ts),
            "identifier" => {
                let ty = self.variable_type(text(ts, self.source)).flatten();
                Lowered {
                    node: Node::other(kind, Span::of(ts), Vec::new()),
                    ty,
                }
            },
            "this" => Lowered {
                node: Node::other(kind, Span::of(ts), Vec::new()),
                ty: self.current_type(),
            },
            "string_literal" => Lowered {
                node: Node::other(kind, Span::of(ts), self.lower_children(ts)),
                ty: Some("java.lang.String".to_string()),
            },
            "parenthesized_expression" => {
                let mut ty = None;
                let children = self.lower_children_with(ts, |this, child| {
                    let lowered = this.lower(child);
                    ty = lowered.ty;
                    return lowered.node;
                });
                Lowered {
                    node: Node::other(kind, Span::of(ts), children),
                    ty,
                }
            },
            "cast_expression" => {
                let ty = ts.child_by_field_name("type").and_then(|t| self.resolve_written(t));
                Lowered {
                    node: Node::other(kind, Span::of(ts), self.lower_children(ts)),
                    ty,
                }
            },
            "array_access" => {
                let array = ts.child_by_field_name("array").map(|a| a.id());
                let mut ty = None;
                let children = self.lower_children_with(ts, |this, child| {
                    let lowered = this.lower(child);
                    if Some(child.id()) == array {
                        ty = lowered.ty.as_deref().and_then(symbols::element_type).map(str::to_string);
                    }
                    return lowered.node;
                });
                Lowered {
                    node: Node::other(kind, Span::of(ts), children),
                    ty,
                }
            },
            "formal_parameter" | "spread_parameter" | "catch_formal_parameter" | "resource"
            | "instanceof_expression" => {
                let lowered = self.lower_generic(ts);
                self.declare_from(ts);
                lowered
            },
            _ => self.lower_generic(ts),
        };
    }

    /// Lower a node as `Other`, opening a scope if it is a block-like node.
    fn lower_generic(&mut self, ts: TsNode<'_>) -> Lowered {
        let scoped = SCOPE_KINDS.contains(&ts.kind());
        if scoped {
            self.push_scope();
        }
        let children = self.lower_children(ts);
        if scoped {
            self.pop_scope();
        }
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// Lower all named children, reporting missing anonymous tokens.
    fn lower_children(&mut self, ts: TsNode<'_>) -> Vec<Node> {
        return self.lower_children_with(ts, |this, child| return this.lower(child).node);
    }

    /// Lower named children through `lower_child`, skipping comments and
    /// reporting missing anonymous tokens.
    fn lower_children_with<F>(&mut self, ts: TsNode<'_>, mut lower_child: F) -> Vec<Node>
    where
        F: FnMut(&mut Self, TsNode<'_>) -> Node,
    {
        let mut cursor = ts.walk();
        let children: Vec<TsNode<'_>> = ts.children(&mut cursor).collect();
        let mut lowered = Vec::with_capacity(children.len());
        for child in children {
            if !child.is_named() {
                if child.is_missing() {
                    self.problem(ProblemKind::Syntax, child, format!("Syntax error, insert \"{}\"", child.kind()));
                }
                continue;
            }
            if matches!(child.kind(), "line_comment" | "block_comment") {
                continue;
            }
            lowered.push(lower_child(self, child));
        }
        return lowered;
    }

    // ── Declarations ───────────────────────────────────────────────────

    /// Class, interface, enum, record or annotation type, member or local.
    fn lower_type_declaration(&mut self, ts: TsNode<'_>) -> Lowered {
        let name = ts
            .child_by_field_name("name")
            .map(|n| text(n, self.source))
            .unwrap_or_default();
        let is_member = ts.parent().is_none_or(|p| MEMBER_TYPE_PARENTS.contains(&p.kind()));

        let binary_name = match self.frames.last_mut() {
            None if self.file.package.is_empty() => name.to_string(),
            None => format!("{}.{name}", self.file.package),
            Some(frame) if is_member => format!("{}${name}", frame.binary_name),
            Some(frame) => {
                let count = frame.local.entry(name.to_string()).or_insert(0);
                *count = count.saturating_add(1);
                format!("{}${count}{name}", frame.binary_name)
            },
        };
        if !is_member && !self.frames.is_empty() {
            let declared = declarations::declared_type(ts, self.source, binary_name.clone(), None, self.enclosing.clone());
            self.local_types.push((name.to_string(), binary_name.clone()));
            let super_class = self.resolve_written_supertypes(&declared);
            self.register_type(&declared, super_class);
        }

        self.enter_type(&binary_name);
        let type_variables_mark = self.type_variables.len();
        self.type_variables.extend(type_parameter_names(ts, self.source));
        self.check_supertypes(ts);
        let children = self.lower_children(ts);
        self.type_variables.truncate(type_variables_mark);
        self.exit_type();

        return Lowered::untyped(Node {
            children,
            kind: NodeKind::TypeDeclaration { binary_name },
            span: Span::of(ts),
        });
    }

    /// Report written supertypes that do not resolve.
    fn check_supertypes(&mut self, ts: TsNode<'_>) {
        let implicit = matches!(ts.kind(), "enum_declaration" | "record_declaration");
        let (super_class, interfaces) = declarations::supertype_texts(ts, self.source);
        let explicit_super = if implicit { None } else { super_class };
        for written in explicit_super.iter().chain(interfaces.iter()) {
            if self.resolve_type(written).is_none() {
                let at = ts.child_by_field_name("name").unwrap_or(ts);
                self.problem(
                    ProblemKind::UnresolvedType,
                    at,
                    format!("{} cannot be resolved to a type", compact(written)),
                );
            }
        }
    }

    /// Resolve a local class's written superclass in the current context.
    fn resolve_written_supertypes(&self, declared: &DeclaredType) -> Option<String> {
        return declared.super_class.as_deref().and_then(|s| self.resolve_type(s));
    }

    /// Add a local or anonymous class to the overlay.
    fn register_type(&mut self, declared: &DeclaredType, super_class: Option<String>) {
        let scope = declared.scope();
        let context = TypeContext {
            enclosing: &scope,
            imports: &self.file.imports,
            local_types: &self.local_types,
            package: &self.file.package,
        };
        let table = self.lookup.table;
        let interfaces = declared
            .interfaces
            .iter()
            .filter_map(|i| table.resolve_type_name(i, &context))
            .collect();
        let (fields, methods) = symbols::resolve_declared_members(table, declared, &context);
        self.lookup.local.insert(
            declared.binary_name.clone(),
            TypeDecl {
                binary_name: declared.binary_name.clone(),
                fields,
                interfaces,
                methods,
                origin: Origin::Local,
                super_class,
            },
        );
    }

    /// Method, constructor or compact constructor.
    fn lower_method_declaration(&mut self, ts: TsNode<'_>) -> Lowered {
        let Some(owner) = self.current_type() else {
            return self.lower_generic(ts);
        };
        let name = match ts.kind() {
            "method_declaration" => ts
                .child_by_field_name("name")
                .map(|n| text(n, self.source).to_string())
                .unwrap_or_default(),
            _ => symbols::simple_name(&owner).to_string(),
        };
        let doc = javadoc::check(ts, self.source);
        self.messages.extend(doc.messages);

        let type_variables_mark = self.type_variables.len();
        self.type_variables.extend(type_parameter_names(ts, self.source));
        if let Some(returned) = ts.child_by_field_name("type").filter(|t| t.kind() != "void_type") {
            self.resolve_written(returned);
        }
        self.push_scope();
        let children = self.lower_children(ts);
        self.pop_scope();
        self.type_variables.truncate(type_variables_mark);

        return Lowered::untyped(Node {
            children,
            kind: NodeKind::MethodDeclaration {
                doc_tags: doc.tags,
                method: Member::method(&owner, &name),
            },
            span: Span::of(ts),
        });
    }

    /// Field declaration: each declarator becomes a `FieldDeclaration` node.
    fn lower_field_declaration(&mut self, ts: TsNode<'_>) -> Lowered {
        if let Some(type_node) = ts.child_by_field_name("type") {
            self.resolve_written(type_node);
        }
        let owner = self.current_type();
        let children = self.lower_children_with(ts, |this, child| {
            let Some(owner) = owner.as_deref().filter(|_| child.kind() == "variable_declarator") else {
                return this.lower(child).node;
            };
            let name = child
                .child_by_field_name("name")
                .map(|n| text(n, this.source))
                .unwrap_or_default();
            return Node {
                children: this.lower_children(child),
                kind: NodeKind::FieldDeclaration {
                    field: Member::field(owner, name),
                },
                span: Span::of(child),
            };
        });
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// Local variable declaration; `var` takes the initializer's type.
    fn lower_local_declaration(&mut self, ts: TsNode<'_>) -> Lowered {
        let type_node = ts.child_by_field_name("type");
        let inferred = type_node.is_none_or(|t| text(t, self.source) == "var");
        let declared = type_node.and_then(|t| self.resolve_written(t));

        let children = self.lower_children_with(ts, |this, child| {
            if child.kind() != "variable_declarator" {
                return this.lower(child).node;
            }
            let value = child.child_by_field_name("value").map(|v| v.id());
            let mut value_ty = None;
            let declarator_children = this.lower_children_with(child, |inner, grandchild| {
                let lowered = inner.lower(grandchild);
                if Some(grandchild.id()) == value {
                    value_ty = lowered.ty;
                }
                return lowered.node;
            });
            let ty = if inferred {
                value_ty
            } else {
                let dimensions = child
                    .child_by_field_name("dimensions")
                    .map_or(0, |d| text(d, this.source).matches('[').count());
                declared.as_ref().map(|d| format!("{d}{}", "[]".repeat(dimensions)))
            };
            if let Some(name) = child.child_by_field_name("name") {
                this.declare(text(name, this.source), ty);
            }
            return Node::other(child.kind(), Span::of(child), declarator_children);
        });
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// `for (T x : values)`; `var` takes the element type of an array.
    fn lower_enhanced_for(&mut self, ts: TsNode<'_>) -> Lowered {
        let type_node = ts.child_by_field_name("type");
        let inferred = type_node.is_none_or(|t| text(t, self.source) == "var");
        let declared = type_node.and_then(|t| self.resolve_written(t));
        let value = ts.child_by_field_name("value").map(|v| v.id());
        let name = ts.child_by_field_name("name").map(|n| text(n, self.source));

        self.push_scope();
        let children = self.lower_children_with(ts, |this, child| {
            let lowered = this.lower(child);
            if Some(child.id()) == value {
                let ty = if inferred {
                    lowered.ty.as_deref().and_then(symbols::element_type).map(str::to_string)
                } else {
                    declared.clone()
                };
                if let Some(name) = name {
                    this.declare(name, ty);
                }
            }
            return lowered.node;
        });
        self.pop_scope();
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// Lambda parameters without declared types are untyped locals.
    fn lower_lambda(&mut self, ts: TsNode<'_>) -> Lowered {
        self.push_scope();
        if let Some(parameters) = ts.child_by_field_name("parameters") {
            match parameters.kind() {
                "identifier" => self.declare(text(parameters, self.source), None),
                "inferred_parameters" => {
                    for parameter in named_children(parameters) {
                        self.declare(text(parameter, self.source), None);
                    }
                },
                _ => {},
            }
        }
        let children = self.lower_children(ts);
        self.pop_scope();
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// Declare the variable introduced by a parameter, resource or pattern.
    fn declare_from(&mut self, ts: TsNode<'_>) {
        let source = self.source;
        let (name, written, arrays) = match ts.kind() {
            "formal_parameter" | "resource" => {
                let arrays = ts
                    .child_by_field_name("dimensions")
                    .map_or(0, |d| text(d, source).matches('[').count());
                (ts.child_by_field_name("name"), ts.child_by_field_name("type"), arrays)
            },
            "spread_parameter" => {
                let children = named_children(ts);
                let declarator = children.iter().find(|c| c.kind() == "variable_declarator");
                let type_node = children
                    .iter()
                    .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"));
                (declarator.and_then(|d| d.child_by_field_name("name")), type_node.copied(), 1)
            },
            "catch_formal_parameter" => {
                let catch_type = named_children(ts).into_iter().find(|c| c.kind() == "catch_type");
                let single = catch_type
                    .map(named_children)
                    .filter(|alternatives| alternatives.len() == 1)
                    .and_then(|alternatives| alternatives.first().copied());
                (ts.child_by_field_name("name"), single, 0)
            },
            "instanceof_expression" => match ts.child_by_field_name("name") {
                Some(name) => (Some(name), ts.child_by_field_name("right"), 0),
                None => {
                    let pattern = ts
                        .child_by_field_name("pattern")
                        .filter(|p| p.kind() == "type_pattern")
                        .map(named_children)
                        .unwrap_or_default();
                    let name = pattern.iter().find(|c| c.kind() == "identifier").copied();
                    let type_node = pattern.iter().find(|c| c.kind() != "identifier").copied();
                    (name, type_node, 0)
                },
            },
            _ => (None, None, 0),
        };
        let Some(name) = name else {
            return;
        };
        let ty = written
            .and_then(|t| self.resolve_written(t))
            .map(|t| format!("{t}{}", "[]".repeat(arrays)));
        self.declare(text(name, source), ty);
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// `new T(...)`, with or without an anonymous class body.
    fn lower_object_creation(&mut self, ts: TsNode<'_>) -> Lowered {
        let written = ts
            .child_by_field_name("type")
            .map(|t| text(t, self.source))
            .unwrap_or_default();
        let created = self.resolve_type(written);
        if created.is_none() {
            let at = ts.child_by_field_name("type").unwrap_or(ts);
            self.problem(
                ProblemKind::UnresolvedType,
                at,
                format!("{} cannot be resolved to a type", compact(written)),
            );
        }

        let body = named_children(ts).into_iter().find(|c| c.kind() == "class_body");
        let anonymous = body.map(|b| self.declare_anonymous(b, created.clone()));
        let body_id = body.map(|b| b.id());
        let children = self.lower_children_with(ts, |this, child| {
            if let Some(binary) = anonymous.as_deref().filter(|_| Some(child.id()) == body_id) {
                return this.lower_class_body(child, binary);
            }
            return this.lower(child).node;
        });

        return Lowered {
            node: Node::other(ts.kind(), Span::of(ts), children),
            ty: anonymous.or(created),
        };
    }

    /// Enum constant; a constant with a body is an anonymous subclass of the enum.
    fn lower_enum_constant(&mut self, ts: TsNode<'_>) -> Lowered {
        let Some(body) = ts.child_by_field_name("body") else {
            return self.lower_generic(ts);
        };
        let enum_type = self.current_type();
        let binary = self.declare_anonymous(body, enum_type);
        let children = self.lower_children_with(ts, |this, child| {
            if child.id() == body.id() {
                return this.lower_class_body(child, &binary);
            }
            return this.lower(child).node;
        });
        return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
    }

    /// Name and register an anonymous class: `Outer$N`.
    fn declare_anonymous(&mut self, body: TsNode<'_>, super_class: Option<String>) -> String {
        let binary_name = match self.frames.last_mut() {
            Some(frame) => {
                frame.anonymous = frame.anonymous.saturating_add(1);
                format!("{}${}", frame.binary_name, frame.anonymous)
            },
            None => "$1".to_string(),
        };
        let mut declared = DeclaredType {
            binary_name: binary_name.clone(),
            canonical_name: None,
            enclosing: self.enclosing.clone(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            super_class: None,
        };
        declarations::body_members(body, self.source, &mut declared);
        self.register_type(&declared, super_class);
        return binary_name;
    }

    /// Body of an anonymous class, lowered as a type declaration.
    fn lower_class_body(&mut self, body: TsNode<'_>, binary_name: &str) -> Node {
        self.enter_type(binary_name);
        let children = self.lower_children(body);
        self.exit_type();
        return Node {
            children,
            kind: NodeKind::TypeDeclaration {
                binary_name: binary_name.to_string(),
            },
            span: Span::of(body),
        };
    }

    /// Method invocation, qualified or not.
    fn lower_invocation(&mut self, ts: TsNode<'_>) -> Lowered {
        let name = ts
            .child_by_field_name("name")
            .map(|n| text(n, self.source).to_string())
            .unwrap_or_default();
        let object = ts.child_by_field_name("object");
        let object_id = object.map(|o| o.id());
        let arguments = ts
            .child_by_field_name("arguments")
            .map_or(0, |a| named_children(a).len());

        let mut receiver = None;
        let children = self.lower_children_with(ts, |this, child| {
            if Some(child.id()) == object_id {
                let (node, lowered_receiver) = this.lower_receiver(child);
                receiver = Some(lowered_receiver);
                return node;
            }
            return this.lower(child).node;
        });

        let found = match &receiver {
            None => self.find_unqualified_method(&name, arguments),
            Some(Receiver::Value(t) | Receiver::Type(t)) => self.lookup.find_method(t, &name, arguments),
            Some(Receiver::Super) => self.lookup.find_method(&self.super_class(), &name, arguments),
            Some(Receiver::Unknown | Receiver::Untyped) => None,
        };
        let written = match object {
            Some(o) => format!("{}.{name}", compact(text(o, self.source))),
            None => name.clone(),
        };

        let (target, ty) = match found {
            Some(found) => (Symbol::Resolved(found.member), found.type_name),
            None => {
                let problem = match (&receiver, object) {
                    (None, _) => Some(format!(
                        "The method {name}() with {arguments} argument(s) is undefined for the type {}",
                        self.current_simple_name()
                    )),
                    (Some(Receiver::Value(t) | Receiver::Type(t)), _) => Some(format!(
                        "The method {name}() with {arguments} argument(s) is undefined for the type {}",
                        symbols::simple_name(t)
                    )),
                    (Some(Receiver::Super), _) => Some(format!(
                        "The method {name}() with {arguments} argument(s) is undefined for the supertype"
                    )),
                    (Some(Receiver::Unknown), Some(o)) => {
                        Some(format!("{} cannot be resolved", compact(text(o, self.source))))
                    },
                    (Some(Receiver::Untyped), Some(o)) => Some(format!(
                        "The method {name}() with {arguments} argument(s) cannot be bound: the type of {} is unknown",
                        compact(text(o, self.source))
                    )),
                    (Some(Receiver::Unknown | Receiver::Untyped), None) => None,
                };
                if let Some(message) = problem {
                    let at = match (&receiver, object) {
                        (Some(Receiver::Unknown), Some(o)) => o,
                        _ => ts.child_by_field_name("name").unwrap_or(ts),
                    };
                    self.problem(ProblemKind::UnresolvedMethod, at, message);
                }
                (Symbol::Unresolved { name: written }, None)
            },
        };

        return Lowered {
            node: Node {
                children,
                kind: NodeKind::MethodInvocation { target },
                span: Span::of(ts),
            },
            ty,
        };
    }

    /// `expr.field`, `Type.field`, `super.field` or `Outer.this`.
    fn lower_field_access(&mut self, ts: TsNode<'_>) -> Lowered {
        let object = ts.child_by_field_name("object");
        let field = ts.child_by_field_name("field");

        if let (Some(object), Some(field)) = (object, field) {
            if field.kind() == "this" {
                let ty = self.resolve_type(text(object, self.source));
                return Lowered {
                    node: Node::other("this", Span::of(ts), Vec::new()),
                    ty,
                };
            }
        }
        let name = field.map(|f| text(f, self.source).to_string()).unwrap_or_default();
        let object_id = object.map(|o| o.id());

        let mut receiver = Receiver::Unknown;
        let children = self.lower_children_with(ts, |this, child| {
            if Some(child.id()) == object_id {
                let (node, lowered_receiver) = this.lower_receiver(child);
                receiver = lowered_receiver;
                return node;
            }
            return Node::other(child.kind(), Span::of(child), Vec::new());
        });

        if let Receiver::Value(t) = &receiver {
            if symbols::element_type(t).is_some() && name == "length" {
                return Lowered::untyped(Node::other(ts.kind(), Span::of(ts), children));
            }
        }

        let found = match &receiver {
            Receiver::Value(t) | Receiver::Type(t) => self.lookup.find_field(t, &name),
            Receiver::Super => self.lookup.find_field(&self.super_class(), &name),
            Receiver::Unknown | Receiver::Untyped => None,
        };
        let (target, ty) = match found {
            Some(found) => (Symbol::Resolved(found.member), found.type_name),
            None => {
                let problem = match (&receiver, object) {
                    (Receiver::Value(_) | Receiver::Type(_) | Receiver::Super, _) => {
                        Some(format!("{name} cannot be resolved or is not a field"))
                    },
                    (Receiver::Unknown, Some(o)) => Some(format!("{} cannot be resolved", compact(text(o, self.source)))),
                    (Receiver::Untyped, Some(o)) => Some(format!(
                        "{name} cannot be bound: the type of {} is unknown",
                        compact(text(o, self.source))
                    )),
                    (Receiver::Unknown | Receiver::Untyped, None) => None,
                };
                if let Some(message) = problem {
                    let at = match (&receiver, object) {
                        (Receiver::Unknown, Some(o)) => o,
                        _ => field.unwrap_or(ts),
                    };
                    self.problem(ProblemKind::UnresolvedField, at, message);
                }
                let written = compact(text(ts, self.source));
                (Symbol::Unresolved { name: written }, None)
            },
        };

        return Lowered {
            node: Node {
                children,
                kind: NodeKind::FieldAccess { target },
                span: Span::of(ts),
            },
            ty,
        };
    }

    /// Lower the object of an invocation or field access. Type and package
    /// names become plain leaves, so they never produce references.
    fn lower_receiver(&mut self, ts: TsNode<'_>) -> (Node, Receiver) {
        let span = Span::of(ts);
        match ts.kind() {
            "super" => return (Node::other("super", span, Vec::new()), Receiver::Super),
            "identifier" | "field_access" if is_name_chain(ts) => {
                let head = text(chain_head(ts), self.source);
                if self.variable_type(head).is_none() {
                    let written = compact(text(ts, self.source));
                    if let Some(type_name) = self.resolve_type(&written) {
                        return (Node::other("type_name", span, Vec::new()), Receiver::Type(type_name));
                    }
                    if self.lookup.table.has_package(&written) {
                        return (Node::other("package_name", span, Vec::new()), Receiver::Untyped);
                    }
                    if ts.kind() == "identifier" {
                        return (Node::other("identifier", span, Vec::new()), Receiver::Unknown);
                    }
                }
            },
            _ => {},
        }
        let lowered = self.lower(ts);
        let receiver = lowered.ty.map_or(Receiver::Untyped, Receiver::Value);
        return (lowered.node, receiver);
    }

    // ── Lookup ─────────────────────────────────────────────────────────

    /// Unqualified call: enclosing types innermost first, then static imports.
    fn find_unqualified_method(&self, name: &str, arguments: usize) -> Option<MemberMatch> {
        for owner in self.enclosing.iter().rev() {
            if let Some(found) = self.lookup.find_method(owner, name, arguments) {
                return Some(found);
            }
        }
        return self
            .static_import_owners(name)
            .iter()
            .find_map(|owner| self.lookup.find_method(owner, name, arguments));
    }

    /// Unqualified field: enclosing types innermost first, then static imports.
    fn find_unqualified_field(&self, name: &str) -> Option<MemberMatch> {
        for owner in self.enclosing.iter().rev() {
            if let Some(found) = self.lookup.find_field(owner, name) {
                return Some(found);
            }
        }
        return self
            .static_import_owners(name)
            .iter()
            .find_map(|owner| self.lookup.find_field(owner, name));
    }

    /// Binary names of types whose static member `name` is imported.
    fn static_import_owners(&self, name: &str) -> Vec<String> {
        let imports = &self.file.imports;
        let single = imports
            .static_single
            .iter()
            .filter_map(|i| i.rsplit_once('.'))
            .filter(|(_, member)| *member == name)
            .map(|(owner, _)| owner);
        let on_demand = imports.static_on_demand.iter().map(String::as_str);
        return single
            .chain(on_demand)
            .filter_map(|owner| self.lookup.table.binary_for_canonical(owner))
            .map(str::to_string)
            .collect();
    }

    /// Type of a variable: `Some(None)` for a known variable of unknown type,
    /// `None` when no local, parameter or field has this name.
    fn variable_type(&self, name: &str) -> Option<Option<String>> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.variables.get(name) {
                return Some(ty.clone());
            }
        }
        return self.find_unqualified_field(name).map(|found| found.type_name);
    }

    /// Resolve a written type at the current position.
    fn resolve_type(&self, written: &str) -> Option<String> {
        let context = TypeContext {
            enclosing: &self.enclosing,
            imports: &self.file.imports,
            local_types: &self.local_types,
            package: &self.file.package,
        };
        return self.lookup.table.resolve_type_name(written, &context);
    }

    /// Resolve the type written at `type_node`, recording a problem when it
    /// names a class that does not exist. Primitives, `var` and type
    /// variables resolve to `None` silently.
    fn resolve_written(&mut self, type_node: TsNode<'_>) -> Option<String> {
        let written = text(type_node, self.source);
        let resolved = self.resolve_type(written);
        if resolved.is_none() {
            let base = symbols::base_name(written);
            let head = base.split('.').next().unwrap_or_default();
            let silent = base.is_empty()
                || symbols::PRIMITIVES.contains(&base.as_str())
                || self.type_variables.iter().any(|v| v == head);
            if !silent {
                self.problem(
                    ProblemKind::UnresolvedType,
                    type_node,
                    format!("{base} cannot be resolved to a type"),
                );
            }
        }
        return resolved;
    }

    /// Innermost enclosing type.
    fn current_type(&self) -> Option<String> {
        return self.enclosing.last().cloned();
    }

    /// Simple name of the innermost enclosing type, for messages.
    fn current_simple_name(&self) -> String {
        return self
            .enclosing
            .last()
            .map_or_else(String::new, |t| symbols::simple_name(t).to_string());
    }

    /// Superclass of the innermost enclosing type.
    fn super_class(&self) -> String {
        return self
            .enclosing
            .last()
            .and_then(|t| self.lookup.type_decl(t))
            .and_then(|d| d.super_class.clone())
            .unwrap_or_else(|| OBJECT.to_string());
    }

    // ── State ──────────────────────────────────────────────────────────

    /// Enter a type body.
    fn enter_type(&mut self, binary_name: &str) {
        self.enclosing.push(binary_name.to_string());
        self.frames.push(TypeFrame {
            anonymous: 0,
            binary_name: binary_name.to_string(),
            local: HashMap::new(),
        });
    }

    /// Leave a type body.
    fn exit_type(&mut self) {
        self.enclosing.pop();
        self.frames.pop();
    }

    /// Open a variable scope.
    fn push_scope(&mut self) {
        self.scopes.push(LocalScope {
            local_types_mark: self.local_types.len(),
            variables: HashMap::new(),
        });
    }

    /// Close the innermost variable scope, forgetting its local classes.
    fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.local_types.truncate(scope.local_types_mark);
        }
    }

    /// Declare a variable in the innermost scope.
    fn declare(&mut self, name: &str, ty: Option<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.to_string(), ty);
        }
    }

    /// Record a problem at `at`.
    fn problem(&mut self, kind: ProblemKind, at: TsNode<'_>, message: String) {
        self.problems.push(Problem {
            kind,
            message,
            span: Span::of(at),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::extractor;
    use crate::parser;
    use crate::tree::{Frame, walk};
    use crate::types::Context;

    fn bind_one(path: &str, source: &str, others: &[(&str, &str)]) -> ResolvedTree {
        let mut sources = vec![(PathBuf::from(path), Ok(source.to_string()))];
        sources.extend(
            others
                .iter()
                .map(|(p, s)| (PathBuf::from(p), Ok(s.to_string()))),
        );
        let mut results = parser::bind_sources(sources, Vec::new());
        results.remove(Path::new(path)).unwrap().unwrap()
    }

    fn targets(tree: &ResolvedTree) -> Vec<String> {
        extractor::extract(tree)
            .iter()
            .map(|e| e.referenced.to_string())
            .collect()
    }

    #[test]
    fn unresolved_names_are_problems() {
        let tree = bind_one(
            "A.java",
            "class A extends Nowhere {\n  void m() {\n    Missing.call();\n    undefined();\n  }\n}\n",
            &[],
        );
        let kinds: Vec<ProblemKind> = tree.problems.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ProblemKind::UnresolvedType,
                ProblemKind::UnresolvedMethod,
                ProblemKind::UnresolvedMethod,
            ]
        );
        assert_eq!(tree.problems[0].message, "Nowhere cannot be resolved to a type");
        assert_eq!(tree.problems[1].message, "Missing cannot be resolved");
        assert_eq!(targets(&tree), vec!["unresolved(Missing.call)", "unresolved(undefined)"]);
    }

    #[test]
    fn local_classes_get_numbered_binary_names() {
        let tree = bind_one(
            "p/A.java",
            "package p;\nclass A {\n  void m() {\n    class Local {\n      void go() {}\n    }\n    new Local().go();\n  }\n}\n",
            &[],
        );
        assert_eq!(targets(&tree), vec!["p.A$1Local::go"]);
        assert!(tree.problems.is_empty());
    }

    #[test]
    fn static_imports_and_qualified_names() {
        let tree = bind_one(
            "app/A.java",
            "package app;\nimport static lib.Util.twice;\nimport lib.*;\nclass A {\n  int m() {\n    lib.Util.reset();\n    return twice(Util.LIMIT);\n  }\n}\n",
            &[(
                "lib/Util.java",
                "package lib;\npublic class Util {\n  public static final int LIMIT = 3;\n  public static int twice(int x) { return x; }\n  public static void reset() {}\n}\n",
            )],
        );
        assert_eq!(
            targets(&tree),
            vec!["lib.Util::reset", "lib.Util::twice", "lib.Util::LIMIT"]
        );
    }

    #[test]
    fn nested_types_and_qualified_this() {
        let tree = bind_one(
            "A.java",
            "class A {\n  int n;\n  class Inner {\n    int n;\n    int m() { return A.this.n + this.n; }\n  }\n}\n",
            &[],
        );
        let edges = extractor::extract(&tree);
        let rendered: Vec<String> = edges.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["A$Inner::m -> A::n", "A$Inner::m -> A$Inner::n"]);
    }

    #[test]
    fn enum_constant_bodies_and_lambdas() {
        let tree = bind_one(
            "E.java",
            "enum E {\n  ONE {\n    void run() { helper(); }\n  };\n  static void helper() {}\n  void each(java.util.List<E> xs) {\n    xs.forEach(x -> x.helper());\n  }\n}\n",
            &[],
        );
        let edges = extractor::extract(&tree);
        assert_eq!(edges[0].to_string(), "E$1::run -> E::helper");
        assert!(matches!(edges[0].context, Context::Member(_)));
        assert_eq!(edges[1].referenced.to_string(), "unresolved(xs.forEach)");
        assert_eq!(edges[2].referenced.to_string(), "unresolved(x.helper)");
        let messages: Vec<&str> = tree.problems.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "java.util.List cannot be resolved to a type",
                "The method helper() with 0 argument(s) cannot be bound: the type of x is unknown",
                "The method forEach() with 1 argument(s) cannot be bound: the type of xs is unknown",
            ]
        );
    }

    #[test]
    fn unresolved_written_types_are_problems() {
        let tree = bind_one(
            "A.java",
            "import java.util.List;
class A<T> {
  Gone field;
  <U> Missing<U> m(List<String> xs, T t, U u, int n) {
    Absent local = null;
    var v = (Other) t;
    return null;
  }
}
",
            &[],
        );
        let problems: Vec<String> = tree.problems.iter().map(ToString::to_string).collect();
        assert_eq!(
            problems,
            vec![
                "3:3: Gone cannot be resolved to a type",
                "4:7: Missing cannot be resolved to a type",
                "4:20: List cannot be resolved to a type",
                "5:5: Absent cannot be resolved to a type",
                "6:14: Other cannot be resolved to a type",
            ]
        );
        assert!(tree.problems.iter().all(|p| p.kind == ProblemKind::UnresolvedType));
    }

    #[test]
    fn untyped_field_receivers_are_problems() {
        let tree = bind_one(
            "A.java",
            "class A {
  int m(Gone g) {
    return g.size;
  }
}
",
            &[],
        );
        assert_eq!(targets(&tree), vec!["unresolved(g.size)"]);
        assert_eq!(tree.problems.len(), 2);
        assert_eq!(tree.problems[1].kind, ProblemKind::UnresolvedField);
        assert_eq!(tree.problems[1].message, "size cannot be bound: the type of g is unknown");
    }

    #[test]
    fn deep_nesting_degrades_to_a_problem() {
        let terms = ["\"a\""; 10_000].join(" + ");
        let source = format!("class A {{
  String s = {terms};
  void m() {{ B.run(); }}
}}
");
        let tree = bind_one("A.java", &source, &[("B.java", "class B { static void run() {} }")]);
        let nesting: Vec<&Problem> = tree.problems.iter().filter(|p| p.kind == ProblemKind::Nesting).collect();
        assert!(!nesting.is_empty());
        assert!(nesting.iter().all(|p| p.span.line == 2));
        assert_eq!(targets(&tree), vec!["B::run"]);

        let mut deepest = 0;
        walk(&tree.root, &Frame::default(), &mut |_, frame| deepest = deepest.max(frame.depth));
        assert!(deepest <= MAX_NESTING, "{deepest}");
    }

    #[test]
    fn method_declarations_carry_doc_tags_and_messages() {
        let tree = bind_one(
            "A.java",
            "class A {\n  /**\n   * @param who name\n   * @param extra nothing\n   */\n  void run(String who) {}\n}\n",
            &[],
        );
        assert_eq!(tree.messages.len(), 1);
        assert_eq!(tree.messages[0].message, "Javadoc: Parameter extra is not declared");
        let class = &tree.root.children[0];
        let method = class
            .children
            .iter()
            .flat_map(|c| c.children.iter())
            .find(|n| matches!(n.kind, NodeKind::MethodDeclaration { .. }))
            .unwrap();
        let NodeKind::MethodDeclaration { doc_tags, method } = &method.kind else {
            unreachable!();
        };
        assert_eq!(doc_tags, &vec!["@param who".to_string(), "@param extra".to_string()]);
        assert_eq!(method, &Member::method("A", "run"));
    }
}
