/// First pass over Java sources: package, imports, declared types and their members.
use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::symbols::TypeContext;

/// Node kinds that declare a named type.
pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "annotation_type_declaration",
    "class_declaration",
    "enum_declaration",
    "interface_declaration",
    "record_declaration",
];

/// Import declarations of a file, names as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    /// `import a.b.*;` as `a.b`.
    pub on_demand: Vec<String>,
    /// `import a.b.C;` as `a.b.C`.
    pub single: Vec<String>,
    /// `import static a.b.C.*;` as `a.b.C`.
    pub static_on_demand: Vec<String>,
    /// `import static a.b.C.m;` as `a.b.C.m`.
    pub static_single: Vec<String>,
}

/// A field as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredField {
    /// Field name.
    pub name: String,
    /// Type text including any declarator dimensions.
    pub type_text: String,
}

/// A method as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMethod {
    /// Parameter count, receiver parameter excluded.
    pub arity: usize,
    /// Method name.
    pub name: String,
    /// Return type text; `None` for `void`.
    pub return_text: Option<String>,
    /// Ends in a `...` parameter.
    pub varargs: bool,
}

/// A type declared in source, members still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    /// `com.acme.Outer$Inner`.
    pub binary_name: String,
    /// `com.acme.Outer.Inner`; `None` for local classes.
    pub canonical_name: Option<String>,
    /// Binary names of enclosing types, outermost first.
    pub enclosing: Vec<String>,
    /// Fields and enum constants.
    pub fields: Vec<DeclaredField>,
    /// Written interface types.
    pub interfaces: Vec<String>,
    /// Methods, including record accessors and enum built-ins.
    pub methods: Vec<DeclaredMethod>,
    /// Written superclass type.
    pub super_class: Option<String>,
}

impl DeclaredType {
    /// The enclosing chain plus the type itself, for resolving names inside it.
    pub fn scope(&self) -> Vec<String> {
        let mut scope = self.enclosing.clone();
        scope.push(self.binary_name.clone());
        return scope;
    }
}

/// Everything the first pass learns about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDeclarations {
    /// Imports.
    pub imports: Imports,
    /// Package; empty for the default package.
    pub package: String,
    /// Source file.
    pub path: PathBuf,
    /// Declared types, outer before nested, in source order.
    pub types: Vec<DeclaredType>,
}

impl FileDeclarations {
    /// Name resolution context at a point nested in `enclosing`.
    pub fn context<'a>(&'a self, enclosing: &'a [String]) -> TypeContext<'a> {
        return TypeContext {
            enclosing,
            imports: &self.imports,
            local_types: &[],
            package: &self.package,
        };
    }
}

/// Text of a node, empty if the range is not valid UTF-8.
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    return node.utf8_text(source.as_bytes()).unwrap_or("");
}

/// Named children, comments dropped.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    return node
        .named_children(&mut cursor)
        .filter(|c| !matches!(c.kind(), "line_comment" | "block_comment"))
        .collect();
}

/// Whether a node kind declares a named type.
pub fn is_type_declaration(kind: &str) -> bool {
    return TYPE_DECLARATION_KINDS.contains(&kind);
}

/// Collect the declarations of a parsed file.
pub fn collect(path: &Path, root: Node<'_>, source: &str) -> FileDeclarations {
    let package = collect_package(root, source);
    let imports = collect_imports(root, source);
    let mut types = Vec::new();

    for node in named_children(root) {
        if !is_type_declaration(node.kind()) {
            continue;
        }
        let Some(name) = node.child_by_field_name("name").map(|n| text(n, source)) else {
            continue;
        };
        let binary = if package.is_empty() {
            name.to_string()
        } else {
            format!("{package}.{name}")
        };
        collect_type(node, source, binary.clone(), Some(binary), Vec::new(), &mut types);
    }

    return FileDeclarations {
        imports,
        package,
        path: path.to_path_buf(),
        types,
    };
}

/// `package a.b;` as `a.b`.
fn collect_package(root: Node<'_>, source: &str) -> String {
    for node in named_children(root) {
        if node.kind() != "package_declaration" {
            continue;
        }
        let name = named_children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"));
        if let Some(name) = name {
            return compact(text(name, source));
        }
    }
    return String::new();
}

/// All import declarations of a file.
fn collect_imports(root: Node<'_>, source: &str) -> Imports {
    let mut imports = Imports::default();
    for node in named_children(root) {
        if node.kind() != "import_declaration" {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let is_static = children.iter().any(|c| c.kind() == "static");
        let on_demand = children.iter().any(|c| c.kind() == "asterisk");
        let Some(name) = children
            .iter()
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
            .map(|n| compact(text(*n, source)))
        else {
            continue;
        };
        let list = match (is_static, on_demand) {
            (false, false) => &mut imports.single,
            (false, true) => &mut imports.on_demand,
            (true, false) => &mut imports.static_single,
            (true, true) => &mut imports.static_on_demand,
        };
        list.push(name);
    }
    return imports;
}

/// A dotted name with whitespace and line breaks dropped.
pub fn compact(written: &str) -> String {
    return written.chars().filter(|c| !c.is_whitespace()).collect();
}

/// Collect a type and, recursively, its member types.
fn collect_type(
    node: Node<'_>,
    source: &str,
    binary_name: String,
    canonical_name: Option<String>,
    enclosing: Vec<String>,
    out: &mut Vec<DeclaredType>,
) {
    let declared = declared_type(node, source, binary_name, canonical_name, enclosing);
    let nested_enclosing = declared.scope();
    let outer_binary = declared.binary_name.clone();
    let outer_canonical = declared.canonical_name.clone();
    out.push(declared);

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    for member in member_nodes(body) {
        if !is_type_declaration(member.kind()) {
            continue;
        }
        let Some(name) = member.child_by_field_name("name").map(|n| text(n, source)) else {
            continue;
        };
        collect_type(
            member,
            source,
            format!("{outer_binary}${name}"),
            outer_canonical.as_ref().map(|c| format!("{c}.{name}")),
            nested_enclosing.clone(),
            out,
        );
    }
}

/// Declarations directly inside a type body. Enum bodies contribute the
/// members of their `enum_body_declarations` section.
pub fn member_nodes(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    return members;
}

/// Shell of a type declaration node: supertypes and members, nested types excluded.
pub fn declared_type(
    node: Node<'_>,
    source: &str,
    binary_name: String,
    canonical_name: Option<String>,
    enclosing: Vec<String>,
) -> DeclaredType {
    let (super_class, interfaces) = supertype_texts(node, source);
    let mut declared = DeclaredType {
        binary_name,
        canonical_name,
        enclosing,
        fields: Vec::new(),
        interfaces,
        methods: Vec::new(),
        super_class,
    };
    let name = node.child_by_field_name("name").map(|n| text(n, source)).unwrap_or_default();

    match node.kind() {
        "record_declaration" => {
            if let Some(parameters) = node.child_by_field_name("parameters") {
                for component in named_children(parameters) {
                    let (Some(type_node), Some(name_node)) =
                        (component.child_by_field_name("type"), component.child_by_field_name("name"))
                    else {
                        continue;
                    };
                    let component_name = text(name_node, source).to_string();
                    let type_text = text(type_node, source).to_string();
                    declared.methods.push(DeclaredMethod {
                        arity: 0,
                        name: component_name.clone(),
                        return_text: Some(type_text.clone()),
                        varargs: false,
                    });
                    declared.fields.push(DeclaredField {
                        name: component_name,
                        type_text,
                    });
                }
            }
        },
        "enum_declaration" => {
            declared.methods.push(DeclaredMethod {
                arity: 0,
                name: "values".to_string(),
                return_text: Some(format!("{name}[]")),
                varargs: false,
            });
            declared.methods.push(DeclaredMethod {
                arity: 1,
                name: "valueOf".to_string(),
                return_text: Some(name.to_string()),
                varargs: false,
            });
            if let Some(body) = node.child_by_field_name("body") {
                for constant in named_children(body).into_iter().filter(|c| c.kind() == "enum_constant") {
                    if let Some(constant_name) = constant.child_by_field_name("name") {
                        declared.fields.push(DeclaredField {
                            name: text(constant_name, source).to_string(),
                            type_text: name.to_string(),
                        });
                    }
                }
            }
        },
        _ => {},
    }

    if let Some(body) = node.child_by_field_name("body") {
        body_members(body, source, &mut declared);
    }
    return declared;
}

/// Written supertypes of a type declaration: `(extends, implements)`.
/// Interfaces report their `extends` list as interfaces. Enums extend `java.lang.Enum`.
pub fn supertype_texts(node: Node<'_>, source: &str) -> (Option<String>, Vec<String>) {
    let mut super_class = None;
    let mut interfaces = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "superclass" => {
                super_class = named_children(child).first().map(|t| text(*t, source).to_string());
            },
            "super_interfaces" | "extends_interfaces" => {
                for list in named_children(child).into_iter().filter(|c| c.kind() == "type_list") {
                    interfaces.extend(named_children(list).into_iter().map(|t| text(t, source).to_string()));
                }
            },
            _ => {},
        }
    }
    match node.kind() {
        "enum_declaration" => super_class = Some("java.lang.Enum".to_string()),
        "record_declaration" => super_class = Some("java.lang.Record".to_string()),
        _ => {},
    }
    return (super_class, interfaces);
}

/// Fields and methods declared directly in a body node.
pub fn body_members(body: Node<'_>, source: &str, declared: &mut DeclaredType) {
    for member in member_nodes(body) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                let Some(type_node) = member.child_by_field_name("type") else {
                    continue;
                };
                let type_text = text(type_node, source);
                let mut cursor = member.walk();
                for declarator in member.children_by_field_name("declarator", &mut cursor) {
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let extra = declarator
                        .child_by_field_name("dimensions")
                        .map(|d| "[]".repeat(text(d, source).matches('[').count()))
                        .unwrap_or_default();
                    declared.fields.push(DeclaredField {
                        name: text(name, source).to_string(),
                        type_text: format!("{type_text}{extra}"),
                    });
                }
            },
            "method_declaration" => {
                let Some(name) = member.child_by_field_name("name") else {
                    continue;
                };
                let (arity, varargs) = member
                    .child_by_field_name("parameters")
                    .map_or((0, false), parameter_shape);
                let return_text = member
                    .child_by_field_name("type")
                    .filter(|t| t.kind() != "void_type")
                    .map(|t| text(t, source).to_string());
                declared.methods.push(DeclaredMethod {
                    arity,
                    name: text(name, source).to_string(),
                    return_text,
                    varargs,
                });
            },
            "annotation_type_element_declaration" => {
                let (Some(name), Some(type_node)) =
                    (member.child_by_field_name("name"), member.child_by_field_name("type"))
                else {
                    continue;
                };
                declared.methods.push(DeclaredMethod {
                    arity: 0,
                    name: text(name, source).to_string(),
                    return_text: Some(text(type_node, source).to_string()),
                    varargs: false,
                });
            },
            _ => {},
        }
    }
}

/// Parameter count and varargs flag of a `formal_parameters` node.
pub fn parameter_shape(parameters: Node<'_>) -> (usize, bool) {
    let mut arity = 0_usize;
    let mut varargs = false;
    for parameter in named_children(parameters) {
        match parameter.kind() {
            "formal_parameter" => arity = arity.saturating_add(1),
            "spread_parameter" => {
                arity = arity.saturating_add(1);
                varargs = true;
            },
            _ => {},
        }
    }
    return (arity, varargs);
}

/// Parameter names of a `formal_parameters` node, in order.
pub fn parameter_names<'s>(parameters: Node<'_>, source: &'s str) -> Vec<&'s str> {
    let mut names = Vec::new();
    for parameter in named_children(parameters) {
        let name = match parameter.kind() {
            "formal_parameter" => parameter.child_by_field_name("name"),
            "spread_parameter" => named_children(parameter)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")
                .and_then(|d| d.child_by_field_name("name")),
            _ => None,
        };
        if let Some(name) = name {
            names.push(text(name, source));
        }
    }
    return names;
}
