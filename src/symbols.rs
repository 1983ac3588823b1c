/// Type table: declarations of every visible type, name resolution and member lookup.
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::declarations::{DeclaredType, FileDeclarations, Imports};
use crate::types::Member;

/// Root of every class hierarchy.
pub const OBJECT: &str = "java.lang.Object";

/// Primitive and pseudo type keywords that never name a declared type.
pub const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "double", "float", "int", "long", "short", "void", "var",
];

/// Where a declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A class file inside this classpath entry.
    Classpath(
        /// Jar or class directory.
        PathBuf,
    ),
    /// A project source file.
    Source(
        /// The `.java` file.
        PathBuf,
    ),
    /// An anonymous or local class found while binding.
    Local,
}

/// A field with its resolved type, arrays suffixed with `[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Binary type name, `None` for primitives and unresolvable types.
    pub type_name: Option<String>,
}

/// A method with its arity and resolved return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Number of declared parameters.
    pub arity: usize,
    /// Method name.
    pub name: String,
    /// Binary return type name, `None` for void, primitives, unresolvable types.
    pub return_type: Option<String>,
    /// Last parameter is variadic.
    pub varargs: bool,
}

impl MethodDecl {
    /// Whether a call with `arguments` arguments can bind to this method.
    fn accepts(&self, arguments: usize, allow_varargs: bool) -> bool {
        if self.arity == arguments {
            return true;
        }
        return allow_varargs && self.varargs && arguments >= self.arity.saturating_sub(1);
    }
}

/// Declaration of one type, keyed by binary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// `com.acme.Outer$Inner`.
    pub binary_name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDecl>,
    /// Directly implemented or extended interfaces.
    pub interfaces: Vec<String>,
    /// Methods in declaration order.
    pub methods: Vec<MethodDecl>,
    /// Where it came from.
    pub origin: Origin,
    /// Superclass; `None` for `java.lang.Object`, interfaces, or unresolvable.
    pub super_class: Option<String>,
}

impl TypeDecl {
    /// An empty declaration.
    pub fn empty(binary_name: &str, origin: Origin) -> Self {
        return Self {
            binary_name: binary_name.to_string(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            origin,
            super_class: None,
        };
    }
}

/// A member found by lookup, with the type of the expression it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMatch {
    /// The member, attributed to the type that declares it.
    pub member: Member,
    /// Field type or method return type.
    pub type_name: Option<String>,
}

/// Strip one array dimension.
pub fn element_type(type_name: &str) -> Option<&str> {
    return type_name.strip_suffix("[]");
}

/// Simple name of a binary name: after the last `.` and `$`.
pub fn simple_name(binary_name: &str) -> &str {
    let after_dot = binary_name.rsplit('.').next().unwrap_or(binary_name);
    return after_dot.rsplit('$').next().unwrap_or(after_dot);
}

/// Canonical name of a classpath binary name. `None` for anonymous and local classes.
pub fn canonical_name(binary_name: &str) -> Option<String> {
    let local_or_anonymous = binary_name
        .split('$')
        .skip(1)
        .any(|segment| segment.starts_with(|c: char| c.is_ascii_digit()));
    if local_or_anonymous {
        return None;
    }
    return Some(binary_name.replace('$', "."));
}

/// Package of a binary name.
pub fn package_of(binary_name: &str) -> &str {
    return binary_name.rsplit_once('.').map_or("", |(package, _)| package);
}

/// Hierarchy-aware member lookup over some set of type declarations.
pub trait TypeLookup {
    /// Declaration of a type by binary name.
    fn type_decl(&self, binary_name: &str) -> Option<&TypeDecl>;

    /// `type_name` followed by its supertypes, breadth-first (superclass before
    /// interfaces), ending with `java.lang.Object`. Arrays behave as `Object`.
    fn supertypes(&self, type_name: &str) -> Vec<String> {
        let start = if element_type(type_name).is_some() { OBJECT } else { type_name };
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(decl) = self.type_decl(&current) {
                queue.extend(decl.super_class.iter().cloned());
                queue.extend(decl.interfaces.iter().cloned());
            }
            order.push(current);
        }
        if !visited.contains(OBJECT) {
            order.push(OBJECT.to_string());
        }
        return order;
    }

    /// Find a method callable on `type_name` with `arguments` arguments.
    /// Exact arity first, in declaration order, nearest type first; varargs
    /// candidates only when nothing matches exactly.
    fn find_method(&self, type_name: &str, name: &str, arguments: usize) -> Option<MemberMatch> {
        let chain = self.supertypes(type_name);
        for allow_varargs in [false, true] {
            for current in &chain {
                let Some(decl) = self.type_decl(current) else {
                    continue;
                };
                let found = decl
                    .methods
                    .iter()
                    .find(|m| m.name == name && m.accepts(arguments, allow_varargs));
                if let Some(method) = found {
                    return Some(MemberMatch {
                        member: Member::method(&decl.binary_name, name),
                        type_name: method.return_type.clone(),
                    });
                }
            }
        }
        return None;
    }

    /// Find a field visible on `type_name`, nearest declaration first.
    fn find_field(&self, type_name: &str, name: &str) -> Option<MemberMatch> {
        for current in self.supertypes(type_name) {
            let Some(decl) = self.type_decl(&current) else {
                continue;
            };
            if let Some(field) = decl.fields.iter().find(|f| f.name == name) {
                return Some(MemberMatch {
                    member: Member::field(&decl.binary_name, name),
                    type_name: field.type_name.clone(),
                });
            }
        }
        return None;
    }
}

/// Everything needed to resolve a type name written at some point in a file.
#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    /// Binary names of enclosing types, outermost first, innermost last.
    pub enclosing: &'a [String],
    /// The file's imports.
    pub imports: &'a Imports,
    /// Local classes in scope as `(simple name, binary name)`, innermost last.
    pub local_types: &'a [(String, String)],
    /// The file's package; empty for the default package.
    pub package: &'a str,
}

/// All type declarations visible to a parse: project sources and classpath.
#[derive(Debug, Default)]
pub struct TypeTable {
    /// Canonical name to binary name.
    canonical: HashMap<String, String>,
    /// Packages that hold at least one type.
    packages: HashSet<String>,
    /// Binary name to declaration.
    types: HashMap<String, TypeDecl>,
}

impl TypeLookup for TypeTable {
    fn type_decl(&self, binary_name: &str) -> Option<&TypeDecl> {
        return self.types.get(binary_name);
    }
}

impl TypeTable {
    /// Build the table. Source types shadow classpath types of the same
    /// binary name; among classpath types the first one wins.
    pub fn build(files: &[FileDeclarations], classpath: Vec<TypeDecl>) -> Self {
        let mut table = Self::default();

        for file in files {
            for declared in &file.types {
                let origin = Origin::Source(file.path.clone());
                if table.insert(TypeDecl::empty(&declared.binary_name, origin)) {
                    if let Some(canonical) = &declared.canonical_name {
                        table.canonical.entry(canonical.clone()).or_insert_with(|| declared.binary_name.clone());
                    }
                }
            }
        }
        let mut shadowed = 0_usize;
        for decl in classpath {
            let canonical = canonical_name(&decl.binary_name);
            let binary = decl.binary_name.clone();
            if table.insert(decl) {
                if let Some(canonical) = canonical {
                    table.canonical.entry(canonical).or_insert(binary);
                }
            } else {
                shadowed = shadowed.saturating_add(1);
            }
        }

        // Supertypes first, so member types inherited through them resolve below.
        for file in files {
            for declared in &file.types {
                let (super_class, interfaces) = table.resolve_supertypes(file, declared);
                if let Some(decl) = table.source_decl_mut(file, declared) {
                    decl.super_class = super_class;
                    decl.interfaces = interfaces;
                }
            }
        }
        for file in files {
            for declared in &file.types {
                let (fields, methods) = table.resolve_members(file, declared);
                if let Some(decl) = table.source_decl_mut(file, declared) {
                    decl.fields = fields;
                    decl.methods = methods;
                }
            }
        }

        tracing::debug!(types = table.types.len(), shadowed, "type table built");
        return table;
    }

    /// Insert unless the binary name is taken. Returns whether it was inserted.
    fn insert(&mut self, decl: TypeDecl) -> bool {
        if self.types.contains_key(&decl.binary_name) {
            return false;
        }
        let mut package = package_of(&decl.binary_name);
        while !package.is_empty() {
            if !self.packages.insert(package.to_string()) {
                break;
            }
            package = package_of(package);
        }
        self.types.insert(decl.binary_name.clone(), decl);
        return true;
    }

    /// The table entry of a source type, unless another file claimed its name.
    fn source_decl_mut(&mut self, file: &FileDeclarations, declared: &DeclaredType) -> Option<&mut TypeDecl> {
        let decl = self.types.get_mut(&declared.binary_name)?;
        let owned = matches!(&decl.origin, Origin::Source(path) if *path == file.path);
        return owned.then_some(decl);
    }

    /// Resolve a source type's written supertypes.
    fn resolve_supertypes(&self, file: &FileDeclarations, declared: &DeclaredType) -> (Option<String>, Vec<String>) {
        let enclosing = declared.scope();
        let context = file.context(&enclosing);
        let super_class = declared
            .super_class
            .as_deref()
            .and_then(|s| self.resolve_type_name(s, &context));
        let interfaces = declared
            .interfaces
            .iter()
            .filter_map(|i| self.resolve_type_name(i, &context))
            .collect();
        return (super_class, interfaces);
    }

    /// Resolve a source type's member types.
    fn resolve_members(&self, file: &FileDeclarations, declared: &DeclaredType) -> (Vec<FieldDecl>, Vec<MethodDecl>) {
        let enclosing = declared.scope();
        let context = file.context(&enclosing);
        return resolve_declared_members(self, declared, &context);
    }

    /// Whether a type with this binary name is known.
    pub fn contains(&self, binary_name: &str) -> bool {
        return self.types.contains_key(binary_name);
    }

    /// Binary name for a canonical (source-level) name.
    pub fn binary_for_canonical(&self, canonical: &str) -> Option<&str> {
        return self.canonical.get(canonical).map(String::as_str);
    }

    /// Whether `name` is a package holding at least one type, directly or below.
    pub fn has_package(&self, name: &str) -> bool {
        return self.packages.contains(name);
    }

    /// Resolve a written type (`List<String>`, `Map.Entry`, `int[]`,
    /// `java.util.Set`) to a binary name. Arrays keep a `[]` suffix per
    /// dimension; primitive arrays keep the primitive name (`int[]`). `None`
    /// for primitives, type variables and unknown names.
    pub fn resolve_type_name(&self, written: &str, context: &TypeContext<'_>) -> Option<String> {
        let (base, dimensions) = strip_type_syntax(written);
        if dimensions > 0 && PRIMITIVES.contains(&base.as_str()) {
            return Some(format!("{base}{}", "[]".repeat(dimensions)));
        }
        let resolved = self.resolve_base(&base, context)?;
        return Some(format!("{resolved}{}", "[]".repeat(dimensions)));
    }

    /// Resolve a plain dotted name without generics or dimensions.
    fn resolve_base(&self, name: &str, context: &TypeContext<'_>) -> Option<String> {
        if name.is_empty() || PRIMITIVES.contains(&name) {
            return None;
        }
        let Some((head, rest)) = name.split_once('.') else {
            return self.resolve_simple(name, context);
        };
        if let Some(outer) = self.resolve_simple(head, context) {
            let nested = format!("{outer}${}", rest.replace('.', "$"));
            if self.contains(&nested) {
                return Some(nested);
            }
        }
        return self.binary_for_canonical(name).map(str::to_string);
    }

    /// Resolve a simple name: local classes, enclosing types and their
    /// (inherited) member types, single imports, same package, on-demand
    /// imports, `java.lang`.
    fn resolve_simple(&self, name: &str, context: &TypeContext<'_>) -> Option<String> {
        if let Some((_, binary)) = context.local_types.iter().rev().find(|(simple, _)| simple == name) {
            return Some(binary.clone());
        }
        for outer in context.enclosing.iter().rev() {
            if simple_name(outer) == name {
                return Some(outer.clone());
            }
            for owner in self.supertypes(outer) {
                let candidate = format!("{owner}${name}");
                if self.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
        for import in &context.imports.single {
            if import.rsplit('.').next() == Some(name) {
                if let Some(binary) = self.binary_for_canonical(import) {
                    return Some(binary.to_string());
                }
            }
        }
        let same_package = if context.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", context.package)
        };
        if self.contains(&same_package) {
            return Some(same_package);
        }
        for package in &context.imports.on_demand {
            if let Some(binary) = self.binary_for_canonical(&format!("{package}.{name}")) {
                return Some(binary.to_string());
            }
        }
        return self.binary_for_canonical(&format!("java.lang.{name}")).map(str::to_string);
    }
}

/// Resolve the written member types of `declared` in `context`.
pub fn resolve_declared_members(
    table: &TypeTable,
    declared: &DeclaredType,
    context: &TypeContext<'_>,
) -> (Vec<FieldDecl>, Vec<MethodDecl>) {
    let fields = declared
        .fields
        .iter()
        .map(|f| FieldDecl {
            name: f.name.clone(),
            type_name: table.resolve_type_name(&f.type_text, context),
        })
        .collect();
    let methods = declared
        .methods
        .iter()
        .map(|m| MethodDecl {
            arity: m.arity,
            name: m.name.clone(),
            return_type: m.return_text.as_deref().and_then(|r| table.resolve_type_name(r, context)),
            varargs: m.varargs,
        })
        .collect();
    return (fields, methods);
}

/// A written type without annotations, type arguments or dimensions.
pub fn base_name(written: &str) -> String {
    return strip_type_syntax(written).0;
}

/// Remove annotations, type arguments and whitespace; count array dimensions.
fn strip_type_syntax(written: &str) -> (String, usize) {
    let mut base = String::with_capacity(written.len());
    let mut generic_depth = 0_usize;
    let mut in_annotation = false;
    for c in written.chars() {
        if in_annotation {
            if c.is_whitespace() {
                in_annotation = false;
            }
            continue;
        }
        match c {
            '<' => generic_depth = generic_depth.saturating_add(1),
            '>' => generic_depth = generic_depth.saturating_sub(1),
            '@' if generic_depth == 0 => in_annotation = true,
            _ if generic_depth > 0 || c.is_whitespace() => {},
            _ => base.push(c),
        }
    }

    let mut dimensions = 0_usize;
    let mut trimmed = base.as_str();
    loop {
        if let Some(rest) = trimmed.strip_suffix("[]") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_suffix("...") {
            trimmed = rest;
        } else {
            break;
        }
        dimensions = dimensions.saturating_add(1);
    }
    return (trimmed.to_string(), dimensions);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(binary: &str, super_class: Option<&str>) -> TypeDecl {
        TypeDecl {
            super_class: super_class.map(str::to_string),
            ..TypeDecl::empty(binary, Origin::Classpath(PathBuf::from("/cp.jar")))
        }
    }

    fn method(name: &str, arity: usize, varargs: bool, return_type: Option<&str>) -> MethodDecl {
        MethodDecl {
            arity,
            name: name.to_string(),
            return_type: return_type.map(str::to_string),
            varargs,
        }
    }

    fn table() -> TypeTable {
        let mut base = class("lib.Base", None);
        base.methods.push(method("run", 0, false, Some("java.lang.String")));
        base.methods.push(method("log", 1, true, None));
        base.fields.push(FieldDecl {
            name: "count".to_string(),
            type_name: None,
        });
        let mut derived = class("lib.Derived", Some("lib.Base"));
        derived.interfaces.push("lib.Named".to_string());
        derived.methods.push(method("run", 1, false, None));
        let mut named = class("lib.Named", None);
        named.methods.push(method("name", 0, false, Some("java.lang.String")));
        let mut object = class(OBJECT, None);
        object.methods.push(method("toString", 0, false, Some("java.lang.String")));
        let entry = class("java.util.Map$Entry", None);
        let map = class("java.util.Map", None);
        let string = class("java.lang.String", None);
        TypeTable::build(&[], vec![base, derived, named, object, entry, map, string])
    }

    fn context<'a>(imports: &'a Imports, enclosing: &'a [String]) -> TypeContext<'a> {
        TypeContext {
            enclosing,
            imports,
            local_types: &[],
            package: "app",
        }
    }

    #[test]
    fn method_lookup_walks_superclass_then_interfaces_then_object() {
        let table = table();
        let run0 = table.find_method("lib.Derived", "run", 0).unwrap();
        assert_eq!(run0.member.to_string(), "lib.Base::run");
        assert_eq!(run0.type_name.as_deref(), Some("java.lang.String"));
        assert_eq!(table.find_method("lib.Derived", "run", 1).unwrap().member.declaring_type, "lib.Derived");
        assert_eq!(table.find_method("lib.Derived", "name", 0).unwrap().member.declaring_type, "lib.Named");
        assert_eq!(table.find_method("lib.Derived", "toString", 0).unwrap().member.declaring_type, OBJECT);
        assert!(table.find_method("lib.Derived", "run", 3).is_none());
    }

    #[test]
    fn varargs_accept_any_trailing_count() {
        let table = table();
        assert!(table.find_method("lib.Base", "log", 0).is_some());
        assert!(table.find_method("lib.Base", "log", 4).is_some());
    }

    #[test]
    fn arrays_behave_as_object() {
        let table = table();
        let found = table.find_method("lib.Base[]", "toString", 0).unwrap();
        assert_eq!(found.member.declaring_type, OBJECT);
    }

    #[test]
    fn fields_are_inherited() {
        let table = table();
        assert_eq!(table.find_field("lib.Derived", "count").unwrap().member.to_string(), "lib.Base::count");
        assert!(table.find_field("lib.Derived", "missing").is_none());
    }

    #[test]
    fn type_names_resolve_through_imports_and_java_lang() {
        let table = table();
        let imports = Imports {
            on_demand: vec!["lib".to_string()],
            single: vec!["java.util.Map".to_string()],
            ..Imports::default()
        };
        let ctx = context(&imports, &[]);
        assert_eq!(table.resolve_type_name("Derived", &ctx).as_deref(), Some("lib.Derived"));
        assert_eq!(table.resolve_type_name("String[][]", &ctx).as_deref(), Some("java.lang.String[][]"));
        assert_eq!(table.resolve_type_name("Map.Entry<K, V>", &ctx).as_deref(), Some("java.util.Map$Entry"));
        assert_eq!(table.resolve_type_name("java.util.Map", &ctx).as_deref(), Some("java.util.Map"));
        assert_eq!(table.resolve_type_name("@NonNull Base...", &ctx).as_deref(), Some("lib.Base[]"));
        assert_eq!(table.resolve_type_name("int", &ctx), None);
        assert_eq!(table.resolve_type_name("int[]", &ctx).as_deref(), Some("int[]"));
        assert_eq!(table.resolve_type_name("Unknown", &ctx), None);
    }

    #[test]
    fn packages_include_parents() {
        let table = table();
        assert!(table.has_package("java.util"));
        assert!(table.has_package("java"));
        assert!(!table.has_package("java.util.Map"));
    }

    #[test]
    fn names_of_nested_and_anonymous_classes() {
        assert_eq!(simple_name("a.b.Outer$Inner"), "Inner");
        assert_eq!(canonical_name("a.Outer$Inner").as_deref(), Some("a.Outer.Inner"));
        assert_eq!(canonical_name("a.Outer$1"), None);
        assert_eq!(canonical_name("a.Outer$1Local"), None);
        assert_eq!(package_of("a.b.C"), "a.b");
    }
}
