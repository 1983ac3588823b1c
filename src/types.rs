/// Core domain types for coordinates, classpaths, member symbols and reference edges.
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ── Artifacts ──────────────────────────────────────────────────────────

/// Identity of a Maven artifact. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    /// Artifact id, e.g. `guava`.
    pub artifact_id: String,
    /// Optional classifier such as `tests` or `sources`.
    pub classifier: Option<String>,
    /// Group id, e.g. `com.google.guava`.
    pub group_id: String,
    /// Artifact type (`jar`, `pom`, `test-jar`, ...). Defaults to `jar`.
    pub packaging: String,
    /// Version string; empty when neither declared nor managed.
    pub version: String,
}

impl Coordinate {
    /// A `jar` coordinate without classifier.
    pub fn jar(group_id: &str, artifact_id: &str, version: &str) -> Self {
        return Self {
            artifact_id: artifact_id.to_string(),
            classifier: None,
            group_id: group_id.to_string(),
            packaging: "jar".to_string(),
            version: version.to_string(),
        };
    }

    /// Classifier used in the repository file name. `test-jar` implies `tests`.
    pub fn file_classifier(&self) -> Option<&str> {
        if let Some(classifier) = self.classifier.as_deref() {
            return Some(classifier);
        }
        return (self.packaging == "test-jar").then_some("tests");
    }

    /// File extension of the artifact in a repository.
    pub fn extension(&self) -> &str {
        return match self.packaging.as_str() {
            "jar" | "bundle" | "maven-plugin" | "ejb" | "ejb-client" | "test-jar" | "java-source"
            | "javadoc" => "jar",
            other => other,
        };
    }

    /// Whether the artifact carries only metadata and no classes.
    pub fn is_pom(&self) -> bool {
        return self.packaging == "pom";
    }

    /// The conflict key of this coordinate.
    pub fn key(&self) -> ArtifactKey {
        return ArtifactKey {
            artifact_id: self.artifact_id.clone(),
            group_id: self.group_id.clone(),
        };
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.packaging)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        return write!(f, ":{}", self.version);
    }
}

/// `(group, artifact)` pair. Two artifacts with the same key never coexist
/// in a resolution. Also used for exclusions, where `*` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactKey {
    /// Artifact id or `*`.
    pub artifact_id: String,
    /// Group id or `*`.
    pub group_id: String,
}

impl ArtifactKey {
    /// Build a key from its parts.
    pub fn new(group_id: &str, artifact_id: &str) -> Self {
        return Self {
            artifact_id: artifact_id.to_string(),
            group_id: group_id.to_string(),
        };
    }

    /// Whether `self` is matched by the exclusion pattern `exclusion`.
    pub fn is_excluded_by(&self, exclusion: &Self) -> bool {
        let group = exclusion.group_id == "*" || exclusion.group_id == self.group_id;
        let artifact = exclusion.artifact_id == "*" || exclusion.artifact_id == self.artifact_id;
        return group && artifact;
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}:{}", self.group_id, self.artifact_id);
    }
}

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Default scope; available everywhere and transitive.
    Compile,
    /// Only meaningful inside `dependencyManagement` for BOM imports.
    Import,
    /// Supplied by the runtime container; not transitive.
    Provided,
    /// Needed at runtime only.
    Runtime,
    /// Resolved from an explicit `systemPath`.
    System,
    /// Test classpath only; not transitive.
    Test,
}

impl Scope {
    /// Parse a POM scope string. Unknown scopes yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        return match text {
            "compile" => Some(Self::Compile),
            "import" => Some(Self::Import),
            "provided" => Some(Self::Provided),
            "runtime" => Some(Self::Runtime),
            "system" => Some(Self::System),
            "test" => Some(Self::Test),
            _ => None,
        };
    }

    /// Lowercase POM spelling.
    pub fn as_str(self) -> &'static str {
        return match self {
            Self::Compile => "compile",
            Self::Import => "import",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::System => "system",
            Self::Test => "test",
        };
    }

    /// Effective scope of a dependency declared with `child` scope by an
    /// artifact that itself sits at scope `self`. `None` means the
    /// dependency is not inherited.
    pub fn propagate(self, child: Self) -> Option<Self> {
        return match (self, child) {
            (_, Self::Test | Self::Provided | Self::Import | Self::System) => None,
            (Self::Compile, Self::Compile) => Some(Self::Compile),
            (Self::Compile | Self::Runtime, Self::Runtime) | (Self::Runtime, Self::Compile) => {
                Some(Self::Runtime)
            },
            (Self::Provided, Self::Compile | Self::Runtime) => Some(Self::Provided),
            (Self::Test, Self::Compile | Self::Runtime) => Some(Self::Test),
            (Self::Import | Self::System, Self::Compile | Self::Runtime) => None,
        };
    }

    /// Effective scope of a transitive dependency whose scope is pinned to
    /// `managed` by root dependency management, under a parent at `self`.
    pub fn derive_managed(self, managed: Self) -> Self {
        return match (self, managed) {
            (_, Self::System | Self::Test) | (Self::Compile, _) => managed,
            (Self::Runtime | Self::Test, _) => self,
            (Self::Provided | Self::System, _) => Self::Provided,
            (Self::Import, _) => Self::Runtime,
        };
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// A declared dependency edge, as read from a POM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Target coordinate. The version may be empty until management applies.
    pub coordinate: Coordinate,
    /// Keys pruned from this dependency's subtree.
    pub exclusions: Vec<ArtifactKey>,
    /// Optional dependencies are not inherited by dependents.
    pub optional: bool,
    /// Declared scope.
    pub scope: Scope,
    /// Whether the POM spelled out `<scope>`.
    pub scope_declared: bool,
    /// Explicit file for `system` scope.
    pub system_path: Option<PathBuf>,
}

impl Dependency {
    /// A compile-scope dependency on `coordinate`.
    #[cfg(test)]
    pub fn compile(coordinate: Coordinate) -> Self {
        return Self {
            coordinate,
            exclusions: Vec::new(),
            optional: false,
            scope: Scope::Compile,
            scope_declared: true,
            system_path: None,
        };
    }
}

/// A selected artifact with a concrete file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Selected coordinate.
    pub coordinate: Coordinate,
    /// Distance from the project; 1 for direct dependencies.
    pub depth: usize,
    /// Artifact file inside a repository (or the system path).
    pub file: PathBuf,
    /// Effective scope after propagation.
    pub scope: Scope,
}

/// Ordered classpath. The first entry holding a class name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathEntries(
    /// Absolute paths of jars and class directories.
    pub Vec<PathBuf>,
);

impl ClasspathEntries {
    /// Append entries that are not already present, keeping order.
    pub fn extend_unique(&mut self, entries: &[PathBuf]) {
        for entry in entries {
            if !self.0.contains(entry) {
                self.0.push(entry.clone());
            }
        }
    }
}

// ── Symbols ────────────────────────────────────────────────────────────

/// Member category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    /// A field or enum constant.
    Field,
    /// A method or constructor.
    Method,
}

/// A declared member, identified by its declaring type's binary name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Member {
    /// Binary name of the declaring type, e.g. `com.acme.Outer$Inner`.
    pub declaring_type: String,
    /// Field or method.
    pub kind: MemberKind,
    /// Simple member name.
    pub name: String,
}

impl Member {
    /// A field of `declaring_type`.
    pub fn field(declaring_type: &str, name: &str) -> Self {
        return Self {
            declaring_type: declaring_type.to_string(),
            kind: MemberKind::Field,
            name: name.to_string(),
        };
    }

    /// A method of `declaring_type`.
    pub fn method(declaring_type: &str, name: &str) -> Self {
        return Self {
            declaring_type: declaring_type.to_string(),
            kind: MemberKind::Method,
            name: name.to_string(),
        };
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}::{}", self.declaring_type, self.name);
    }
}

/// Binding outcome of a reference site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Symbol {
    /// Bound to a declared member.
    Resolved(
        /// The target member.
        Member,
    ),
    /// Could not be bound; `name` is the source text, e.g. `B.bar`.
    Unresolved {
        /// Best-effort textual name.
        name: String,
    },
}

impl Symbol {
    /// Whether the symbol is bound.
    pub fn is_resolved(&self) -> bool {
        return matches!(self, Self::Resolved(_));
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Resolved(member) => write!(f, "{member}"),
            Self::Unresolved { name } => write!(f, "unresolved({name})"),
        };
    }
}

// ── Edges ──────────────────────────────────────────────────────────────

/// The member a reference is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Inside this method or field declarator.
    Member(
        /// The enclosing member.
        Member,
    ),
    /// Outside any member: static or instance initializer blocks, or type-level code.
    Outside,
}

impl Context {
    /// The member, if any.
    pub fn member(&self) -> Option<&Member> {
        return match self {
            Self::Member(member) => Some(member),
            Self::Outside => None,
        };
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Member(member) => write!(f, "{member}"),
            Self::Outside => f.write_str("<no context>"),
        };
    }
}

/// What kind of site produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// `expr.field` / `this.field`.
    FieldAccess,
    /// Any method invocation.
    MethodCall,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(match self {
            Self::FieldAccess => "field-access",
            Self::MethodCall => "method-call",
        });
    }
}

/// Where a reference occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// One-based column (in bytes).
    pub column: u32,
    /// Source file.
    pub file: PathBuf,
    /// One-based line.
    pub line: u32,
    /// Zero-based byte offset of the reference site.
    pub offset: u32,
}

/// One reference from a context to a target symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    /// Member the site is attributed to.
    pub context: Context,
    /// Method call or field access.
    pub kind: ReferenceKind,
    /// Site location.
    pub location: SourceLocation,
    /// Target of the reference.
    pub referenced: Symbol,
}

impl fmt::Display for ReferenceEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{} -> {}", self.context, self.referenced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_display_includes_classifier_only_when_present() {
        let mut coordinate = Coordinate::jar("com.acme", "core", "1.2");
        assert_eq!(coordinate.to_string(), "com.acme:core:jar:1.2");
        coordinate.classifier = Some("tests".to_string());
        assert_eq!(coordinate.to_string(), "com.acme:core:jar:tests:1.2");
    }

    #[test]
    fn test_jar_maps_to_jar_with_tests_classifier() {
        let mut coordinate = Coordinate::jar("com.acme", "core", "1.2");
        coordinate.packaging = "test-jar".to_string();
        assert_eq!(coordinate.extension(), "jar");
        assert_eq!(coordinate.file_classifier(), Some("tests"));
    }

    #[test]
    fn wildcard_exclusions_match_any_group_or_artifact() {
        let key = ArtifactKey::new("org.slf4j", "slf4j-api");
        assert!(key.is_excluded_by(&ArtifactKey::new("*", "slf4j-api")));
        assert!(key.is_excluded_by(&ArtifactKey::new("org.slf4j", "*")));
        assert!(key.is_excluded_by(&ArtifactKey::new("*", "*")));
        assert!(!key.is_excluded_by(&ArtifactKey::new("org.slf4j", "jcl-over-slf4j")));
    }

    #[test]
    fn scope_propagation_follows_the_maven_table() {
        assert_eq!(Scope::Compile.propagate(Scope::Compile), Some(Scope::Compile));
        assert_eq!(Scope::Compile.propagate(Scope::Runtime), Some(Scope::Runtime));
        assert_eq!(Scope::Runtime.propagate(Scope::Compile), Some(Scope::Runtime));
        assert_eq!(Scope::Test.propagate(Scope::Compile), Some(Scope::Test));
        assert_eq!(Scope::Provided.propagate(Scope::Runtime), Some(Scope::Provided));
        assert_eq!(Scope::Compile.propagate(Scope::Test), None);
        assert_eq!(Scope::Compile.propagate(Scope::Provided), None);
    }

    #[test]
    fn managed_scopes_are_derived_from_the_parent() {
        assert_eq!(Scope::Compile.derive_managed(Scope::Provided), Scope::Provided);
        assert_eq!(Scope::Compile.derive_managed(Scope::Runtime), Scope::Runtime);
        assert_eq!(Scope::Runtime.derive_managed(Scope::Compile), Scope::Runtime);
        assert_eq!(Scope::Test.derive_managed(Scope::Compile), Scope::Test);
        assert_eq!(Scope::Provided.derive_managed(Scope::Runtime), Scope::Provided);
        assert_eq!(Scope::Runtime.derive_managed(Scope::Test), Scope::Test);
    }

    #[test]
    fn member_display_uses_double_colon() {
        assert_eq!(Member::method("com.acme.A", "foo").to_string(), "com.acme.A::foo");
        let symbol = Symbol::Unresolved { name: "B.bar".to_string() };
        assert_eq!(symbol.to_string(), "unresolved(B.bar)");
        assert_eq!(Context::Outside.to_string(), "<no context>");
    }
}
