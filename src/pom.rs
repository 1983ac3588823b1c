/// POM reading: raw XML model, parent lineage, properties, dependency management.
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::error::PomError;
use crate::types::{ArtifactKey, Coordinate, Dependency, Scope};

/// Longest parent chain followed before giving up.
const MAX_LINEAGE: usize = 32;

/// Rounds of `${...}` substitution, for properties defined via other properties.
const MAX_INTERPOLATION_ROUNDS: usize = 8;

/// Matches `${name}` placeholders.
#[allow(clippy::expect_used, reason = "literal pattern")]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

// ── XML ────────────────────────────────────────────────────────────────

/// Minimal element tree; attributes are ignored since POMs don't use them.
#[derive(Debug, Default)]
struct Element {
    /// Child elements in document order.
    children: Vec<Element>,
    /// Local name without namespace prefix.
    name: String,
    /// Concatenated text content.
    text: String,
}

impl Element {
    /// First child named `name`.
    fn child(&self, name: &str) -> Option<&Self> {
        return self.children.iter().find(|c| c.name == name);
    }

    /// All children named `name`.
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        return self.children.iter().filter(move |c| c.name == name);
    }

    /// Trimmed, non-empty text of the first child named `name`.
    fn text_of(&self, name: &str) -> Option<String> {
        let text = self.child(name)?.text.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }

    /// Children of the `outer/inner` list path, e.g. `dependencies/dependency`.
    fn list<'a>(&'a self, outer: &str, inner: &'a str) -> Vec<&'a Self> {
        return self
            .child(outer)
            .map(|o| o.children_named(inner).collect())
            .unwrap_or_default();
    }
}

/// Build the element tree of an XML document.
///
/// # Errors
///
/// Returns `PomError::Xml` on malformed input.
fn parse_xml(content: &str) -> Result<Element, PomError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| PomError::Xml {
            reason: format!("at byte {}: {e}", reader.error_position()),
        })?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(Element {
                    name,
                    ..Element::default()
                });
            },
            Event::Empty(empty) => {
                let element = Element {
                    name: String::from_utf8_lossy(empty.local_name().as_ref()).into_owned(),
                    ..Element::default()
                };
                attach(&mut stack, &mut root, element);
            },
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            },
            Event::Text(text) => {
                let unescaped = text.unescape().map_err(|e| PomError::Xml {
                    reason: e.to_string(),
                })?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescaped);
                }
            },
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    return root.ok_or_else(|| PomError::Xml {
        reason: "document has no root element".to_string(),
    });
}

/// Attach a closed element to its parent, or make it the document root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

// ── Raw model ──────────────────────────────────────────────────────────

/// `<parent>` of a POM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Parent artifact id.
    pub artifact_id: String,
    /// Parent group id.
    pub group_id: String,
    /// `relativePath`; `None` means the Maven default `../pom.xml`.
    pub relative_path: Option<String>,
    /// Parent version.
    pub version: String,
}

/// A `<dependency>` as written, before interpolation and management.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDependency {
    /// `artifactId`.
    pub artifact_id: String,
    /// `classifier`.
    pub classifier: Option<String>,
    /// `exclusions/exclusion` as `(group, artifact)`.
    pub exclusions: Vec<(String, String)>,
    /// `groupId`.
    pub group_id: String,
    /// `optional`.
    pub optional: Option<String>,
    /// `scope`.
    pub scope: Option<String>,
    /// `systemPath`.
    pub system_path: Option<String>,
    /// `type`.
    pub type_: Option<String>,
    /// `version`.
    pub version: Option<String>,
}

impl RawDependency {
    /// Management key: `group:artifact:type[:classifier]`.
    fn management_key(&self) -> String {
        let type_ = self.type_.as_deref().unwrap_or("jar");
        return match &self.classifier {
            Some(classifier) => {
                format!("{}:{}:{type_}:{classifier}", self.group_id, self.artifact_id)
            },
            None => format!("{}:{}:{type_}", self.group_id, self.artifact_id),
        };
    }

    /// Replace placeholders in every field.
    fn interpolate(&self, properties: &BTreeMap<String, String>) -> Self {
        let sub = |s: &str| interpolate(s, properties);
        let opt = |s: &Option<String>| s.as_deref().map(sub);
        return Self {
            artifact_id: sub(&self.artifact_id),
            classifier: opt(&self.classifier),
            exclusions: self.exclusions.iter().map(|(g, a)| (sub(g), sub(a))).collect(),
            group_id: sub(&self.group_id),
            optional: opt(&self.optional),
            scope: opt(&self.scope),
            system_path: opt(&self.system_path),
            type_: opt(&self.type_),
            version: opt(&self.version),
        };
    }
}

/// A POM as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    /// `artifactId`.
    pub artifact_id: Option<String>,
    /// `dependencies/dependency`.
    pub dependencies: Vec<RawDependency>,
    /// `groupId`; inherited from the parent when absent.
    pub group_id: Option<String>,
    /// `dependencyManagement/dependencies/dependency`.
    pub managed: Vec<RawDependency>,
    /// `packaging`.
    pub packaging: Option<String>,
    /// `parent`.
    pub parent: Option<ParentRef>,
    /// `properties/*`.
    pub properties: BTreeMap<String, String>,
    /// `build/sourceDirectory`.
    pub source_directory: Option<String>,
    /// `build/testSourceDirectory`.
    pub test_source_directory: Option<String>,
    /// `version`; inherited from the parent when absent.
    pub version: Option<String>,
}

impl Pom {
    /// Parse a POM document.
    ///
    /// # Errors
    ///
    /// Returns `PomError::Xml` for malformed XML, or `PomError::NotAProject`
    /// when the root element is not `<project>`.
    pub fn parse(content: &str) -> Result<Self, PomError> {
        let root = parse_xml(content)?;
        if root.name != "project" {
            return Err(PomError::NotAProject { root: root.name });
        }

        let parent = root.child("parent").map(|p| ParentRef {
            artifact_id: p.text_of("artifactId").unwrap_or_default(),
            group_id: p.text_of("groupId").unwrap_or_default(),
            relative_path: p.child("relativePath").map(|r| r.text.trim().to_string()),
            version: p.text_of("version").unwrap_or_default(),
        });
        let properties = root
            .child("properties")
            .map(|p| {
                p.children
                    .iter()
                    .map(|c| (c.name.clone(), c.text.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let managed = root
            .child("dependencyManagement")
            .map(|m| m.list("dependencies", "dependency"))
            .unwrap_or_default();
        let build = root.child("build");

        return Ok(Self {
            artifact_id: root.text_of("artifactId"),
            dependencies: root.list("dependencies", "dependency").into_iter().map(raw_dependency).collect(),
            group_id: root.text_of("groupId"),
            managed: managed.into_iter().map(raw_dependency).collect(),
            packaging: root.text_of("packaging"),
            parent,
            properties,
            source_directory: build.and_then(|b| b.text_of("sourceDirectory")),
            test_source_directory: build.and_then(|b| b.text_of("testSourceDirectory")),
            version: root.text_of("version"),
        });
    }

    /// Read and parse a POM file.
    ///
    /// # Errors
    ///
    /// Returns `PomError::Io` if the file cannot be read, or any `parse` error.
    pub fn read(path: &Path) -> Result<Self, PomError> {
        let content = std::fs::read_to_string(path)?;
        return Self::parse(&content);
    }

    /// Group id, falling back to the parent's.
    fn effective_group(&self) -> Option<&str> {
        return self
            .group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()));
    }

    /// Version, falling back to the parent's.
    fn effective_version(&self) -> Option<&str> {
        return self
            .version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()));
    }
}

/// Convert a `<dependency>` element.
fn raw_dependency(element: &Element) -> RawDependency {
    return RawDependency {
        artifact_id: element.text_of("artifactId").unwrap_or_default(),
        classifier: element.text_of("classifier"),
        exclusions: element
            .list("exclusions", "exclusion")
            .into_iter()
            .map(|e| {
                (
                    e.text_of("groupId").unwrap_or_else(|| "*".to_string()),
                    e.text_of("artifactId").unwrap_or_else(|| "*".to_string()),
                )
            })
            .collect(),
        group_id: element.text_of("groupId").unwrap_or_default(),
        optional: element.text_of("optional"),
        scope: element.text_of("scope"),
        system_path: element.text_of("systemPath"),
        type_: element.text_of("type"),
        version: element.text_of("version"),
    };
}

/// Substitute known `${name}` placeholders; unknown ones stay verbatim.
pub fn interpolate(text: &str, properties: &BTreeMap<String, String>) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_INTERPOLATION_ROUNDS {
        if !current.contains("${") {
            break;
        }
        let next = PLACEHOLDER
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                let name = caps.get(1).map_or("", |m| m.as_str());
                return properties
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| caps.get(0).map_or("", |m| m.as_str()).to_string());
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    return current;
}

// ── Effective model ────────────────────────────────────────────────────

/// Where parent and BOM POMs come from when not found on disk next to the project.
pub trait PomSource {
    /// Look up a POM by coordinates. `Ok(None)` when no repository holds it.
    ///
    /// # Errors
    ///
    /// Returns `PomError` if a POM exists but cannot be read or parsed.
    fn load_pom(&self, group_id: &str, artifact_id: &str, version: &str) -> Result<Option<Pom>, PomError>;
}

/// A POM with inheritance, interpolation and management applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePom {
    /// The artifact's own coordinate.
    pub coordinate: Coordinate,
    /// Declared dependencies, versions filled from management where possible.
    pub dependencies: Vec<Dependency>,
    /// Managed dependencies, BOM imports expanded.
    pub managed: Vec<Dependency>,
    /// Interpolated `build/sourceDirectory`.
    pub source_directory: Option<String>,
    /// Interpolated `build/testSourceDirectory`.
    pub test_source_directory: Option<String>,
}

/// Build the effective model of `pom`. `dir` is the directory the POM was
/// read from; only then is `relativePath` consulted for its parents.
///
/// # Errors
///
/// Returns `PomError::ParentNotFound` when a parent is neither on disk nor
/// in `source`, `PomError::LineageTooDeep` for runaway parent chains, or
/// any read/parse error of a parent or BOM.
pub fn effective(pom: Pom, dir: Option<&Path>, source: &dyn PomSource) -> Result<EffectivePom, PomError> {
    return build_effective(pom, dir, source, 0);
}

/// `effective` with a BOM import depth guard.
fn build_effective(
    pom: Pom,
    dir: Option<&Path>,
    source: &dyn PomSource,
    import_depth: usize,
) -> Result<EffectivePom, PomError> {
    let lineage = lineage(pom, dir, source)?;
    let Some(own) = lineage.first() else {
        return Err(PomError::Xml {
            reason: "empty lineage".to_string(),
        });
    };
    let properties = merged_properties(&lineage, own);

    let group_id = interpolate(own.effective_group().unwrap_or_default(), &properties);
    let artifact_id = interpolate(own.artifact_id.as_deref().unwrap_or_default(), &properties);
    let version = interpolate(own.effective_version().unwrap_or_default(), &properties);
    let packaging = own.packaging.clone().unwrap_or_else(|| "jar".to_string());

    // Nearest declaration of each management key wins: child before parents.
    let mut managed_raw: Vec<RawDependency> = Vec::new();
    let mut seen = HashSet::new();
    for raw in lineage.iter().flat_map(|p| p.managed.iter()) {
        let raw = raw.interpolate(&properties);
        if seen.insert(raw.management_key()) {
            managed_raw.push(raw);
        }
    }

    let mut managed = Vec::new();
    let mut imported = Vec::new();
    for raw in managed_raw {
        let is_import = raw.scope.as_deref() == Some("import") && raw.type_.as_deref() == Some("pom");
        if !is_import {
            managed.push(typed(&raw));
            continue;
        }
        if import_depth >= MAX_LINEAGE {
            return Err(PomError::LineageTooDeep {
                artifact: raw.management_key(),
            });
        }
        let version = raw.version.clone().unwrap_or_default();
        let Some(bom) = source.load_pom(&raw.group_id, &raw.artifact_id, &version)? else {
            tracing::warn!(bom = %raw.management_key(), "imported BOM not found, skipping");
            continue;
        };
        let bom = build_effective(bom, None, source, import_depth.saturating_add(1))?;
        imported.extend(bom.managed);
    }
    for dependency in imported {
        let present = managed.iter().any(|m: &Dependency| {
            m.coordinate.key() == dependency.coordinate.key()
                && m.coordinate.packaging == dependency.coordinate.packaging
                && m.coordinate.classifier == dependency.coordinate.classifier
        });
        if !present {
            managed.push(dependency);
        }
    }

    // Dependencies are inherited from parents too; the child's declaration wins.
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();
    for raw in lineage.iter().flat_map(|p| p.dependencies.iter()) {
        let raw = raw.interpolate(&properties);
        if !seen.insert(raw.management_key()) {
            continue;
        }
        let mut dependency = typed(&raw);
        if let Some(managed) = find_managed(&managed, &dependency) {
            if dependency.coordinate.version.is_empty() {
                dependency.coordinate.version.clone_from(&managed.coordinate.version);
            }
            if raw.scope.is_none() {
                dependency.scope = managed.scope;
                dependency.scope_declared = managed.scope_declared;
            }
            if dependency.exclusions.is_empty() {
                dependency.exclusions.clone_from(&managed.exclusions);
            }
        }
        dependencies.push(dependency);
    }

    let build_dir = |s: &Option<String>| s.as_deref().map(|d| interpolate(d, &properties));
    return Ok(EffectivePom {
        coordinate: Coordinate {
            artifact_id,
            classifier: None,
            group_id,
            packaging,
            version,
        },
        dependencies,
        managed,
        source_directory: build_dir(&own.source_directory),
        test_source_directory: build_dir(&own.test_source_directory),
    });
}

/// The POM followed by its ancestors, nearest first.
fn lineage(pom: Pom, dir: Option<&Path>, source: &dyn PomSource) -> Result<Vec<Pom>, PomError> {
    let artifact = pom.artifact_id.clone().unwrap_or_default();
    let mut chain = vec![pom];
    let mut current_dir: Option<PathBuf> = dir.map(Path::to_path_buf);

    loop {
        let Some(parent) = chain.last().and_then(|p| p.parent.clone()) else {
            return Ok(chain);
        };
        if chain.len() >= MAX_LINEAGE {
            return Err(PomError::LineageTooDeep { artifact });
        }

        let on_disk = match &current_dir {
            Some(d) => read_relative_parent(d, &parent)?,
            None => None,
        };
        match on_disk {
            Some((found, found_dir)) => {
                chain.push(found);
                current_dir = Some(found_dir);
            },
            None => {
                let found = source
                    .load_pom(&parent.group_id, &parent.artifact_id, &parent.version)?
                    .ok_or_else(|| PomError::ParentNotFound {
                        parent: format!("{}:{}:{}", parent.group_id, parent.artifact_id, parent.version),
                    })?;
                chain.push(found);
                current_dir = None;
            },
        }
    }
}

/// Read the parent through `relativePath` if that file is the declared parent.
///
/// # Errors
///
/// Returns `PomError` if the file exists but cannot be read or parsed.
fn read_relative_parent(dir: &Path, parent: &ParentRef) -> Result<Option<(Pom, PathBuf)>, PomError> {
    let relative = parent.relative_path.as_deref().unwrap_or("../pom.xml");
    if relative.is_empty() {
        return Ok(None);
    }
    let mut path = dir.join(relative);
    if path.is_dir() {
        path = path.join("pom.xml");
    }
    if !path.is_file() {
        return Ok(None);
    }

    let candidate = Pom::read(&path)?;
    let matches = candidate.artifact_id.as_deref() == Some(parent.artifact_id.as_str())
        && candidate.effective_group() == Some(parent.group_id.as_str());
    if !matches {
        tracing::debug!(path = %path.display(), "relativePath does not hold the declared parent");
        return Ok(None);
    }
    let parent_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    return Ok(Some((candidate, parent_dir)));
}

/// Properties visible to `own`: ancestors first, overridden by descendants,
/// plus the `project.*` built-ins.
fn merged_properties(lineage: &[Pom], own: &Pom) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for pom in lineage.iter().rev() {
        for (key, value) in &pom.properties {
            properties.insert(key.clone(), value.clone());
        }
    }

    let mut builtin = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            properties.insert(format!("project.{key}"), value.to_string());
            properties.insert(format!("pom.{key}"), value.to_string());
        }
    };
    builtin("groupId", own.effective_group());
    builtin("artifactId", own.artifact_id.as_deref());
    builtin("version", own.effective_version());
    builtin("packaging", Some(own.packaging.as_deref().unwrap_or("jar")));
    if let Some(parent) = &own.parent {
        builtin("parent.groupId", Some(&parent.group_id));
        builtin("parent.artifactId", Some(&parent.artifact_id));
        builtin("parent.version", Some(&parent.version));
    }
    return properties;
}

/// Typed dependency from an interpolated raw one. Unknown scopes become compile.
fn typed(raw: &RawDependency) -> Dependency {
    let scope = match raw.scope.as_deref() {
        None => Scope::Compile,
        Some(text) => Scope::parse(text).unwrap_or_else(|| {
            tracing::warn!(dependency = %raw.management_key(), scope = text, "unknown scope, using compile");
            return Scope::Compile;
        }),
    };
    return Dependency {
        coordinate: Coordinate {
            artifact_id: raw.artifact_id.clone(),
            classifier: raw.classifier.clone(),
            group_id: raw.group_id.clone(),
            packaging: raw.type_.clone().unwrap_or_else(|| "jar".to_string()),
            version: raw.version.clone().unwrap_or_default(),
        },
        exclusions: raw.exclusions.iter().map(|(g, a)| ArtifactKey::new(g, a)).collect(),
        optional: raw.optional.as_deref().is_some_and(|o| o.eq_ignore_ascii_case("true")),
        scope,
        scope_declared: raw.scope.is_some(),
        system_path: raw.system_path.as_ref().map(PathBuf::from),
    };
}

/// The managed entry for a dependency: same key, type and classifier.
pub fn find_managed<'a>(managed: &'a [Dependency], dependency: &Dependency) -> Option<&'a Dependency> {
    let wanted = &dependency.coordinate;
    return managed.iter().find(|m| {
        m.coordinate.group_id == wanted.group_id
            && m.coordinate.artifact_id == wanted.artifact_id
            && m.coordinate.packaging == wanted.packaging
            && m.coordinate.classifier == wanted.classifier
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// In-memory POM repository.
    #[derive(Default)]
    struct Poms(HashMap<String, String>);

    impl Poms {
        fn with(mut self, gav: &str, content: &str) -> Self {
            self.0.insert(gav.to_string(), content.to_string());
            self
        }
    }

    impl PomSource for Poms {
        fn load_pom(&self, group_id: &str, artifact_id: &str, version: &str) -> Result<Option<Pom>, PomError> {
            self.0
                .get(&format!("{group_id}:{artifact_id}:{version}"))
                .map(|c| Pom::parse(c))
                .transpose()
        }
    }

    const PARENT: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
        <groupId>com.acme</groupId><artifactId>parent</artifactId><version>2.0</version>
        <packaging>pom</packaging>
        <properties><lib.version>3.1</lib.version><shared>parent</shared></properties>
        <dependencyManagement><dependencies>
          <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId><version>${lib.version}</version>
            <exclusions><exclusion><groupId>org.noise</groupId><artifactId>*</artifactId></exclusion></exclusions>
          </dependency>
        </dependencies></dependencyManagement>
        <dependencies>
          <dependency><groupId>com.acme</groupId><artifactId>logging</artifactId><version>1.0</version></dependency>
        </dependencies>
    </project>"#;

    const CHILD: &str = r#"<?xml version="1.0"?>
    <project>
        <parent><groupId>com.acme</groupId><artifactId>parent</artifactId><version>2.0</version></parent>
        <artifactId>app</artifactId>
        <properties><shared>child</shared></properties>
        <dependencies>
          <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId></dependency>
          <dependency><groupId>${project.groupId}</groupId><artifactId>sibling</artifactId>
            <version>${project.version}</version><scope>test</scope><optional>true</optional></dependency>
        </dependencies>
        <build><sourceDirectory>src/${shared}</sourceDirectory></build>
    </project>"#;

    #[test]
    fn parse_reads_coordinates_and_lists() {
        let pom = Pom::parse(PARENT).unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("com.acme"));
        assert_eq!(pom.packaging.as_deref(), Some("pom"));
        assert_eq!(pom.managed.len(), 1);
        assert_eq!(pom.managed[0].exclusions, vec![("org.noise".to_string(), "*".to_string())]);
        assert_eq!(pom.properties.get("lib.version").map(String::as_str), Some("3.1"));
    }

    #[test]
    fn non_project_root_is_rejected() {
        assert!(matches!(Pom::parse("<settings/>"), Err(PomError::NotAProject { .. })));
        assert!(matches!(Pom::parse("<project><a></project>"), Err(PomError::Xml { .. })));
    }

    #[test]
    fn interpolation_leaves_unknown_placeholders() {
        let mut properties = BTreeMap::new();
        properties.insert("a".to_string(), "${b}-x".to_string());
        properties.insert("b".to_string(), "1".to_string());
        assert_eq!(interpolate("v${a}/${missing}", &properties), "v1-x/${missing}");
    }

    #[test]
    fn parent_supplies_group_version_properties_management_and_dependencies() {
        let source = Poms::default().with("com.acme:parent:2.0", PARENT);
        let effective = effective(Pom::parse(CHILD).unwrap(), None, &source).unwrap();

        assert_eq!(effective.coordinate, Coordinate::jar("com.acme", "app", "2.0"));
        assert_eq!(effective.source_directory.as_deref(), Some("src/child"));

        let names: Vec<_> = effective.dependencies.iter().map(|d| d.coordinate.to_string()).collect();
        assert_eq!(
            names,
            vec!["com.acme:lib:jar:3.1", "com.acme:sibling:jar:2.0", "com.acme:logging:jar:1.0"]
        );
        let lib = &effective.dependencies[0];
        assert_eq!(lib.exclusions, vec![ArtifactKey::new("org.noise", "*")]);
        let sibling = &effective.dependencies[1];
        assert_eq!(sibling.scope, Scope::Test);
        assert!(sibling.optional);
    }

    #[test]
    fn missing_parent_is_an_error() {
        let err = effective(Pom::parse(CHILD).unwrap(), None, &Poms::default()).unwrap_err();
        assert!(matches!(err, PomError::ParentNotFound { parent } if parent == "com.acme:parent:2.0"));
    }

    #[test]
    fn bom_imports_extend_management() {
        let bom = r#"<project><groupId>com.acme</groupId><artifactId>bom</artifactId><version>1</version>
            <packaging>pom</packaging>
            <dependencyManagement><dependencies>
              <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId><version>9.0</version></dependency>
              <dependency><groupId>com.acme</groupId><artifactId>extra</artifactId><version>4.4</version></dependency>
            </dependencies></dependencyManagement></project>"#;
        let app = r#"<project><groupId>com.acme</groupId><artifactId>app</artifactId><version>1</version>
            <dependencyManagement><dependencies>
              <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId><version>1.5</version></dependency>
              <dependency><groupId>com.acme</groupId><artifactId>bom</artifactId><version>1</version>
                <type>pom</type><scope>import</scope></dependency>
            </dependencies></dependencyManagement>
            <dependencies>
              <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId></dependency>
              <dependency><groupId>com.acme</groupId><artifactId>extra</artifactId></dependency>
            </dependencies></project>"#;
        let source = Poms::default().with("com.acme:bom:1", bom);
        let effective = effective(Pom::parse(app).unwrap(), None, &source).unwrap();

        let versions: Vec<_> = effective.dependencies.iter().map(|d| d.coordinate.version.as_str()).collect();
        assert_eq!(versions, vec!["1.5", "4.4"]);
        assert!(effective.managed.iter().all(|m| m.scope != Scope::Import));
    }

    #[test]
    fn relative_path_parent_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pom.xml"), PARENT).unwrap();
        let module = dir.path().join("app");
        std::fs::create_dir(&module).unwrap();

        let effective = effective(Pom::parse(CHILD).unwrap(), Some(&module), &Poms::default()).unwrap();
        assert_eq!(effective.coordinate.version, "2.0");
        assert_eq!(effective.dependencies[0].coordinate.version, "3.1");
    }
}
