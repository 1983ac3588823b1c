/// Project model: root, source roots and declared dependencies of one Maven project.
use std::path::{Path, PathBuf};

use crate::error::{ModelError, PomError};
use crate::pom::{self, Pom, PomSource};
use crate::resolver::ResolveRequest;
use crate::types::{Coordinate, Dependency};

/// Conventional compile source root.
const DEFAULT_SOURCE_DIRECTORY: &str = "src/main/java";

/// Conventional test source root.
const DEFAULT_TEST_SOURCE_DIRECTORY: &str = "src/test/java";

/// A source root as the manifest names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRoot {
    /// Written in the manifest, as opposed to the Maven default.
    pub explicit: bool,
    /// Path relative to the project root, or absolute.
    pub path: PathBuf,
}

/// What a manifest reader extracts; validated by `ProjectModel::load`.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Compile source roots in order.
    pub compile_roots: Vec<DeclaredRoot>,
    /// The project's coordinate.
    pub coordinate: Coordinate,
    /// Declared dependencies in order.
    pub dependencies: Vec<Dependency>,
    /// Managed dependencies.
    pub managed: Vec<Dependency>,
    /// Test source roots in order.
    pub test_roots: Vec<DeclaredRoot>,
}

/// Reads a project manifest from a project root.
pub trait ManifestReader {
    /// Read the manifest of the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ManifestNotFound` or `ModelError::ManifestMalformed`.
    fn read_manifest(&self, root: &Path) -> Result<Manifest, ModelError>;
}

/// Reads `pom.xml`, resolving parents through `relativePath` and `source`.
pub struct PomReader<'a> {
    /// Where parents and BOMs not found on disk come from.
    source: &'a dyn PomSource,
}

impl<'a> PomReader<'a> {
    /// A reader that falls back to `source` for parents and BOMs.
    pub fn new(source: &'a dyn PomSource) -> Self {
        return Self { source };
    }
}

impl ManifestReader for PomReader<'_> {
    fn read_manifest(&self, root: &Path) -> Result<Manifest, ModelError> {
        let path = root.join("pom.xml");
        let malformed = |e: PomError| ModelError::ManifestMalformed {
            path: path.clone(),
            reason: e.to_string(),
        };

        let raw = match Pom::read(&path) {
            Ok(raw) => raw,
            Err(PomError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::ManifestNotFound { path: path.clone() });
            },
            Err(PomError::Io(source)) => {
                return Err(ModelError::Io {
                    path: path.clone(),
                    source,
                });
            },
            Err(e) => return Err(malformed(e)),
        };
        let effective = pom::effective(raw, Some(root), self.source).map_err(malformed)?;

        let declared = |value: Option<String>, default: &str| match value {
            Some(p) => DeclaredRoot {
                explicit: true,
                path: PathBuf::from(p),
            },
            None => DeclaredRoot {
                explicit: false,
                path: PathBuf::from(default),
            },
        };
        return Ok(Manifest {
            compile_roots: vec![declared(effective.source_directory, DEFAULT_SOURCE_DIRECTORY)],
            coordinate: effective.coordinate,
            dependencies: effective.dependencies,
            managed: effective.managed,
            test_roots: vec![declared(effective.test_source_directory, DEFAULT_TEST_SOURCE_DIRECTORY)],
        });
    }
}

/// Immutable description of one project. Built once per run.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    /// Existing compile source roots, absolute.
    pub compile_roots: Vec<PathBuf>,
    /// The project's coordinate.
    pub coordinate: Coordinate,
    /// Declared dependencies in order.
    pub dependencies: Vec<Dependency>,
    /// Managed dependencies.
    pub managed: Vec<Dependency>,
    /// Canonical project root.
    pub root: PathBuf,
    /// Existing test source roots, absolute.
    pub test_roots: Vec<PathBuf>,
}

impl ProjectModel {
    /// Read and validate the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ManifestNotFound` if `root` or its manifest is absent,
    /// `ModelError::ManifestMalformed` for unusable manifests,
    /// `ModelError::SourceRootMissing` for declared roots that do not exist, or
    /// `ModelError::NoSourceRoots` when no compile root exists.
    pub fn load(root: &Path, reader: &dyn ManifestReader) -> Result<Self, ModelError> {
        let root = std::fs::canonicalize(root).map_err(|_| ModelError::ManifestNotFound {
            path: root.join("pom.xml"),
        })?;
        let manifest = reader.read_manifest(&root)?;

        let compile_roots = existing_roots(&root, &manifest.compile_roots)?;
        if compile_roots.is_empty() {
            return Err(ModelError::NoSourceRoots { root });
        }
        let test_roots = existing_roots(&root, &manifest.test_roots)?;

        tracing::info!(
            project = %manifest.coordinate,
            compile_roots = compile_roots.len(),
            test_roots = test_roots.len(),
            dependencies = manifest.dependencies.len(),
            "project model loaded"
        );
        return Ok(Self {
            compile_roots,
            coordinate: manifest.coordinate,
            dependencies: manifest.dependencies,
            managed: manifest.managed,
            root,
            test_roots,
        });
    }

    /// Source roots to parse: compile roots, then test roots if wanted.
    pub fn source_roots(&self, include_tests: bool) -> Vec<PathBuf> {
        let mut roots = self.compile_roots.clone();
        if include_tests {
            roots.extend(self.test_roots.iter().cloned());
        }
        return roots;
    }

    /// The resolver input for this project.
    pub fn request(&self) -> ResolveRequest<'_> {
        return ResolveRequest {
            dependencies: &self.dependencies,
            managed: &self.managed,
        };
    }
}

/// Absolute paths of the roots that exist. Missing defaults are dropped.
///
/// # Errors
///
/// Returns `ModelError::SourceRootMissing` for an explicit root that does not exist.
fn existing_roots(root: &Path, declared: &[DeclaredRoot]) -> Result<Vec<PathBuf>, ModelError> {
    let mut roots = Vec::new();
    for entry in declared {
        let path = root.join(&entry.path);
        if path.is_dir() {
            roots.push(path);
        } else if entry.explicit {
            return Err(ModelError::SourceRootMissing { path });
        } else {
            tracing::debug!(path = %path.display(), "default source root absent");
        }
    }
    return Ok(roots);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A source with no POMs at all.
    struct NoPoms;

    impl PomSource for NoPoms {
        fn load_pom(&self, _: &str, _: &str, _: &str) -> Result<Option<Pom>, PomError> {
            Ok(None)
        }
    }

    fn write_pom(dir: &Path, build: &str) {
        let pom = format!(
            "<project><groupId>com.acme</groupId><artifactId>demo</artifactId><version>1.0</version>\
             <dependencies><dependency><groupId>com.acme</groupId><artifactId>lib</artifactId>\
             <version>2.0</version></dependency></dependencies>{build}</project>"
        );
        std::fs::write(dir.join("pom.xml"), pom).unwrap();
    }

    #[test]
    fn default_roots_that_exist_are_used() {
        let dir = tempfile::tempdir().unwrap();
        write_pom(dir.path(), "");
        std::fs::create_dir_all(dir.path().join("src/main/java")).unwrap();

        let model = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap();
        assert_eq!(model.coordinate, Coordinate::jar("com.acme", "demo", "1.0"));
        assert_eq!(model.compile_roots, vec![model.root.join("src/main/java")]);
        assert!(model.test_roots.is_empty());
        assert_eq!(model.request().dependencies.len(), 1);
    }

    #[test]
    fn declared_root_that_does_not_exist_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pom(dir.path(), "<build><sourceDirectory>src/java</sourceDirectory></build>");

        let err = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap_err();
        assert!(matches!(err, ModelError::SourceRootMissing { ref path } if path.ends_with("src/java")));
    }

    #[test]
    fn no_compile_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pom(dir.path(), "");
        std::fs::create_dir_all(dir.path().join("src/test/java")).unwrap();

        let err = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap_err();
        assert!(matches!(err, ModelError::NoSourceRoots { .. }));
    }

    #[test]
    fn missing_and_malformed_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap_err();
        assert!(matches!(err, ModelError::ManifestNotFound { .. }));

        std::fs::write(dir.path().join("pom.xml"), "<project><groupId>").unwrap();
        let err = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap_err();
        assert!(matches!(err, ModelError::ManifestMalformed { .. }));
    }

    #[test]
    fn source_roots_put_tests_last() {
        let dir = tempfile::tempdir().unwrap();
        write_pom(dir.path(), "");
        std::fs::create_dir_all(dir.path().join("src/main/java")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/test/java")).unwrap();

        let model = ProjectModel::load(dir.path(), &PomReader::new(&NoPoms)).unwrap();
        let roots = model.source_roots(true);
        assert_eq!(roots.len(), 2);
        assert!(roots[1].ends_with("src/test/java"));
        assert_eq!(model.source_roots(false).len(), 1);
    }
}
