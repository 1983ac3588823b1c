/// Repository access: Maven-layout lookup of artifact files and their POMs.
use std::path::{Path, PathBuf};

use crate::error::{FetchError, PomError};
use crate::pom::{self, Pom, PomSource};
use crate::types::{Coordinate, Dependency, Scope};

/// What the resolver needs to know about one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// The artifact's own dependencies, management applied.
    pub dependencies: Vec<Dependency>,
    /// Artifact file.
    pub file: PathBuf,
}

/// Source of artifact files and metadata.
pub trait Repository {
    /// Locate the artifact named by `dependency` and read its dependencies.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::NotFound` when no repository holds the artifact,
    /// or `FetchError::Malformed` / `FetchError::Io` when its POM is unusable.
    fn fetch_metadata(&self, dependency: &Dependency) -> Result<ArtifactMetadata, FetchError>;
}

/// Ordered list of local repository directories in Maven layout.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    /// Repository roots, searched in order.
    roots: Vec<PathBuf>,
}

impl LocalRepository {
    /// A repository over `roots`, searched in order.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        return Self { roots };
    }

    /// `group/as/dirs/artifact/version/artifact-version[-classifier].ext`.
    fn relative_path(coordinate: &Coordinate, classifier: Option<&str>, extension: &str) -> PathBuf {
        let mut path: PathBuf = coordinate.group_id.split('.').collect();
        path.push(&coordinate.artifact_id);
        path.push(&coordinate.version);
        let file = match classifier {
            Some(c) => format!("{}-{}-{c}.{extension}", coordinate.artifact_id, coordinate.version),
            None => format!("{}-{}.{extension}", coordinate.artifact_id, coordinate.version),
        };
        path.push(file);
        return path;
    }

    /// First root holding `relative`.
    fn locate(&self, relative: &Path) -> Option<PathBuf> {
        return self.roots.iter().map(|r| r.join(relative)).find(|p| p.is_file());
    }

    /// Error for a file that no root holds.
    fn not_found(&self, relative: &Path) -> FetchError {
        return FetchError::NotFound {
            file: relative.display().to_string(),
            searched: self.roots.clone(),
        };
    }

    /// Dependencies declared by the POM at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Malformed` if the POM or one of its parents is unusable.
    fn pom_dependencies(&self, path: &Path) -> Result<Vec<Dependency>, FetchError> {
        let malformed = |e: PomError| FetchError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let raw = match Pom::read(path) {
            Ok(raw) => raw,
            Err(PomError::Io(source)) => {
                return Err(FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            },
            Err(e) => return Err(malformed(e)),
        };
        let effective = pom::effective(raw, None, self).map_err(malformed)?;
        return Ok(effective.dependencies);
    }
}

impl PomSource for LocalRepository {
    fn load_pom(&self, group_id: &str, artifact_id: &str, version: &str) -> Result<Option<Pom>, PomError> {
        let coordinate = Coordinate::jar(group_id, artifact_id, version);
        let relative = Self::relative_path(&coordinate, None, "pom");
        return self.locate(&relative).map(|p| Pom::read(&p)).transpose();
    }
}

impl Repository for LocalRepository {
    fn fetch_metadata(&self, dependency: &Dependency) -> Result<ArtifactMetadata, FetchError> {
        let coordinate = &dependency.coordinate;

        if dependency.scope == Scope::System {
            let Some(file) = dependency.system_path.clone() else {
                return Err(FetchError::NotFound {
                    file: format!("systemPath of {coordinate}"),
                    searched: Vec::new(),
                });
            };
            if !file.is_file() {
                return Err(FetchError::NotFound {
                    file: file.display().to_string(),
                    searched: Vec::new(),
                });
            }
            return Ok(ArtifactMetadata {
                dependencies: Vec::new(),
                file,
            });
        }

        let pom_relative = Self::relative_path(coordinate, None, "pom");
        let pom_path = self.locate(&pom_relative);

        let file = if coordinate.is_pom() {
            pom_path.clone().ok_or_else(|| self.not_found(&pom_relative))?
        } else {
            let relative = Self::relative_path(coordinate, coordinate.file_classifier(), coordinate.extension());
            self.locate(&relative).ok_or_else(|| self.not_found(&relative))?
        };

        let dependencies = match pom_path {
            Some(path) => self.pom_dependencies(&path)?,
            None => {
                tracing::warn!(artifact = %coordinate, "no POM next to artifact, assuming no dependencies");
                Vec::new()
            },
        };

        tracing::debug!(artifact = %coordinate, file = %file.display(), "fetched");
        return Ok(ArtifactMetadata { dependencies, file });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_repo() -> LocalRepository {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/repo");
        LocalRepository::new(vec![root])
    }

    #[test]
    fn layout_includes_classifier() {
        let coordinate = Coordinate::jar("com.acme.core", "lib", "1.0");
        let path = LocalRepository::relative_path(&coordinate, Some("tests"), "jar");
        assert_eq!(path, Path::new("com/acme/core/lib/1.0/lib-1.0-tests.jar"));
    }

    #[test]
    fn fetch_reads_dependencies_with_parent_management() {
        let repo = fixture_repo();
        let greeting = Dependency::compile(Coordinate::jar("com.example", "greeting", "1.0"));
        let metadata = repo.fetch_metadata(&greeting).unwrap();

        assert!(metadata.file.ends_with("com/example/greeting/1.0/greeting-1.0.jar"));
        let util = metadata
            .dependencies
            .iter()
            .find(|d| d.coordinate.artifact_id == "util")
            .unwrap();
        assert_eq!(util.coordinate.version, "1.0");
        assert!(metadata.dependencies.iter().any(|d| d.scope == Scope::Test));
        assert!(metadata.dependencies.iter().any(|d| d.optional));
    }

    #[test]
    fn missing_artifact_names_the_file() {
        let repo = fixture_repo();
        let absent = Dependency::compile(Coordinate::jar("com.example", "absent", "9.9"));
        let err = repo.fetch_metadata(&absent).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { ref file, .. } if file.contains("absent-9.9.jar")));
    }

    #[test]
    fn pom_packaging_resolves_to_the_pom_file() {
        let repo = fixture_repo();
        let mut coordinate = Coordinate::jar("com.example", "parent", "1.0");
        coordinate.packaging = "pom".to_string();
        let metadata = repo.fetch_metadata(&Dependency::compile(coordinate)).unwrap();
        assert!(metadata.file.ends_with("parent-1.0.pom"));
    }
}
