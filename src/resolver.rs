/// Transitive dependency resolution over a `Repository`.
use std::collections::{HashSet, VecDeque};

use crate::error::ResolutionError;
use crate::pom::find_managed;
use crate::repository::Repository;
use crate::types::{ArtifactKey, ClasspathEntries, Dependency, ResolvedArtifact, Scope};

/// How version conflicts between occurrences of one `group:artifact` are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Depth-first pre-order; the first occurrence in declaration order wins.
    FirstDeclared,
    /// Breadth-first; the occurrence closest to the project wins, ties by declaration order.
    #[default]
    Nearest,
}

/// What happens when an artifact cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingArtifactPolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Record the failure, skip the subtree, keep going.
    Partial,
}

/// Resolver knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Conflict policy.
    pub conflict: ConflictPolicy,
    /// Whether direct `test` dependencies are resolved.
    pub include_test: bool,
    /// Missing-artifact policy.
    pub missing_artifacts: MissingArtifactPolicy,
}

/// The project's side of a resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// Declared dependencies in declaration order.
    pub dependencies: &'a [Dependency],
    /// Root dependency management; overrides transitive versions and scopes.
    pub managed: &'a [Dependency],
}

/// Outcome of a resolution.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Selected artifacts in selection order. Keys are unique.
    pub artifacts: Vec<ResolvedArtifact>,
    /// Tolerated failures; only ever non-empty under `MissingArtifactPolicy::Partial`.
    pub failures: Vec<ResolutionError>,
}

impl Resolution {
    /// Classpath of the resolved artifacts, `pom` packaging excluded.
    pub fn classpath(&self) -> ClasspathEntries {
        return ClasspathEntries(
            self.artifacts
                .iter()
                .filter(|a| !a.coordinate.is_pom())
                .map(|a| a.file.clone())
                .collect(),
        );
    }
}

/// An occurrence of a dependency waiting to be visited.
struct Pending {
    /// Depth of the occurrence; 1 for direct.
    depth: usize,
    /// The dependency as declared.
    dependency: Dependency,
    /// Exclusions accumulated along the path, including the dependency's own.
    exclusions: Vec<ArtifactKey>,
    /// Display name of whoever declared it.
    required_by: String,
    /// Effective scope.
    scope: Scope,
}

/// Mutable state of one resolution.
struct Walk<'a> {
    /// Keys already decided, selected or failed. Never expanded again.
    decided: HashSet<ArtifactKey>,
    /// Root management.
    managed: &'a [Dependency],
    /// Options.
    options: &'a ResolveOptions,
    /// Artifact source.
    repository: &'a dyn Repository,
    /// Output under construction.
    resolution: Resolution,
}

/// Resolve the transitive closure of `request`.
///
/// Selection order is deterministic: breadth-first for `Nearest`, depth-first
/// pre-order for `FirstDeclared`, children in declaration order.
///
/// # Errors
///
/// Under `MissingArtifactPolicy::Abort`, returns the first
/// `ResolutionError::Unresolvable` or `ResolutionError::MissingVersion`.
pub fn resolve(
    request: &ResolveRequest<'_>,
    repository: &dyn Repository,
    options: &ResolveOptions,
) -> Result<Resolution, ResolutionError> {
    let mut walk = Walk {
        decided: HashSet::new(),
        managed: request.managed,
        options,
        repository,
        resolution: Resolution::default(),
    };

    let roots: Vec<Pending> = request
        .dependencies
        .iter()
        .filter(|d| d.scope != Scope::Import)
        .filter(|d| options.include_test || d.scope != Scope::Test)
        .map(|d| Pending {
            depth: 1,
            dependency: d.clone(),
            exclusions: d.exclusions.clone(),
            required_by: "project".to_string(),
            scope: d.scope,
        })
        .collect();

    match options.conflict {
        ConflictPolicy::Nearest => {
            let mut queue: VecDeque<Pending> = roots.into();
            while let Some(pending) = queue.pop_front() {
                queue.extend(walk.visit(pending)?);
            }
        },
        ConflictPolicy::FirstDeclared => {
            let mut stack: Vec<Pending> = roots.into_iter().rev().collect();
            while let Some(pending) = stack.pop() {
                stack.extend(walk.visit(pending)?.into_iter().rev());
            }
        },
    }

    tracing::info!(
        artifacts = walk.resolution.artifacts.len(),
        failures = walk.resolution.failures.len(),
        "dependencies resolved"
    );
    return Ok(walk.resolution);
}

impl Walk<'_> {
    /// Select `pending` unless its key is decided or excluded. Returns the
    /// children to visit next.
    ///
    /// # Errors
    ///
    /// Returns the failure when the missing-artifact policy is `Abort`.
    fn visit(&mut self, pending: Pending) -> Result<Vec<Pending>, ResolutionError> {
        let Pending {
            depth,
            dependency,
            exclusions,
            required_by,
            scope,
        } = pending;
        let key = dependency.coordinate.key();
        if self.decided.contains(&key) {
            tracing::trace!(%key, depth, "already decided");
            return Ok(Vec::new());
        }
        self.decided.insert(key.clone());

        if dependency.coordinate.version.is_empty() {
            self.fail(ResolutionError::MissingVersion {
                key: key.to_string(),
                required_by,
            })?;
            return Ok(Vec::new());
        }

        let metadata = match self.repository.fetch_metadata(&dependency) {
            Ok(metadata) => metadata,
            Err(source) => {
                self.fail(ResolutionError::Unresolvable {
                    coordinate: dependency.coordinate.to_string(),
                    required_by,
                    source,
                })?;
                return Ok(Vec::new());
            },
        };

        tracing::debug!(artifact = %dependency.coordinate, depth, %scope, "selected");
        let parent_name = dependency.coordinate.to_string();
        self.resolution.artifacts.push(ResolvedArtifact {
            coordinate: dependency.coordinate,
            depth,
            file: metadata.file,
            scope,
        });
        if scope == Scope::System {
            return Ok(Vec::new());
        }

        let children = metadata
            .dependencies
            .into_iter()
            .filter(|child| !child.optional)
            .filter(|child| {
                let child_key = child.coordinate.key();
                return !exclusions.iter().any(|ex| child_key.is_excluded_by(ex));
            })
            .filter_map(|mut child| {
                let mut child_scope = scope.propagate(child.scope)?;
                if let Some(managed) = find_managed(self.managed, &child) {
                    if !managed.coordinate.version.is_empty() {
                        child.coordinate.version.clone_from(&managed.coordinate.version);
                    }
                    if managed.scope_declared {
                        child_scope = scope.derive_managed(managed.scope);
                    }
                }
                let mut child_exclusions = exclusions.clone();
                child_exclusions.extend(child.exclusions.iter().cloned());
                return Some(Pending {
                    depth: depth.saturating_add(1),
                    dependency: child,
                    exclusions: child_exclusions,
                    required_by: parent_name.clone(),
                    scope: child_scope,
                });
            })
            .collect();
        return Ok(children);
    }

    /// Apply the missing-artifact policy to `error`.
    ///
    /// # Errors
    ///
    /// Returns `error` itself under `Abort`.
    fn fail(&mut self, error: ResolutionError) -> Result<(), ResolutionError> {
        return match self.options.missing_artifacts {
            MissingArtifactPolicy::Abort => Err(error),
            MissingArtifactPolicy::Partial => {
                tracing::warn!(artifact = error.subject(), %error, "skipping unresolvable dependency");
                self.resolution.failures.push(error);
                Ok(())
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::error::FetchError;
    use crate::repository::ArtifactMetadata;
    use crate::types::Coordinate;

    /// In-memory repository keyed by `g:a:v`.
    #[derive(Default)]
    struct FakeRepository(HashMap<String, Vec<Dependency>>);

    impl FakeRepository {
        fn with(mut self, gav: &str, dependencies: Vec<Dependency>) -> Self {
            self.0.insert(gav.to_string(), dependencies);
            self
        }
    }

    impl Repository for FakeRepository {
        fn fetch_metadata(&self, dependency: &Dependency) -> Result<ArtifactMetadata, FetchError> {
            let c = &dependency.coordinate;
            let gav = format!("{}:{}:{}", c.group_id, c.artifact_id, c.version);
            match self.0.get(&gav) {
                Some(dependencies) => Ok(ArtifactMetadata {
                    dependencies: dependencies.clone(),
                    file: PathBuf::from(format!("/repo/{}-{}.jar", c.artifact_id, c.version)),
                }),
                None => Err(FetchError::NotFound {
                    file: gav,
                    searched: vec![PathBuf::from("/repo")],
                }),
            }
        }
    }

    /// `g:a:v` compile dependency.
    fn dep(gav: &str) -> Dependency {
        let parts: Vec<&str> = gav.split(':').collect();
        Dependency::compile(Coordinate::jar(parts[0], parts[1], parts[2]))
    }

    fn scoped(gav: &str, scope: Scope) -> Dependency {
        Dependency { scope, ..dep(gav) }
    }

    fn options(conflict: ConflictPolicy, missing: MissingArtifactPolicy) -> ResolveOptions {
        ResolveOptions {
            conflict,
            include_test: true,
            missing_artifacts: missing,
        }
    }

    fn run(repo: &FakeRepository, roots: &[Dependency], opts: &ResolveOptions) -> Result<Resolution, ResolutionError> {
        resolve(
            &ResolveRequest {
                dependencies: roots,
                managed: &[],
            },
            repo,
            opts,
        )
    }

    fn names(resolution: &Resolution) -> Vec<String> {
        resolution
            .artifacts
            .iter()
            .map(|a| format!("{}:{}@{}", a.coordinate.artifact_id, a.coordinate.version, a.depth))
            .collect()
    }

    /// a -> a2 -> c:2 (depth 3), b -> c:1 (depth 2).
    fn diamond() -> FakeRepository {
        FakeRepository::default()
            .with("g:a:1", vec![dep("g:a2:1")])
            .with("g:a2:1", vec![dep("g:c:2")])
            .with("g:b:1", vec![dep("g:c:1")])
            .with("g:c:1", vec![])
            .with("g:c:2", vec![])
    }

    #[test]
    fn nearest_wins_over_first_declared_deeper_occurrence() {
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = run(&diamond(), &[dep("g:a:1"), dep("g:b:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "b:1@1", "a2:1@2", "c:1@2"]);
    }

    #[test]
    fn first_declared_wins_regardless_of_depth() {
        let opts = options(ConflictPolicy::FirstDeclared, MissingArtifactPolicy::Abort);
        let resolution = run(&diamond(), &[dep("g:a:1"), dep("g:b:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "a2:1@2", "c:2@3", "b:1@1"]);
    }

    #[test]
    fn equal_depth_ties_go_to_declaration_order() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:c:1")])
            .with("g:b:1", vec![dep("g:c:2")])
            .with("g:c:1", vec![])
            .with("g:c:2", vec![]);
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = run(&repo, &[dep("g:a:1"), dep("g:b:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "b:1@1", "c:1@2"]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let roots = [dep("g:a:1"), dep("g:b:1")];
        let first = run(&diamond(), &roots, &opts).unwrap();
        let second = run(&diamond(), &roots, &opts).unwrap();
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[test]
    fn cycles_terminate_and_keys_stay_unique() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:b:1")])
            .with("g:b:1", vec![dep("g:a:2"), dep("g:a:1")])
            .with("g:a:2", vec![]);
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = run(&repo, &[dep("g:a:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "b:1@2"]);
    }

    #[test]
    fn missing_artifact_aborts_naming_the_coordinate() {
        let repo = FakeRepository::default().with("g:a:1", vec![dep("g:gone:3")]);
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let err = run(&repo, &[dep("g:a:1")], &opts).unwrap_err();
        assert_eq!(err.subject(), "g:gone:jar:3");
        assert!(err.to_string().contains("required by g:a:jar:1"));
    }

    #[test]
    fn partial_policy_records_failures_and_continues() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:gone:3"), dep("g:b:1")])
            .with("g:b:1", vec![]);
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Partial);
        let resolution = run(&repo, &[dep("g:a:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "b:1@2"]);
        assert_eq!(resolution.failures.len(), 1);
        assert_eq!(resolution.failures[0].subject(), "g:gone:jar:3");
    }

    #[test]
    fn exclusions_optional_and_test_scopes_prune_the_closure() {
        let optional = Dependency { optional: true, ..dep("g:opt:1") };
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:b:1"), optional, scoped("g:junit:4", Scope::Test)])
            .with("g:b:1", vec![dep("g:noise:1"), dep("g:kept:1")])
            .with("g:kept:1", vec![]);
        let mut root = dep("g:a:1");
        root.exclusions.push(ArtifactKey::new("*", "noise"));
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = run(&repo, &[root], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "b:1@2", "kept:1@3"]);
    }

    #[test]
    fn scopes_propagate_through_runtime() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:b:1")])
            .with("g:b:1", vec![]);
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = run(&repo, &[scoped("g:a:1", Scope::Runtime)], &opts).unwrap();
        assert_eq!(resolution.artifacts[1].scope, Scope::Runtime);
    }

    #[test]
    fn root_management_overrides_transitive_versions() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:c:1")])
            .with("g:c:5", vec![]);
        let managed = [dep("g:c:5")];
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = resolve(
            &ResolveRequest {
                dependencies: &[dep("g:a:1")],
                managed: &managed,
            },
            &repo,
            &opts,
        )
        .unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1", "c:5@2"]);
    }

    #[test]
    fn managed_scopes_derive_from_a_runtime_parent() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:c:1"), dep("g:d:1")])
            .with("g:b:1", vec![dep("g:c:1")])
            .with("g:c:1", vec![])
            .with("g:d:1", vec![]);
        let undeclared = Dependency {
            scope: Scope::Test,
            scope_declared: false,
            ..dep("g:d:1")
        };
        let managed = [scoped("g:c:1", Scope::Provided), undeclared];
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = resolve(
            &ResolveRequest {
                dependencies: &[scoped("g:a:1", Scope::Runtime), dep("g:b:1")],
                managed: &managed,
            },
            &repo,
            &opts,
        )
        .unwrap();
        let scopes: Vec<(String, Scope)> = resolution
            .artifacts
            .iter()
            .map(|a| (a.coordinate.artifact_id.clone(), a.scope))
            .collect();
        assert_eq!(
            scopes,
            vec![
                ("a".to_string(), Scope::Runtime),
                ("b".to_string(), Scope::Compile),
                ("c".to_string(), Scope::Runtime),
                ("d".to_string(), Scope::Runtime),
            ]
        );
    }

    #[test]
    fn compile_parents_take_the_managed_scope() {
        let repo = FakeRepository::default()
            .with("g:a:1", vec![dep("g:c:1")])
            .with("g:c:1", vec![]);
        let managed = [scoped("g:c:1", Scope::Provided)];
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let resolution = resolve(
            &ResolveRequest {
                dependencies: &[dep("g:a:1")],
                managed: &managed,
            },
            &repo,
            &opts,
        )
        .unwrap();
        assert_eq!(resolution.artifacts[1].scope, Scope::Provided);
    }

    #[test]
    fn missing_version_is_reported() {
        let repo = FakeRepository::default();
        let opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        let err = run(&repo, &[dep("g:a:")], &opts).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingVersion { ref key, .. } if key == "g:a"));
    }

    #[test]
    fn test_dependencies_skipped_when_excluded_by_options() {
        let repo = FakeRepository::default().with("g:a:1", vec![]);
        let mut opts = options(ConflictPolicy::Nearest, MissingArtifactPolicy::Abort);
        opts.include_test = false;
        let resolution = run(&repo, &[scoped("g:t:1", Scope::Test), dep("g:a:1")], &opts).unwrap();
        assert_eq!(names(&resolution), vec!["a:1@1"]);
    }

    #[test]
    fn classpath_skips_pom_packaging() {
        let mut pom = Coordinate::jar("g", "bom", "1");
        pom.packaging = "pom".to_string();
        let resolution = Resolution {
            artifacts: vec![
                ResolvedArtifact {
                    coordinate: pom,
                    depth: 1,
                    file: PathBuf::from("/repo/bom-1.pom"),
                    scope: Scope::Compile,
                },
                ResolvedArtifact {
                    coordinate: Coordinate::jar("g", "a", "1"),
                    depth: 1,
                    file: PathBuf::from("/repo/a-1.jar"),
                    scope: Scope::Compile,
                },
            ],
            failures: Vec::new(),
        };
        assert_eq!(resolution.classpath().0, vec![PathBuf::from("/repo/a-1.jar")]);
    }
}
