use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::resolver::{ConflictPolicy, MissingArtifactPolicy, ResolveOptions};

/// Project configuration loaded from `.refgraph.toml`.
/// Repository and boot classpath locations are already absolute.
#[derive(Debug, Clone)]
pub struct Config {
    /// Jars or class directories appended after the resolved artifacts.
    pub boot_classpath: Vec<PathBuf>,
    /// Version conflict policy for the resolver.
    pub conflict: ConflictPolicy,
    /// Whether unresolvable artifacts abort the run.
    pub missing_artifacts: MissingArtifactPolicy,
    /// Local Maven repositories, searched in order.
    pub repositories: Vec<PathBuf>,
    /// Whether test source roots and test-scope dependencies take part.
    pub test_sources: bool,
}

/// Raw TOML structure for `.refgraph.toml`.
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RefgraphTomlConfig {
    /// `boot-classpath = [...]`.
    #[serde(default)]
    boot_classpath: Option<Vec<String>>,
    /// `conflict = "nearest" | "first-declared"`.
    #[serde(default)]
    conflict: ConflictPolicy,
    /// `missing-artifacts = "abort" | "partial"`.
    #[serde(default)]
    missing_artifacts: MissingArtifactPolicy,
    /// `repositories = [...]`.
    #[serde(default)]
    repositories: Option<Vec<String>>,
    /// `test-sources = bool`.
    #[serde(default)]
    test_sources: Option<bool>,
}

impl Config {
    /// Load config from `.refgraph.toml` in the given project root.
    /// Returns defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed; a written config is never ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or
    /// `Error::UnsupportedRepository` for remote repository URLs.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".refgraph.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::defaults()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: RefgraphTomlConfig = toml::from_str(&content)?;
        let repositories = match raw.repositories {
            Some(locations) => locations
                .iter()
                .map(|l| resolve_location(root, l))
                .collect::<Result<Vec<_>, _>>()?,
            None => default_repositories(),
        };
        let boot_classpath = match raw.boot_classpath {
            Some(locations) => locations
                .iter()
                .map(|l| resolve_location(root, l))
                .collect::<Result<Vec<_>, _>>()?,
            None => default_boot_classpath(),
        };

        return Ok(Self {
            boot_classpath,
            conflict: raw.conflict,
            missing_artifacts: raw.missing_artifacts,
            repositories,
            test_sources: raw.test_sources.unwrap_or(true),
        });
    }

    /// Defaults: the user's local repository, the JDK's `rt.jar` if one is found,
    /// nearest-wins, abort on missing artifacts, test sources included.
    fn defaults() -> Self {
        return Self {
            boot_classpath: default_boot_classpath(),
            conflict: ConflictPolicy::default(),
            missing_artifacts: MissingArtifactPolicy::default(),
            repositories: default_repositories(),
            test_sources: true,
        };
    }

    /// Resolver options derived from this config.
    pub fn resolve_options(&self) -> ResolveOptions {
        return ResolveOptions {
            conflict: self.conflict,
            include_test: self.test_sources,
            missing_artifacts: self.missing_artifacts,
        };
    }
}

/// The current user's home directory, if the environment names one.
fn home_dir() -> Option<PathBuf> {
    return std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
}

/// `~/.m2/repository`.
fn default_repositories() -> Vec<PathBuf> {
    return home_dir()
        .map(|home| home.join(".m2").join("repository"))
        .into_iter()
        .collect();
}

/// `rt.jar` of a pre-module JDK under `$JAVA_HOME`, when present.
fn default_boot_classpath() -> Vec<PathBuf> {
    let Some(java_home) = std::env::var_os("JAVA_HOME").map(PathBuf::from) else {
        return Vec::new();
    };
    return [java_home.join("jre/lib/rt.jar"), java_home.join("lib/rt.jar")]
        .into_iter()
        .find(|p| p.is_file())
        .into_iter()
        .collect();
}

/// Turn a configured location into an absolute local path.
///
/// # Errors
///
/// Returns `Error::UnsupportedRepository` for `http://` and `https://` URLs.
fn resolve_location(root: &Path, location: &str) -> Result<PathBuf, Error> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Err(Error::UnsupportedRepository {
            location: location.to_string(),
        });
    }
    let location = location.strip_prefix("file://").unwrap_or(location);
    let path = match location.strip_prefix("~/") {
        Some(rest) => match home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(location),
        },
        None => PathBuf::from(location),
    };
    if path.is_absolute() {
        return Ok(path);
    }
    return Ok(root.join(path));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.conflict, ConflictPolicy::Nearest);
        assert_eq!(config.missing_artifacts, MissingArtifactPolicy::Abort);
        assert!(config.test_sources);
    }

    #[test]
    fn kebab_case_keys_and_relative_locations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".refgraph.toml"),
            "repositories = [\"repo\", \"file:///opt/m2\"]\n\
             boot-classpath = []\n\
             conflict = \"first-declared\"\n\
             missing-artifacts = \"partial\"\n\
             test-sources = false\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.repositories,
            vec![dir.path().join("repo"), PathBuf::from("/opt/m2")]
        );
        assert!(config.boot_classpath.is_empty());
        assert_eq!(config.conflict, ConflictPolicy::FirstDeclared);
        assert_eq!(config.missing_artifacts, MissingArtifactPolicy::Partial);
        assert!(!config.test_sources);
    }

    #[test]
    fn remote_repository_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".refgraph.toml"),
            "repositories = [\"https://repo.maven.apache.org/maven2\"]\n",
        )
        .unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedRepository { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".refgraph.toml"), "conflict = \"oldest\"\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }
}
