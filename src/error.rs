/// Crate-level error types for refgraph diagnostics.
use std::path::PathBuf;

/// Fatal errors that abort a run. Per-file parse problems and unresolved
/// bindings are data (see `tree::Problem`), never variants of this type.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A jar or zip classpath entry could not be opened as an archive.
    #[error("archive unreadable: {}: {reason}", path.display())]
    Archive {
        /// Archive that failed to open.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Underlying I/O error from the filesystem or stdout.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// The project model could not be built.
    #[error(transparent)]
    Model(
        /// The wrapped model error.
        #[from]
        ModelError,
    ),

    /// Dependency resolution failed under the abort policy.
    #[error(transparent)]
    Resolution(
        /// The wrapped resolution error.
        #[from]
        ResolutionError,
    ),

    /// TOML deserialization of `.refgraph.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },

    /// A configured repository location is not a local directory.
    #[error("unsupported repository location: {location} (only local directories are read)")]
    UnsupportedRepository {
        /// Location string as written in the config.
        location: String,
    },
}

/// Failures while reading the project manifest. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The manifest exists but cannot be read from disk.
    #[error("cannot read manifest {}: {source}", path.display())]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// The manifest exists but is not a well-formed POM.
    #[error("malformed manifest {}: {reason}", path.display())]
    ManifestMalformed {
        /// Manifest path.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// No `pom.xml` at the project root.
    #[error("manifest not found: {}", path.display())]
    ManifestNotFound {
        /// Expected manifest path.
        path: PathBuf,
    },

    /// Neither a declared nor a default compile source root exists.
    #[error("no compile source root under {}", root.display())]
    NoSourceRoots {
        /// Project root that was searched.
        root: PathBuf,
    },

    /// A source root declared in the manifest does not exist on disk.
    #[error("declared source root does not exist: {}", path.display())]
    SourceRootMissing {
        /// Absolute path of the missing root.
        path: PathBuf,
    },
}

/// Failures of the repository access service for a single artifact.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Reading a repository file failed for a reason other than absence.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// The artifact's POM exists but could not be interpreted.
    #[error("malformed POM {}: {reason}", path.display())]
    Malformed {
        /// POM path.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// No repository root holds the artifact file.
    #[error("{file} not found in {} repositor{}", searched.len(), if searched.len() == 1 { "y" } else { "ies" })]
    NotFound {
        /// Repository-relative file name that was looked up.
        file: String,
        /// Repository roots that were searched, in order.
        searched: Vec<PathBuf>,
    },
}

/// Dependency resolution failures. Fatal by default; recorded and skipped
/// under the explicit partial policy.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No version was declared or managed for a dependency.
    #[error("no version for {key} (required by {required_by})")]
    MissingVersion {
        /// `group:artifact` of the dependency.
        key: String,
        /// Coordinate of the declaring artifact, or the project.
        required_by: String,
    },

    /// The artifact or its metadata could not be fetched.
    #[error("cannot resolve {coordinate} (required by {required_by}): {source}")]
    Unresolvable {
        /// Display form of the coordinate.
        coordinate: String,
        /// Coordinate of the declaring artifact, or the project.
        required_by: String,
        /// Underlying fetch failure.
        source: FetchError,
    },
}

impl ResolutionError {
    /// The coordinate (or `group:artifact` key) this error names.
    pub fn subject(&self) -> &str {
        return match self {
            Self::MissingVersion { key, .. } => key,
            Self::Unresolvable { coordinate, .. } => coordinate,
        };
    }
}

/// POM interpretation failures, converted by callers into `ModelError` or `FetchError`.
#[derive(Debug, thiserror::Error)]
pub enum PomError {
    /// Reading a parent POM through `relativePath` failed.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The parent chain is longer than any real project would declare.
    #[error("parent chain of {artifact} is too deep (cycle?)")]
    LineageTooDeep {
        /// Artifact whose lineage was being built.
        artifact: String,
    },

    /// The document root is not `<project>`.
    #[error("root element is <{root}>, expected <project>")]
    NotAProject {
        /// Name of the actual root element.
        root: String,
    },

    /// A declared parent POM could not be found.
    #[error("parent {parent} not found")]
    ParentNotFound {
        /// `group:artifact:version` of the parent.
        parent: String,
    },

    /// The document is not well-formed XML.
    #[error("xml: {reason}")]
    Xml {
        /// Parser message with position.
        reason: String,
    },
}

/// Class-file decoding failures. Logged and skipped by the classpath loader.
#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    /// The constant pool holds an entry of unknown tag.
    #[error("unknown constant pool tag {tag} at index {index}")]
    BadConstant {
        /// Constant pool index.
        index: u16,
        /// Tag byte.
        tag: u8,
    },

    /// The file does not start with `0xCAFEBABE`.
    #[error("bad magic number")]
    BadMagic,

    /// A constant pool reference points at the wrong kind of entry.
    #[error("constant pool index {index} is not a {expected}")]
    BadReference {
        /// What the reference should point at.
        expected: &'static str,
        /// Constant pool index.
        index: u16,
    },

    /// The file ended before a structure was complete.
    #[error("truncated class file")]
    Truncated,
}
