//! CLI commands for refgraph: deps, tree, scan.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error;
use crate::extractor;
use crate::parser;
use crate::project::{PomReader, ProjectModel};
use crate::repository::LocalRepository;
use crate::resolver::{self, Resolution};
use crate::sink::{self, DiagnosticsSink, Format};
use crate::types::ClasspathEntries;

/// A project with its dependencies resolved.
struct Prepared {
    /// Resolved artifacts followed by the boot classpath.
    classpath: ClasspathEntries,
    /// Resolved artifacts and tolerated failures.
    resolution: Resolution,
    /// Source roots to parse.
    source_roots: Vec<PathBuf>,
}

/// Load config and project model, then resolve dependencies.
///
/// # Errors
///
/// Returns config errors, `Error::Model` for an unusable project and
/// `Error::Resolution` when an artifact cannot be resolved under the abort policy.
fn prepare(root: &Path) -> Result<Prepared, error::Error> {
    let config = Config::load(root)?;
    let repository = LocalRepository::new(config.repositories.clone());
    let model = ProjectModel::load(root, &PomReader::new(&repository))?;
    let resolution = resolver::resolve(&model.request(), &repository, &config.resolve_options())?;

    let mut classpath = resolution.classpath();
    classpath.extend_unique(&config.boot_classpath);
    tracing::info!(
        project = %model.coordinate,
        root = %model.root.display(),
        artifacts = resolution.artifacts.len(),
        failures = resolution.failures.len(),
        classpath = classpath.0.len(),
        "dependencies resolved"
    );

    return Ok(Prepared {
        classpath,
        resolution,
        source_roots: model.source_roots(config.test_sources),
    });
}

/// Sink over stdout.
fn stdout_sink(format: Format) -> Box<dyn DiagnosticsSink> {
    return sink::for_format(format, std::io::stdout().lock());
}

/// Print source roots and resolved artifacts.
///
/// # Errors
///
/// Returns errors from preparation or output.
pub fn deps(root: &Path, format: Format) -> Result<(), error::Error> {
    let prepared = prepare(root)?;
    let mut out = stdout_sink(format);
    out.resolution(&prepared.source_roots, &prepared.resolution)?;
    out.finish()?;
    return Ok(());
}

/// Print each file's problems and messages with a dump of its resolved tree.
///
/// # Errors
///
/// Returns errors from preparation or output.
pub fn tree(root: &Path, format: Format) -> Result<(), error::Error> {
    let prepared = prepare(root)?;
    let files = parser::discover(&prepared.source_roots);
    let results = parser::parse_all(&files, &prepared.classpath, &prepared.source_roots);

    let mut out = stdout_sink(format);
    out.resolution(&prepared.source_roots, &prepared.resolution)?;
    for (path, result) in &results {
        out.file(path, result)?;
        if let Ok(tree) = result {
            out.tree(tree)?;
        }
    }
    out.finish()?;
    return Ok(());
}

/// Print artifacts, per-file diagnostics and every reference edge.
///
/// # Errors
///
/// Returns errors from preparation or output.
pub fn scan(root: &Path, format: Format) -> Result<(), error::Error> {
    let prepared = prepare(root)?;
    let files = parser::discover(&prepared.source_roots);
    let results = parser::parse_all(&files, &prepared.classpath, &prepared.source_roots);
    let edges = extractor::extract_all(&results);
    tracing::info!(files = results.len(), edges = edges.len(), "scan complete");

    let mut out = stdout_sink(format);
    out.resolution(&prepared.source_roots, &prepared.resolution)?;
    for (path, result) in &results {
        out.file(path, result)?;
    }
    out.edges(&edges)?;
    out.finish()?;
    return Ok(());
}
