/// Output sinks: line-oriented text and a single JSON document.
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;
use crate::resolver::Resolution;
use crate::tree::{Node, NodeKind, ParseResult, Problem, ResolvedTree};
use crate::types::{ReferenceEdge, ReferenceKind};

/// Output format of every command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Line-oriented text.
    #[default]
    Text,
    /// One pretty-printed JSON document.
    Json,
}

/// Receives everything a command produces, in order.
pub trait DiagnosticsSink {
    /// Source roots of the project model and the resolved artifacts.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the output cannot be written.
    fn resolution(&mut self, source_roots: &[PathBuf], resolution: &Resolution) -> Result<(), Error>;

    /// Outcome of one file: its problems and messages.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the output cannot be written.
    fn file(&mut self, path: &Path, result: &ParseResult) -> Result<(), Error>;

    /// Full node dump of one resolved tree.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Json` if the tree cannot be written.
    fn tree(&mut self, tree: &ResolvedTree) -> Result<(), Error>;

    /// Reference edges of the whole project.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the output cannot be written.
    fn edges(&mut self, edges: &[ReferenceEdge]) -> Result<(), Error>;

    /// Flush, or write the buffered document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Json` if the output cannot be written.
    fn finish(&mut self) -> Result<(), Error>;
}

/// Build the sink for `format` over `out`.
pub fn for_format<'w, W: Write + 'w>(format: Format, out: W) -> Box<dyn DiagnosticsSink + 'w> {
    return match format {
        Format::Text => Box::new(TextSink::new(out)),
        Format::Json => Box::new(JsonSink::new(out)),
    };
}

// ── Text ───────────────────────────────────────────────────────────────

/// Prints one line per fact.
pub struct TextSink<W: Write> {
    /// Destination.
    out: W,
}

impl<W: Write> TextSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        return Self { out };
    }

    /// Write `node` and its subtree, one line per node.
    fn dump(&mut self, node: &Node, depth: usize) -> Result<(), Error> {
        let indent = "  ".repeat(depth);
        let binding = match &node.kind {
            NodeKind::FieldAccess { target } | NodeKind::MethodInvocation { target } => format!(" -> {target}"),
            NodeKind::FieldDeclaration { field } => format!(" = {field}"),
            NodeKind::MethodDeclaration { doc_tags, method } if doc_tags.is_empty() => format!(" = {method}"),
            NodeKind::MethodDeclaration { doc_tags, method } => format!(" = {method} [{}]", doc_tags.join(", ")),
            NodeKind::TypeDeclaration { binary_name } => format!(" = {binary_name}"),
            NodeKind::Other { .. } => String::new(),
        };
        writeln!(self.out, "{:>6} {indent}{}{binding}", node.span.start, node.kind.label())?;
        for child in &node.children {
            self.dump(child, depth.saturating_add(1))?;
        }
        return Ok(());
    }
}

impl<W: Write> DiagnosticsSink for TextSink<W> {
    fn resolution(&mut self, source_roots: &[PathBuf], resolution: &Resolution) -> Result<(), Error> {
        for root in source_roots {
            writeln!(self.out, "Code: {}", root.display())?;
        }
        for artifact in &resolution.artifacts {
            writeln!(
                self.out,
                "Dependency: {} ({}, {}, depth {})",
                artifact.file.display(),
                artifact.coordinate,
                artifact.scope.as_str(),
                artifact.depth
            )?;
        }
        for failure in &resolution.failures {
            writeln!(self.out, "Unresolved: {failure}")?;
        }
        return Ok(());
    }

    fn file(&mut self, path: &Path, result: &ParseResult) -> Result<(), Error> {
        writeln!(self.out, "File: {}", path.display())?;
        match result {
            Err(problems) => {
                for problem in problems {
                    writeln!(self.out, "  FATAL: {problem}")?;
                }
            },
            Ok(tree) => {
                for problem in &tree.problems {
                    writeln!(self.out, "  ERR: {problem}")?;
                }
                for message in &tree.messages {
                    writeln!(self.out, "  MSG: {message}")?;
                }
            },
        }
        return Ok(());
    }

    fn tree(&mut self, tree: &ResolvedTree) -> Result<(), Error> {
        return self.dump(&tree.root, 1);
    }

    fn edges(&mut self, edges: &[ReferenceEdge]) -> Result<(), Error> {
        for edge in edges {
            writeln!(
                self.out,
                "Reference: {edge} ({} at {}:{}:{})",
                edge.kind,
                edge.location.file.display(),
                edge.location.line,
                edge.location.column
            )?;
        }
        writeln!(self.out, "{} references", edges.len())?;
        return Ok(());
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        return Ok(());
    }
}

// ── JSON ───────────────────────────────────────────────────────────────

/// One resolved artifact in the JSON document.
#[derive(Debug, Serialize)]
struct ArtifactEntry {
    /// `group:artifact:packaging[:classifier]:version`.
    coordinate: String,
    /// 1 for direct dependencies.
    depth: usize,
    /// Artifact file.
    file: PathBuf,
    /// Effective scope.
    scope: &'static str,
}

/// One file outcome in the JSON document.
#[derive(Debug, Serialize)]
struct FileEntry {
    /// Documentation notices.
    messages: Vec<String>,
    /// Whether a tree was produced.
    parsed: bool,
    /// Source file.
    path: PathBuf,
    /// Problems, fatal or not.
    problems: Vec<String>,
}

/// One reference edge in the JSON document.
#[derive(Debug, Serialize)]
struct EdgeEntry {
    /// One-based column.
    column: u32,
    /// Enclosing member, `null` outside any member.
    context: Option<String>,
    /// Source file.
    file: PathBuf,
    /// Method call or field access.
    kind: ReferenceKind,
    /// One-based line.
    line: u32,
    /// Target member, or `unresolved(name)`.
    referenced: String,
    /// Whether the target is bound.
    resolved: bool,
}

/// The whole JSON document.
#[derive(Debug, Default, Serialize)]
struct Report {
    /// Resolved artifacts in selection order.
    artifacts: Vec<ArtifactEntry>,
    /// Reference edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    edges: Option<Vec<EdgeEntry>>,
    /// Tolerated resolution failures.
    failures: Vec<String>,
    /// File outcomes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<FileEntry>,
    /// Source roots.
    source_roots: Vec<PathBuf>,
    /// Full trees.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trees: Vec<serde_json::Value>,
}

/// Collects everything and writes one document on `finish`.
pub struct JsonSink<W: Write> {
    /// Destination.
    out: W,
    /// Document under construction.
    report: Report,
}

impl<W: Write> JsonSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        return Self {
            out,
            report: Report::default(),
        };
    }
}

/// Problems rendered as `line:column: message`.
fn rendered(problems: &[Problem]) -> Vec<String> {
    return problems.iter().map(ToString::to_string).collect();
}

impl<W: Write> DiagnosticsSink for JsonSink<W> {
    fn resolution(&mut self, source_roots: &[PathBuf], resolution: &Resolution) -> Result<(), Error> {
        self.report.source_roots = source_roots.to_vec();
        self.report.artifacts = resolution
            .artifacts
            .iter()
            .map(|a| ArtifactEntry {
                coordinate: a.coordinate.to_string(),
                depth: a.depth,
                file: a.file.clone(),
                scope: a.scope.as_str(),
            })
            .collect();
        self.report.failures = resolution.failures.iter().map(ToString::to_string).collect();
        return Ok(());
    }

    fn file(&mut self, path: &Path, result: &ParseResult) -> Result<(), Error> {
        let entry = match result {
            Err(problems) => FileEntry {
                messages: Vec::new(),
                parsed: false,
                path: path.to_path_buf(),
                problems: rendered(problems),
            },
            Ok(tree) => FileEntry {
                messages: tree.messages.iter().map(ToString::to_string).collect(),
                parsed: true,
                path: path.to_path_buf(),
                problems: rendered(&tree.problems),
            },
        };
        self.report.files.push(entry);
        return Ok(());
    }

    fn tree(&mut self, tree: &ResolvedTree) -> Result<(), Error> {
        self.report.trees.push(serde_json::to_value(tree)?);
        return Ok(());
    }

    fn edges(&mut self, edges: &[ReferenceEdge]) -> Result<(), Error> {
        let entries = edges
            .iter()
            .map(|e| EdgeEntry {
                column: e.location.column,
                context: e.context.member().map(ToString::to_string),
                file: e.location.file.clone(),
                kind: e.kind,
                line: e.location.line,
                referenced: e.referenced.to_string(),
                resolved: e.referenced.is_resolved(),
            })
            .collect();
        self.report.edges = Some(entries);
        return Ok(());
    }

    fn finish(&mut self) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut self.out, &self.report)?;
        writeln!(self.out)?;
        self.out.flush()?;
        return Ok(());
    }
}
