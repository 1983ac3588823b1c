/// Source discovery, parsing and binding of every file under the source roots.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tree_sitter::{Node, Parser, Tree};

use crate::binder;
use crate::classpath;
use crate::declarations::{self, FileDeclarations};
use crate::grammar;
use crate::symbols::{TypeDecl, TypeTable};
use crate::tree::{ParseResult, Problem, ProblemKind, Span};
use crate::types::ClasspathEntries;

/// Maximum source file size (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// A file that parsed into a usable tree.
struct ParsedFile {
    /// File path.
    path: PathBuf,
    /// File content.
    source: String,
    /// Concrete syntax tree.
    tree: Tree,
}

/// All `.java` files under `roots`, sorted, each listed once.
pub fn discover(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for root in roots {
        let walker = walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "skipping unreadable path");
                    None
                },
            });
        for entry in walker {
            if entry.file_type().is_file() && grammar::is_java_source(entry.path()) {
                files.insert(entry.into_path());
            }
        }
    }
    return files.into_iter().collect();
}

/// Parse and bind `source_files`. Declarations of every Java file under
/// `source_roots` and of every type on `classpath` are visible to them.
/// Returns one result per requested file, keyed by path.
pub fn parse_all(
    source_files: &[PathBuf],
    classpath: &ClasspathEntries,
    source_roots: &[PathBuf],
) -> BTreeMap<PathBuf, ParseResult> {
    let requested: BTreeSet<PathBuf> = source_files.iter().cloned().collect();
    let mut files: BTreeSet<PathBuf> = discover(source_roots).into_iter().collect();
    files.extend(requested.iter().cloned());
    tracing::info!(requested = requested.len(), visible = files.len(), "parsing sources");

    let sources: Vec<(PathBuf, Result<String, Problem>)> = files
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|path| {
            let source = read_source(&path);
            return (path, source);
        })
        .collect();
    let classpath_types = classpath::load(classpath);
    tracing::info!(types = classpath_types.len(), "classpath loaded");

    let mut results = bind_sources(sources, classpath_types);
    results.retain(|path, _| return requested.contains(path));
    return results;
}

/// Parse and bind already-read sources. A source that failed to read is
/// reported as a fatal problem for its file.
pub fn bind_sources(
    sources: Vec<(PathBuf, Result<String, Problem>)>,
    classpath_types: Vec<TypeDecl>,
) -> BTreeMap<PathBuf, ParseResult> {
    let mut results = BTreeMap::new();
    let outcomes: Vec<(PathBuf, Result<ParsedFile, Vec<Problem>>)> = sources
        .into_par_iter()
        .map(|(path, source)| {
            let parsed = match source {
                Ok(source) => parse_file(path.clone(), source),
                Err(problem) => Err(vec![problem]),
            };
            return (path, parsed);
        })
        .collect();

    let mut parsed = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(file) => parsed.push(file),
            Err(problems) => {
                tracing::warn!(file = %path.display(), problems = problems.len(), "file not parsed");
                results.insert(path, Err(problems));
            },
        }
    }

    let declared: Vec<FileDeclarations> = parsed
        .par_iter()
        .map(|f| return declarations::collect(&f.path, f.tree.root_node(), &f.source))
        .collect();
    let table = TypeTable::build(&declared, classpath_types);

    let bound: Vec<(PathBuf, ParseResult)> = parsed
        .par_iter()
        .zip(declared.par_iter())
        .map(|(file, declarations)| {
            let tree = binder::bind(&file.path, &file.source, file.tree.root_node(), declarations, &table);
            return (file.path.clone(), Ok(tree));
        })
        .collect();
    results.extend(bound);
    return results;
}

/// Read one source file.
///
/// # Errors
///
/// Returns an `Unreadable` problem for unreadable files, files over the
/// size limit and content that is not UTF-8.
fn read_source(path: &Path) -> Result<String, Problem> {
    let size = std::fs::metadata(path)
        .map_err(|e| return unreadable(format!("cannot read file: {e}")))?
        .len();
    if size > MAX_FILE_SIZE {
        return Err(unreadable(format!("file is {size} bytes (max {MAX_FILE_SIZE})")));
    }
    let bytes = std::fs::read(path).map_err(|e| return unreadable(format!("cannot read file: {e}")))?;
    return String::from_utf8(bytes).map_err(|_| return unreadable("file is not valid UTF-8".to_string()));
}

/// Parse one source. Syntax errors are recoverable unless nothing of the
/// file could be recognized as a type declaration.
///
/// # Errors
///
/// Returns the file's problems when it has no grammar or produced no usable tree.
fn parse_file(path: PathBuf, source: String) -> Result<ParsedFile, Vec<Problem>> {
    let language = grammar::language_for_path(&path).map_err(|e| return vec![unreadable(e.to_string())])?;
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| return vec![unreadable(format!("grammar rejected: {e}"))])?;
    let Some(tree) = parser.parse(&source, None) else {
        return Err(vec![unreadable("parser produced no tree".to_string())]);
    };
    let root = tree.root_node();
    if root.has_error() && !declares_type(root) {
        let mut problems = syntax_problems(root);
        if problems.is_empty() {
            problems.push(unreadable("no type declaration found".to_string()));
        }
        return Err(problems);
    }
    return Ok(ParsedFile { path, source, tree });
}

/// Whether the compilation unit has a top-level type declaration.
fn declares_type(root: Node<'_>) -> bool {
    return declarations::named_children(root)
        .iter()
        .any(|n| return declarations::is_type_declaration(n.kind()));
}

/// `ERROR` and missing nodes of a tree, outermost only.
fn syntax_problems(root: Node<'_>) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            problems.push(Problem {
                kind: ProblemKind::Syntax,
                message: format!("Syntax error at {}", node.kind()),
                span: Span::of(node),
            });
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    return problems;
}

/// A whole-file problem.
fn unreadable(message: String) -> Problem {
    return Problem {
        kind: ProblemKind::Unreadable,
        message,
        span: Span::default(),
    };
}
