use std::fmt::Write as _;

use crate::error::{Error, FetchError, ModelError, ResolutionError};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a fatal error as a structured markdown diagnostic: what happened,
/// which coordinate or file, and how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::Model(model) => render_model_error(model),
        Error::Resolution(resolution) => render_resolution_error(resolution),
        Error::UnsupportedRepository { location } => render_unsupported_repository(location),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid Config

`.refgraph.toml` could not be read:

{e}

## Fix

Keys: `repositories`, `boot-classpath`, `conflict`, `missing-artifacts`, `test-sources`.
"),
        Error::Json(e) => format!("\
# Error: JSON Output

{e}
"),
        Error::Archive { path, reason } => format!("\
# Error: Unreadable Archive

`{}` is not a readable jar: {reason}
", path.display()),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_model_error(e: &ModelError) -> String {
    match e {
        ModelError::ManifestNotFound { path } => format!("\
# Error: Manifest Not Found

`{}` does not exist.

## Fix

Run refgraph from a Maven project root, or pass the root:

    refgraph scan path/to/project
", path.display()),

        ModelError::ManifestMalformed { path, reason } => format!("\
# Error: Malformed Manifest

`{}` is not a valid POM: {reason}
", path.display()),

        ModelError::Io { path, source } => format!("\
# Error: Manifest Unreadable

`{}` could not be read: {source}
", path.display()),

        ModelError::SourceRootMissing { path } => format!("\
# Error: Source Root Missing

The POM declares `{}`, which does not exist.

## Fix

Create the directory, or correct `<sourceDirectory>` / `<testSourceDirectory>` in `pom.xml`.
", path.display()),

        ModelError::NoSourceRoots { root } => format!("\
# Error: No Source Roots

`{}` has no compile source root (`src/main/java` by default).
", root.display()),
    }
}

fn render_resolution_error(e: &ResolutionError) -> String {
    match e {
        ResolutionError::MissingVersion { key, required_by } => format!("\
# Error: Missing Version

`{key}` (required by `{required_by}`) has no version, declared or managed.

## Fix

Add a `<version>` to the dependency, or manage it in `<dependencyManagement>`.
"),
        ResolutionError::Unresolvable { coordinate, required_by, source } => {
            render_unresolvable(coordinate, required_by, source)
        },
    }
}

fn render_unresolvable(coordinate: &str, required_by: &str, source: &FetchError) -> String {
    let mut out = format!("\
# Error: Unresolvable Artifact

`{coordinate}` (required by `{required_by}`) could not be resolved: {source}
");

    if let FetchError::NotFound { searched, .. } = source {
        out.push_str("\n## Searched\n\n");
        for root in searched {
            let _ = writeln!(out, "- {}", root.display());
        }
    }

    out.push_str("\
\n## Fix

Install the artifact into a local repository, add the repository to
`repositories` in `.refgraph.toml`, or tolerate missing artifacts:

    missing-artifacts = \"partial\"
");
    out
}

fn render_unsupported_repository(location: &str) -> String {
    format!(
        "\
# Error: Unsupported Repository

`{location}` is not a local directory. Remote repositories are not fetched.

## Fix

Point `repositories` in `.refgraph.toml` at a local Maven repository, e.g.:

    repositories = [\"~/.m2/repository\"]
"
    )
}

fn render_unsupported_language(ext: &str) -> String {
    format!(
        "\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

- `.java` (Java)
"
    )
}
