/// Classpath loading: type declarations from jars and class directories.
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;

use crate::classfile;
use crate::error::Error;
use crate::symbols::TypeDecl;
use crate::types::ClasspathEntries;

/// Whether an archive or directory entry is a class worth decoding.
fn is_type_class(name: &str) -> bool {
    return name.ends_with(".class")
        && !name.starts_with("META-INF/")
        && !name.ends_with("module-info.class")
        && !name.ends_with("package-info.class");
}

/// Load every type declared on the classpath, in classpath order. Entries are
/// read in parallel; unreadable entries and corrupt classes are logged and skipped.
pub fn load(classpath: &ClasspathEntries) -> Vec<TypeDecl> {
    let per_entry: Vec<Vec<TypeDecl>> = classpath
        .0
        .par_iter()
        .map(|entry| match load_entry(entry) {
            Ok(types) => {
                tracing::debug!(entry = %entry.display(), types = types.len(), "classpath entry loaded");
                types
            },
            Err(e) => {
                tracing::warn!(entry = %entry.display(), error = %e, "skipping classpath entry");
                Vec::new()
            },
        })
        .collect();
    return per_entry.into_iter().flatten().collect();
}

/// Types of one classpath entry.
///
/// # Errors
///
/// Returns `Error::Io` if the entry cannot be read, or `Error::Archive` for
/// files that are not zip archives.
fn load_entry(entry: &Path) -> Result<Vec<TypeDecl>, Error> {
    if entry.is_dir() {
        return Ok(load_directory(entry));
    }
    return load_archive(entry);
}

/// Types under a class directory, in path order.
fn load_directory(root: &Path) -> Vec<TypeDecl> {
    let mut types = Vec::new();
    let walker = walkdir::WalkDir::new(root).sort_by_file_name().into_iter().filter_map(Result::ok);
    for file in walker {
        let name = file.file_name().to_string_lossy();
        if !file.file_type().is_file() || !is_type_class(&name) {
            continue;
        }
        let decoded = std::fs::read(file.path())
            .map_err(|e| e.to_string())
            .and_then(|bytes| classfile::parse(&bytes, root).map_err(|e| e.to_string()));
        match decoded {
            Ok(decl) => types.push(decl),
            Err(reason) => tracing::warn!(class = %file.path().display(), %reason, "skipping class"),
        }
    }
    return types;
}

/// Types inside a jar, in archive order.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or `Error::Archive` if
/// it is not a readable zip.
fn load_archive(path: &Path) -> Result<Vec<TypeDecl>, Error> {
    let archive_error = |e: zip::result::ZipError| Error::Archive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(archive_error)?;

    let mut types = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        let name = entry.name().to_string();
        if !entry.is_file() || !is_type_class(&name) {
            continue;
        }
        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        if let Err(e) = entry.read_to_end(&mut bytes) {
            tracing::warn!(archive = %path.display(), class = %name, error = %e, "skipping class");
            continue;
        }
        match classfile::parse(&bytes, path) {
            Ok(decl) => types.push(decl),
            Err(e) => tracing::warn!(archive = %path.display(), class = %name, error = %e, "skipping class"),
        }
    }
    return Ok(types);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn fixture(relative: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(relative)
    }

    #[test]
    fn jars_and_directories_load_in_classpath_order() {
        let classpath = ClasspathEntries(vec![
            fixture("repo/com/example/greeting/1.0/greeting-1.0.jar"),
            fixture("classes"),
            fixture("repo/com/example/util/1.0/util-1.0.jar"),
        ]);
        let types = load(&classpath);
        let names: Vec<_> = types.iter().map(|t| t.binary_name.as_str()).collect();

        assert!(names.contains(&"com.example.greeting.AbstractGreeter"));
        assert!(names.contains(&"com.example.greeting.Greeter"));
        let first_formatter = types
            .iter()
            .position(|t| t.binary_name == "com.example.util.Formatter")
            .unwrap();
        let last_greeter = types
            .iter()
            .rposition(|t| t.binary_name == "com.example.greeting.Greeter")
            .unwrap();
        // The class directory sits between the two jars and holds both classes.
        assert!(first_formatter < last_greeter);
    }

    #[test]
    fn missing_entries_are_skipped() {
        let classpath = ClasspathEntries(vec![PathBuf::from("/nonexistent/lib.jar"), fixture("classes")]);
        let types = load(&classpath);
        assert_eq!(types.len(), 2);
    }
}
