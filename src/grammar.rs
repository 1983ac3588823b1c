/// Tree-sitter grammar resolution by file extension.
use std::path::Path;

use tree_sitter::Language;

use crate::error::Error;

/// The Java grammar.
pub fn java() -> Language {
    return tree_sitter_java::LANGUAGE.into();
}

/// Map a file extension to its tree-sitter language. Only Java sources are parsed.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for anything but `.java`.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        "java" => Ok(java()),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}

/// Whether `path` names a Java source file.
pub fn is_java_source(path: &Path) -> bool {
    return path.extension().is_some_and(|e| e == "java");
}
