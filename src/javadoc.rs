/// Javadoc block-tag checks on method and constructor declarations.
use tree_sitter::Node;

use crate::declarations::{parameter_names, text};
use crate::tree::{Message, Span};

/// Tags and notices of one declaration's doc comment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DocCheck {
    /// Notices about tags that don't match the declaration.
    pub messages: Vec<Message>,
    /// Block tags with their first argument, e.g. `@param who`, `@return`.
    pub tags: Vec<String>,
}

/// The `/** ... */` comment directly preceding `declaration`, if any.
fn doc_comment<'t>(declaration: Node<'t>, source: &str) -> Option<Node<'t>> {
    let previous = declaration.prev_named_sibling()?;
    if previous.kind() != "block_comment" || !text(previous, source).starts_with("/**") {
        return None;
    }
    return Some(previous);
}

/// Block tags of a doc comment body, in order.
fn block_tags(comment: &str) -> Vec<(String, Option<String>)> {
    let body = comment.trim_start_matches("/**").trim_end_matches("*/");
    let mut tags = Vec::new();
    for line in body.lines() {
        let line = line.trim_start().trim_start_matches('*').trim_start();
        let Some(rest) = line.strip_prefix('@') else {
            continue;
        };
        let mut words = rest.split_whitespace();
        let Some(tag) = words.next() else {
            continue;
        };
        tags.push((tag.to_string(), words.next().map(str::to_string)));
    }
    return tags;
}

/// Check the doc comment of a method, constructor or compact constructor.
pub fn check(declaration: Node<'_>, source: &str) -> DocCheck {
    let Some(comment) = doc_comment(declaration, source) else {
        return DocCheck::default();
    };
    let span = Span::of(comment);
    let declared = declaration
        .child_by_field_name("parameters")
        .map(|p| parameter_names(p, source))
        .unwrap_or_default();
    let returns_nothing = match declaration.kind() {
        "constructor_declaration" | "compact_constructor_declaration" => true,
        _ => declaration
            .child_by_field_name("type")
            .is_none_or(|t| t.kind() == "void_type"),
    };

    let mut result = DocCheck::default();
    for (tag, argument) in block_tags(text(comment, source)) {
        match (tag.as_str(), argument.as_deref()) {
            ("param", Some(name)) if !name.starts_with('<') && !declared.contains(&name) => {
                result.messages.push(Message {
                    message: format!("Javadoc: Parameter {name} is not declared"),
                    span,
                });
            },
            ("param", None) => result.messages.push(Message {
                message: "Javadoc: Missing parameter name".to_string(),
                span,
            }),
            ("return", _) if returns_nothing => result.messages.push(Message {
                message: "Javadoc: Unexpected @return tag, the declaration returns nothing".to_string(),
                span,
            }),
            _ => {},
        }
        let rendered = match (&tag, &argument) {
            (t, Some(a)) if t == "param" || t == "throws" || t == "exception" => format!("@{t} {a}"),
            (t, _) => format!("@{t}"),
        };
        result.tags.push(rendered);
    }
    return result;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar;

    /// Run `check` on the first method or constructor of `source`.
    fn check_first(source: &str) -> DocCheck {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&grammar::java()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let mut cursor = body.walk();
        let declaration = body
            .named_children(&mut cursor)
            .find(|n| n.kind().ends_with("_declaration"))
            .unwrap();
        check(declaration, source)
    }

    #[test]
    fn undeclared_param_is_reported() {
        let result = check_first(
            "class A {\n  /**\n   * Greets.\n   * @param who person\n   * @param extra nope\n   * @return text\n   */\n  String greet(String who) { return who; }\n}\n",
        );
        assert_eq!(result.tags, vec!["@param who", "@param extra", "@return"]);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].message, "Javadoc: Parameter extra is not declared");
        assert_eq!(result.messages[0].span.line, 2);
    }

    #[test]
    fn return_on_void_and_constructor() {
        let void = check_first("class A {\n  /** @return nothing */\n  void run() {}\n}\n");
        assert_eq!(void.messages.len(), 1);
        let constructor = check_first("class A {\n  /** @return nothing */\n  A() {}\n}\n");
        assert_eq!(constructor.messages.len(), 1);
    }

    #[test]
    fn plain_comments_and_type_params_are_ignored() {
        let plain = check_first("class A {\n  /* @param x */\n  void run() {}\n}\n");
        assert_eq!(plain, DocCheck::default());
        let generic = check_first("class A {\n  /** @param <T> type */\n  <T> void run() {}\n}\n");
        assert!(generic.messages.is_empty());
    }
}
