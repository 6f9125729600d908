//! Canonical structural fingerprints for expressions.
//!
//! A fingerprint is a prefix S-expression over the syntax tree: named inner
//! nodes render as `kind(child child ...)`, named leaves as `kind:text`,
//! operators and keywords as their whitespace-collapsed text. Punctuation,
//! comments, and redundant parentheses are dropped, and string quoting is
//! normalized, so layout never affects the result.

use tree_sitter::Node;

use crate::extract::parser::ParsedUnit;
use crate::models::ValueCategory;

const PUNCTUATION: &[&str] = &["(", ")", "[", "]", "{", "}", ",", ":", ";"];

const CONSTANT_KINDS: &[&str] = &[
    "integer",
    "float",
    "string",
    "concatenated_string",
    "true",
    "false",
    "none",
    "ellipsis",
];

/// Fingerprint of the expression rooted at `node`.
pub fn fingerprint(unit: &ParsedUnit<'_>, node: Node<'_>) -> String {
    render(unit, unwrap_parens(node))
}

/// Coarse category of an assigned value.
pub fn value_category(node: Node<'_>) -> ValueCategory {
    let node = unwrap_parens(node);
    match node.kind() {
        "identifier" => ValueCategory::Name,
        _ if is_interpolated(node) => ValueCategory::Expression,
        kind if CONSTANT_KINDS.contains(&kind) => ValueCategory::Constant,
        _ => ValueCategory::Expression,
    }
}

/// Whether a string literal (or any part of a concatenation) holds an
/// f-string interpolation.
fn is_interpolated(node: Node<'_>) -> bool {
    match node.kind() {
        "string" => {
            let mut cursor = node.walk();
            let found = node
                .children(&mut cursor)
                .any(|c| c.kind() == "interpolation");
            found
        }
        "concatenated_string" => {
            let mut cursor = node.walk();
            let found = node.named_children(&mut cursor).any(is_interpolated);
            found
        }
        _ => false,
    }
}

/// Strip any number of enclosing `( ... )` around a single expression.
pub fn unwrap_parens(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        let mut cursor = node.walk();
        let inner: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| !c.is_extra())
            .collect();
        match inner.as_slice() {
            [only] => node = *only,
            _ => break,
        }
    }
    node
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render(unit: &ParsedUnit<'_>, node: Node<'_>) -> String {
    let node = unwrap_parens(node);
    let text = unit.text(node);

    if node.kind() == "string" {
        return render_string(unit, node);
    }
    if node.child_count() == 0 {
        if node.is_named() {
            return format!("{}:{}", node.kind(), text);
        }
        let token = collapse(text);
        if PUNCTUATION.contains(&token.as_str()) {
            return String::new();
        }
        return token;
    }
    if !node.is_named() {
        return collapse(text);
    }

    let mut cursor = node.walk();
    let parts: Vec<String> = node
        .children(&mut cursor)
        .filter(|c| !c.is_extra())
        .map(|c| render(unit, c))
        .filter(|s| !s.is_empty())
        .collect();
    format!("{}({})", node.kind(), parts.join(" "))
}

/// Strings render as `string<prefix>:"<content>"`, with interpolations
/// fingerprinted inside braces. Quote style and triple-quoting vanish.
fn render_string(unit: &ParsedUnit<'_>, node: Node<'_>) -> String {
    let mut prefix = String::new();
    let mut content = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                prefix = unit
                    .text(child)
                    .trim_end_matches(['"', '\''])
                    .to_lowercase();
            }
            "string_end" => {}
            "interpolation" => {
                content.push('{');
                content.push_str(&render(unit, child));
                content.push('}');
            }
            _ if prefix.contains('r') => content.push_str(unit.text(child)),
            _ => content.push_str(&unescape_quotes(unit.text(child))),
        }
    }
    format!("string{prefix}:{content:?}")
}

/// Decode `\'` and `\"` so `'it\'s'` and `"it's"` agree. Every other
/// escape is kept as written.
fn unescape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(q @ ('\'' | '"')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parser::parse_python;

    /// Fingerprint the right-hand side of `x = <expr>`.
    fn fp(expr: &str) -> String {
        let source = format!("x = {expr}\n");
        let unit = parse_python(&source).unwrap();
        let statement = unit.root().named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        let right = assignment.child_by_field_name("right").unwrap();
        fingerprint(&unit, right)
    }

    fn category(expr: &str) -> ValueCategory {
        let source = format!("x = {expr}\n");
        let unit = parse_python(&source).unwrap();
        let statement = unit.root().named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        value_category(assignment.child_by_field_name("right").unwrap())
    }

    #[test]
    fn test_whitespace_insensitive() {
        assert_eq!(fp("a+b*2"), fp("a  +  b * 2"));
        assert_eq!(fp("f(1,2)"), fp("f( 1 , 2 )"));
    }

    #[test]
    fn test_redundant_parens_ignored() {
        assert_eq!(fp("(a + b)"), fp("a + b"));
        assert_eq!(fp("((1))"), fp("1"));
    }

    #[test]
    fn test_quote_style_ignored() {
        assert_eq!(fp("'hello'"), fp("\"hello\""));
        assert_ne!(fp("'hello'"), fp("'world'"));
        assert_ne!(fp("'hello'"), fp("b'hello'"));
    }

    #[test]
    fn test_escaped_quotes_match_unescaped() {
        assert_eq!(fp(r"'it\'s'"), fp(r#""it's""#));
        assert_eq!(fp(r#""say \"hi\"""#), fp(r#"'say "hi"'"#));
        assert_ne!(fp(r"'a\nb'"), fp("'anb'"));
        assert_ne!(fp(r"r'it\'s'"), fp(r#"r"it's""#));
    }

    #[test]
    fn test_structural_differences_detected() {
        assert_ne!(fp("a + b"), fp("a - b"));
        assert_ne!(fp("1 + 1"), fp("2"));
        assert_ne!(fp("f(a)"), fp("f(a, b)"));
        assert_ne!(fp("[1, 2]"), fp("(1, 2)"));
    }

    #[test]
    fn test_comment_in_expression_ignored() {
        assert_eq!(fp("[\n    1,  # one\n    2,\n]"), fp("[1, 2]"));
    }

    #[test]
    fn test_leaf_rendering() {
        assert_eq!(fp("42"), "integer:42");
        assert_eq!(fp("other"), "identifier:other");
    }

    #[test]
    fn test_value_categories() {
        assert_eq!(category("1"), ValueCategory::Constant);
        assert_eq!(category("'s'"), ValueCategory::Constant);
        assert_eq!(category("None"), ValueCategory::Constant);
        assert_eq!(category("(True)"), ValueCategory::Constant);
        assert_eq!(category("other"), ValueCategory::Name);
        assert_eq!(category("f(1)"), ValueCategory::Expression);
        assert_eq!(category("[1]"), ValueCategory::Expression);
        assert_eq!(category("-1"), ValueCategory::Expression);
    }

    #[test]
    fn test_interpolated_strings_are_expressions() {
        assert_eq!(category("f\"hi {user}\""), ValueCategory::Expression);
        assert_eq!(category("'a' f'{b}'"), ValueCategory::Expression);
        assert_eq!(category("f'plain'"), ValueCategory::Constant);
        assert_eq!(category("'a' 'b'"), ValueCategory::Constant);
    }
}
