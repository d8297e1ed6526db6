//! Helpers for reading literal values out of tree-sitter-python nodes.

use tree_sitter::Node;

/// Strip any number of redundant parentheses around an expression.
pub fn unwrap_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Whether the expression is the literal `True`.
pub fn is_true(node: Node) -> bool {
    unwrap_parens(node).kind() == "true"
}

/// Value of a plain string literal, or `None` for anything else.
///
/// Implicit concatenation (`"a" "b"`) is folded. F-strings and bytes
/// literals are not plain strings.
pub fn string_value(node: Node, source: &[u8]) -> Option<String> {
    let node = unwrap_parens(node);
    match node.kind() {
        "string" => single_string_value(node, source),
        "concatenated_string" => {
            let mut cursor = node.walk();
            let mut value = String::new();
            for part in node.named_children(&mut cursor) {
                match part.kind() {
                    "string" => value.push_str(&single_string_value(part, source)?),
                    "comment" => {}
                    _ => return None,
                }
            }
            Some(value)
        }
        _ => None,
    }
}

fn single_string_value(node: Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let mut raw = false;
    let mut value = String::new();

    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let start = child.utf8_text(source).ok()?;
                let prefix: String = start
                    .chars()
                    .take_while(|c| *c != '"' && *c != '\'')
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                if prefix.contains('f') || prefix.contains('b') || prefix.contains('t') {
                    return None;
                }
                raw = prefix.contains('r');
            }
            "string_content" | "escape_sequence" => {
                let text = child.utf8_text(source).ok()?;
                if raw {
                    value.push_str(text);
                } else {
                    value.push_str(&unescape(text));
                }
            }
            "interpolation" => return None,
            _ => {}
        }
    }

    Some(value)
}

/// Decode Python backslash escapes. Unknown escapes are kept verbatim,
/// which is what the interpreter does.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            'x' => push_hex(&mut out, &mut chars, 2, 'x'),
            'u' => push_hex(&mut out, &mut chars, 4, 'u'),
            'U' => push_hex(&mut out, &mut chars, 8, 'U'),
            '0'..='7' => {
                let mut code = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

fn push_hex(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
    marker: char,
) {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(d) if d.is_ascii_hexdigit() => {
                digits.push(*d);
                chars.next();
            }
            _ => break,
        }
    }

    let decoded = if digits.len() == width {
        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
    } else {
        None
    };

    match decoded {
        Some(ch) => out.push(ch),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    /// Parse `value = <expr>` and hand the right-hand side to `f`.
    fn with_rhs<T>(expr: &str, f: impl FnOnce(Node, &[u8]) -> T) -> T {
        let source = format!("value = {}\n", expr);
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source.as_bytes(), None).unwrap();
        let root = tree.root_node();
        let stmt = root.named_child(0).unwrap();
        let assignment = stmt.named_child(0).unwrap();
        let rhs = assignment.child_by_field_name("right").unwrap();
        f(rhs, source.as_bytes())
    }

    #[test]
    fn test_plain_strings() {
        assert_eq!(with_rhs("'orders'", string_value), Some("orders".to_string()));
        assert_eq!(with_rhs("\"orders\"", string_value), Some("orders".to_string()));
        assert_eq!(with_rhs("(('orders'))", string_value), Some("orders".to_string()));
        assert_eq!(with_rhs("''", string_value), Some(String::new()));
    }

    #[test]
    fn test_escapes_and_raw() {
        assert_eq!(with_rhs(r#""a\tb""#, string_value), Some("a\tb".to_string()));
        assert_eq!(with_rhs(r#""\x41é""#, string_value), Some("Aé".to_string()));
        assert_eq!(with_rhs(r#"r"a\tb""#, string_value), Some(r"a\tb".to_string()));
        assert_eq!(with_rhs(r#""a\qb""#, string_value), Some(r"a\qb".to_string()));
    }

    #[test]
    fn test_concatenated() {
        assert_eq!(
            with_rhs("'ord' \"ers\"", string_value),
            Some("orders".to_string())
        );
    }

    #[test]
    fn test_non_literals() {
        assert_eq!(with_rhs("f'{x}'", string_value), None);
        assert_eq!(with_rhs("b'orders'", string_value), None);
        assert_eq!(with_rhs("name", string_value), None);
        assert_eq!(with_rhs("42", string_value), None);
    }

    #[test]
    fn test_true_literal() {
        assert!(with_rhs("True", |n, _| is_true(n)));
        assert!(with_rhs("(True)", |n, _| is_true(n)));
        assert!(!with_rhs("False", |n, _| is_true(n)));
        assert!(!with_rhs("1", |n, _| is_true(n)));
        assert!(!with_rhs("'True'", |n, _| is_true(n)));
    }
}
