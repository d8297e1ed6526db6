//! Syntax validation for parsed Python trees.
//!
//! tree-sitter recovers from malformed input, and the Python grammar also
//! accepts constructs the Python 3 compiler rejects: Python 2 `print` and
//! `exec` statements, misordered or repeated call arguments, defaults
//! followed by plain parameters, and statements of one block starting in
//! different columns. A tree is only analyzed when none of these occur.

use tree_sitter::Node;

/// Describe the first syntax problem in source order, if there is one.
pub fn first_violation(root: Node, source: &[u8]) -> Option<String> {
    if root.has_error() {
        return Some(match first_error_node(root) {
            Some(node) => describe_error_node(node),
            None => "invalid syntax".to_string(),
        });
    }

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if let Some(message) = check_node(node, source) {
            return Some(message);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// First ERROR or MISSING node in source order, descending only into
/// subtrees that contain one.
fn first_error_node(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn describe_error_node(node: Node) -> String {
    if node.is_missing() {
        at(&format!("missing {:?}", node.kind()), node)
    } else {
        at("invalid syntax", node)
    }
}

fn at(what: &str, node: Node) -> String {
    let pos = node.start_position();
    format!("{} at line {}, column {}", what, pos.row + 1, pos.column + 1)
}

fn check_node(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "print_statement" => Some(at("Python 2 print statement", node)),
        "exec_statement" => Some(at("Python 2 exec statement", node)),
        "argument_list" => check_arguments(node, source),
        "parameters" | "lambda_parameters" => check_parameters(node),
        "module" => check_indentation(node, source, Some(0)),
        "block" => check_indentation(node, source, None),
        _ => None,
    }
}

/// Call arguments: positional, then keywords and `*args`, then `**kwargs`
/// and keywords. Keyword names are unique.
fn check_arguments(list: Node, source: &[u8]) -> Option<String> {
    let mut keywords: Vec<&str> = Vec::new();
    let mut seen_keyword = false;
    let mut seen_kwargs = false;

    let mut walker = list.walk();
    for arg in list.named_children(&mut walker) {
        match arg.kind() {
            "comment" => {}
            "keyword_argument" => {
                seen_keyword = true;
                let Some(name) = arg.child_by_field_name("name") else {
                    continue;
                };
                let name = name.utf8_text(source).unwrap_or("");
                if keywords.contains(&name) {
                    return Some(at(&format!("keyword argument repeated: {}", name), arg));
                }
                keywords.push(name);
            }
            "dictionary_splat" => seen_kwargs = true,
            "list_splat" => {
                if seen_kwargs {
                    return Some(at(
                        "iterable argument unpacking follows keyword argument unpacking",
                        arg,
                    ));
                }
            }
            _ => {
                if seen_kwargs {
                    return Some(at(
                        "positional argument follows keyword argument unpacking",
                        arg,
                    ));
                }
                if seen_keyword {
                    return Some(at("positional argument follows keyword argument", arg));
                }
            }
        }
    }

    None
}

/// Once a parameter has a default, every later positional one needs one
/// too. Parameters after `*` or `*args` are keyword-only and exempt.
fn check_parameters(params: Node) -> Option<String> {
    let mut seen_default = false;

    let mut walker = params.walk();
    for param in params.named_children(&mut walker) {
        let kind = match param.kind() {
            // `*args: T` and `**kw: T` are typed_parameter wrappers.
            "typed_parameter" => param
                .named_child(0)
                .map(|inner| inner.kind())
                .unwrap_or("typed_parameter"),
            kind => kind,
        };

        match kind {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "list_splat_pattern" | "keyword_separator" | "dictionary_splat_pattern" => {
                return None
            }
            "identifier" | "tuple_pattern" => {
                if seen_default {
                    return Some(at(
                        "parameter without a default follows parameter with a default",
                        param,
                    ));
                }
            }
            _ => {}
        }
    }

    None
}

/// Statements of one suite that start their own line share a column.
/// Module-level statements start in column one.
fn check_indentation(body: Node, source: &[u8], expected: Option<usize>) -> Option<String> {
    let mut expected = expected;

    let mut walker = body.walk();
    for stmt in body.named_children(&mut walker) {
        if stmt.kind() == "comment" || !starts_line(stmt, source) {
            continue;
        }
        let column = stmt.start_position().column;
        match expected {
            None => expected = Some(column),
            Some(col) if column > col => return Some(at("unexpected indent", stmt)),
            Some(col) if column < col => {
                return Some(at(
                    "unindent does not match any outer indentation level",
                    stmt,
                ))
            }
            Some(_) => {}
        }
    }

    None
}

/// Whether only whitespace precedes the node on its line.
fn starts_line(node: Node, source: &[u8]) -> bool {
    source[..node.start_byte()]
        .iter()
        .rev()
        .take_while(|b| **b != b'\n')
        .all(|b| matches!(b, b' ' | b'\t' | b'\x0c'))
}
