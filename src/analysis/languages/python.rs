//! Python table analyzer using tree-sitter.
//!
//! Finds PyTables table declarations in one Python file:
//!
//! - classes deriving directly from `Table` or `IsDescription`
//! - `<obj>.createTable(...)` calls (may overwrite earlier registrations)
//! - `<obj>.openTable(...)` calls (only register unseen names)
//!
//! and then collects the column assignments of every class that describes
//! one of those tables.

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::literal::{is_true, string_value, unwrap_parens};
use crate::analysis::syntax::first_violation;
use crate::analysis::tables::TableSet;
use crate::analysis::{ParsedFile, SourceAnalyzer};
use crate::dispatch::FileKind;
use crate::error::AnalysisError;
use crate::model::{AnalysisReport, Field};

/// Tree-sitter query for extracting import statements.
const IMPORT_QUERY: &str = r#"
; import module [as alias]
(import_statement) @import

; from module import name [as alias]
(import_from_statement) @import_from
"#;

/// Substrings of a module path that mark it as the table library.
const TABLE_MODULE_MARKERS: &[&str] = &["tables", "pytables"];

/// Base classes that make a class a table declaration.
const TABLE_BASES: &[&str] = &["Table", "IsDescription"];

/// The generic description base; never a container for another table's fields.
const DESCRIPTION_BASE: &str = "IsDescription";

const CREATE_TABLE: &str = "createTable";
const OPEN_TABLE: &str = "openTable";

/// Everything learned from one file before it is turned into a report.
#[derive(Debug)]
pub struct TableFacts {
    /// Local names bound by table-library imports, in source order.
    pub table_imports: Vec<String>,
    /// All registered tables, temporary ones included.
    pub tables: TableSet,
}

/// Arguments of a call, split the way Python binds them.
struct CallArgs<'t> {
    positional: Vec<Node<'t>>,
    keywords: Vec<(&'t str, Node<'t>)>,
}

impl<'t> CallArgs<'t> {
    fn keyword(&self, name: &str) -> Option<Node<'t>> {
        self.keywords
            .iter()
            .find(|(kw, _)| *kw == name)
            .map(|(_, value)| *value)
    }

    fn has_keyword(&self, name: &str) -> bool {
        self.keywords.iter().any(|(kw, _)| *kw == name)
    }
}

pub struct PythonAnalyzer {
    language: Language,
    /// Compiled on first use, then shared by every file and embedded block.
    import_query: OnceCell<Query>,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
            import_query: OnceCell::new(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Parse a Python source, rejecting trees that needed error recovery or
    /// hold constructs Python 3 does not accept.
    pub fn parse(&self, filename: &str, source: &str) -> Result<ParsedFile, AnalysisError> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", filename))?;

        if let Some(message) = first_violation(tree.root_node(), source.as_bytes()) {
            return Err(AnalysisError::Syntax(message));
        }

        Ok(ParsedFile {
            tree,
            source: source.as_bytes().to_vec(),
            path: filename.to_string(),
        })
    }

    /// Run the import scan, table registration and field attachment passes.
    pub fn extract(&self, parsed: &ParsedFile) -> Result<TableFacts, AnalysisError> {
        let table_imports = self.find_table_imports(parsed)?;
        if table_imports.is_empty() {
            tracing::debug!(file = %parsed.path, "no table library imports");
        } else {
            tracing::debug!(file = %parsed.path, aliases = ?table_imports, "table library imports");
        }

        let mut tables = TableSet::new();
        let classes = self.register_tables(parsed, &mut tables);
        self.attach_fields(parsed, &classes, &mut tables);

        Ok(TableFacts {
            table_imports,
            tables,
        })
    }

    fn import_query(&self) -> anyhow::Result<&Query> {
        let query = self
            .import_query
            .get_or_try_init(|| Query::new(&self.language, IMPORT_QUERY))?;
        Ok(query)
    }

    fn find_table_imports(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<String>> {
        let query = self.import_query()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, parsed.root(), &parsed.source[..]);

        let mut aliases: Vec<String> = Vec::new();
        let mut push = |alias: &str| {
            if !aliases.iter().any(|a| a == alias) {
                aliases.push(alias.to_string());
            }
        };

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                match query.capture_names()[capture.index as usize] {
                    "import" => {
                        let mut walker = node.walk();
                        for name in node.children_by_field_name("name", &mut walker) {
                            let (module, alias) = split_alias(parsed, name);
                            if is_table_module(module) {
                                push(alias.unwrap_or(module));
                            }
                        }
                    }
                    "import_from" => {
                        let Some(module) = node
                            .child_by_field_name("module_name")
                            .and_then(|m| module_path(parsed, m))
                        else {
                            continue;
                        };
                        if !is_table_module(module) {
                            continue;
                        }

                        let mut walker = node.walk();
                        for name in node.children_by_field_name("name", &mut walker) {
                            let (imported, alias) = split_alias(parsed, name);
                            push(alias.unwrap_or(imported));
                        }

                        let mut walker = node.walk();
                        if node
                            .named_children(&mut walker)
                            .any(|c| c.kind() == "wildcard_import")
                        {
                            push("*");
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(aliases)
    }

    /// Register tables from class bases and factory calls, in source order.
    ///
    /// Returns every class definition seen, for the field pass.
    fn register_tables<'t>(&self, parsed: &'t ParsedFile, tables: &mut TableSet) -> Vec<Node<'t>> {
        let mut classes = Vec::new();

        for_each_node(parsed.root(), |node| match node.kind() {
            "class_definition" => {
                classes.push(node);
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let declares_table = base_names(parsed, node)
                    .iter()
                    .any(|base| TABLE_BASES.contains(base));
                if declares_table {
                    tables.register_class(parsed.node_text(name));
                }
            }
            "call" => self.register_call(parsed, node, tables),
            _ => {}
        });

        classes
    }

    fn register_call(&self, parsed: &ParsedFile, call: Node, tables: &mut TableSet) {
        let Some(method) = called_method(parsed, call) else {
            return;
        };
        if method != CREATE_TABLE && method != OPEN_TABLE {
            return;
        }

        let args = call_args(parsed, call);
        let source = &parsed.source[..];
        let name_kw = args.keyword("name").and_then(|v| string_value(v, source));

        if method == CREATE_TABLE {
            // createTable(where, name, description, ...)
            let Some(name) = name_kw.or_else(|| {
                args.positional
                    .get(1)
                    .and_then(|n| string_value(*n, source))
            }) else {
                return;
            };
            // Any expectedrows hint counts as temporary. This is a heuristic:
            // permanent tables pass it for preallocation too.
            let temporary = args.has_keyword("expectedrows")
                || args.keyword("temp").map(is_true).unwrap_or(false);
            let variable = assigned_variable(parsed, call);
            tables.register_created(&name, variable, temporary);
        } else {
            // openTable(name, ...)
            let Some(name) = name_kw.or_else(|| {
                args.positional
                    .first()
                    .and_then(|n| string_value(*n, source))
            }) else {
                return;
            };
            let variable = assigned_variable(parsed, call);
            tables.register_opened(&name, variable);
        }
    }

    fn attach_fields(&self, parsed: &ParsedFile, classes: &[Node], tables: &mut TableSet) {
        for class in classes {
            let Some(table) = container_table(parsed, *class, tables) else {
                continue;
            };
            let Some(body) = class.child_by_field_name("body") else {
                continue;
            };

            let mut walker = body.walk();
            for stmt in body.named_children(&mut walker) {
                if let Some(field) = field_from_statement(parsed, stmt) {
                    tables.attach(&table, field);
                }
            }
        }
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for PythonAnalyzer {
    fn kind(&self) -> FileKind {
        FileKind::Python
    }

    fn analyze(&self, filename: &str, source: &str) -> AnalysisReport {
        let facts = self
            .parse(filename, source)
            .and_then(|parsed| self.extract(&parsed));

        match facts {
            Ok(facts) => {
                let report = facts.tables.into_report(filename);
                tracing::debug!(
                    file = filename,
                    tables = report.tables.len(),
                    fields = report.field_count(),
                    "analyzed python source"
                );
                report
            }
            Err(err) => {
                tracing::warn!(file = filename, "{}", err);
                AnalysisReport::failed(filename, &err)
            }
        }
    }
}

/// Visit every node in pre-order (source order) without recursion.
fn for_each_node<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn is_table_module(module: &str) -> bool {
    TABLE_MODULE_MARKERS.iter().any(|marker| module.contains(marker))
}

/// Split `a.b as c` into (`a.b`, Some(`c`)); plain names have no alias.
fn split_alias<'a>(parsed: &'a ParsedFile, node: Node) -> (&'a str, Option<&'a str>) {
    if node.kind() == "aliased_import" {
        let name = node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n))
            .unwrap_or("");
        let alias = node
            .child_by_field_name("alias")
            .map(|n| parsed.node_text(n));
        (name, alias)
    } else {
        (parsed.node_text(node), None)
    }
}

/// Module path of a `from` import. `from . import x` has none.
fn module_path<'a>(parsed: &'a ParsedFile, node: Node) -> Option<&'a str> {
    match node.kind() {
        "dotted_name" => Some(parsed.node_text(node)),
        "relative_import" => {
            let mut walker = node.walk();
            let dotted = node
                .named_children(&mut walker)
                .find(|c| c.kind() == "dotted_name");
            dotted.map(|d| parsed.node_text(d))
        }
        _ => None,
    }
}

/// Plain-name base classes of a class definition, in order.
fn base_names<'a>(parsed: &'a ParsedFile, class: Node) -> Vec<&'a str> {
    let Some(superclasses) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut walker = superclasses.walk();
    superclasses
        .named_children(&mut walker)
        .filter(|base| base.kind() == "identifier")
        .map(|base| parsed.node_text(base))
        .collect()
}

/// Attribute name of `obj.attr(...)` calls.
fn called_method<'a>(parsed: &'a ParsedFile, call: Node) -> Option<&'a str> {
    let function = unwrap_parens(call.child_by_field_name("function")?);
    if function.kind() != "attribute" {
        return None;
    }
    function
        .child_by_field_name("attribute")
        .map(|attr| parsed.node_text(attr))
}

fn call_args<'t>(parsed: &'t ParsedFile, call: Node<'t>) -> CallArgs<'t> {
    let mut args = CallArgs {
        positional: Vec::new(),
        keywords: Vec::new(),
    };

    // f(x for x in y) carries a generator_expression instead of an argument list.
    let Some(list) = call
        .child_by_field_name("arguments")
        .filter(|a| a.kind() == "argument_list")
    else {
        return args;
    };

    let mut walker = list.walk();
    for arg in list.named_children(&mut walker) {
        match arg.kind() {
            "keyword_argument" => {
                if let (Some(name), Some(value)) = (
                    arg.child_by_field_name("name"),
                    arg.child_by_field_name("value"),
                ) {
                    args.keywords.push((parsed.node_text(name), value));
                }
            }
            "dictionary_splat" | "comment" => {}
            _ => args.positional.push(arg),
        }
    }

    args
}

/// Target of `name = <call>` when the call is the whole right-hand side.
///
/// Chained (`a = b = call()`), annotated and unpacking assignments have
/// no single plain target and yield `None`.
fn assigned_variable(parsed: &ParsedFile, call: Node) -> Option<String> {
    let mut value = call;
    let mut parent = call.parent()?;
    while parent.kind() == "parenthesized_expression" {
        value = parent;
        parent = parent.parent()?;
    }

    if parent.kind() != "assignment" || parent.child_by_field_name("type").is_some() {
        return None;
    }
    if parent.child_by_field_name("right")?.id() != value.id() {
        return None;
    }
    if parent.parent().is_some_and(|p| p.kind() == "assignment") {
        return None;
    }

    let target = parent.child_by_field_name("left")?;
    (target.kind() == "identifier").then(|| parsed.node_text(target).to_string())
}

/// Which registered table a class contributes fields to, if any.
fn container_table(parsed: &ParsedFile, class: Node, tables: &TableSet) -> Option<String> {
    let inherited = base_names(parsed, class)
        .into_iter()
        .filter(|base| *base != DESCRIPTION_BASE)
        .find(|base| tables.contains(base));
    if let Some(base) = inherited {
        return Some(base.to_string());
    }

    let name = parsed.node_text(class.child_by_field_name("name")?);
    tables.contains(name).then(|| name.to_string())
}

/// A field from a top-level `name = <expr>` statement of a class body.
fn field_from_statement(parsed: &ParsedFile, stmt: Node) -> Option<Field> {
    if stmt.kind() != "expression_statement" {
        return None;
    }

    let mut walker = stmt.walk();
    let mut exprs = stmt
        .named_children(&mut walker)
        .filter(|c| c.kind() != "comment");
    let assignment = exprs.next()?;
    if exprs.next().is_some() || assignment.kind() != "assignment" {
        return None;
    }
    if assignment.child_by_field_name("type").is_some() {
        return None;
    }

    let target = assignment.child_by_field_name("left")?;
    let value = assignment.child_by_field_name("right")?;
    if target.kind() != "identifier" || value.kind() == "assignment" {
        return None;
    }

    let value = unwrap_parens(value);
    let declared_type = if value.kind() == "call" {
        value
            .child_by_field_name("function")
            .filter(|f| f.kind() == "identifier")
            .map(|f| parsed.node_text(f).to_string())
    } else {
        None
    };

    Some(Field::new(parsed.node_text(target), declared_type))
}
