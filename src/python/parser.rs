//! Parsing of cell text into the typed AST.
//!
//! Backed by tree-sitter with the Python grammar. The converter turns the
//! concrete syntax tree into the tagged [`crate::python::ast`] variants,
//! collapsing expression forms the analyses treat uniformly into opaque
//! nodes that keep their raw text and name-bearing children.

use tree_sitter::{Node, Parser};

use crate::error::{NbflowError, Result};
use crate::python::ast::{
    Arg, ClassDef, ExceptHandler, Expr, ExprKind, FunctionDef, ImportAlias, Location, Module,
    Parameter, Stmt, StmtKind, WithItem,
};

/// Parse a code fragment into a module.
///
/// A missing trailing newline is tolerated. Any syntax error in the fragment
/// is a parse error; callers that own an execution log downgrade it to an
/// error cell instead of failing the log.
pub fn parse(text: &str) -> Result<Module> {
    let source = if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    };

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| NbflowError::TreeSitter(e.to_string()))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| NbflowError::Parse {
            message: "tree-sitter produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(NbflowError::Parse {
            message: "syntax error in fragment".to_string(),
        });
    }

    let converter = Converter {
        source: source.as_bytes(),
    };
    let code = converter.statement_list(root);
    Ok(Module {
        code,
        location: location_of(root),
    })
}

fn location_of(node: Node) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::new(start.row + 1, start.column, end.row + 1, end.column)
}

struct Converter<'a> {
    source: &'a [u8],
}

impl<'a> Converter<'a> {
    fn text(&self, node: Node) -> &'a str {
        std::str::from_utf8(&self.source[node.start_byte()..node.end_byte()]).unwrap_or("")
    }

    fn named_children(&self, node: Node<'a>) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect()
    }

    fn field_children(&self, node: Node<'a>, field: &str) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.children_by_field_name(field, &mut cursor).collect()
    }

    fn statement_list(&self, block: Node<'a>) -> Vec<Stmt> {
        self.named_children(block)
            .into_iter()
            .filter_map(|n| self.statement(n))
            .collect()
    }

    fn statement(&self, node: Node<'a>) -> Option<Stmt> {
        let location = location_of(node);
        let kind = match node.kind() {
            "expression_statement" => {
                let inner = self.named_children(node).into_iter().next()?;
                match inner.kind() {
                    "assignment" => self.assignment(inner),
                    "augmented_assignment" => self.augmented_assignment(inner),
                    _ => StmtKind::Expr {
                        value: self.expression(inner),
                    },
                }
            }
            "import_statement" => StmtKind::Import {
                names: self.import_aliases(node),
            },
            "import_from_statement" | "future_import_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| "__future__".to_string());
                let wildcard = self
                    .named_children(node)
                    .iter()
                    .any(|n| n.kind() == "wildcard_import");
                StmtKind::FromImport {
                    module,
                    names: self.import_aliases(node),
                    wildcard,
                }
            }
            "function_definition" => StmtKind::Def(self.function_def(node)),
            "class_definition" => StmtKind::Class(self.class_def(node)),
            "decorated_definition" => {
                let definition = node.child_by_field_name("definition")?;
                return self.statement(definition).map(|mut stmt| {
                    // The decorated span owns the statement location.
                    stmt.location = location;
                    stmt
                });
            }
            "if_statement" => {
                let test = self.field_expression(node, "condition");
                let body = self.field_suite(node, "consequence");
                let mut elifs = Vec::new();
                let mut orelse = Vec::new();
                for alt in self.field_children(node, "alternative") {
                    match alt.kind() {
                        "elif_clause" => elifs.push((
                            self.field_expression(alt, "condition"),
                            self.field_suite(alt, "consequence"),
                        )),
                        "else_clause" => orelse = self.field_suite(alt, "body"),
                        _ => {}
                    }
                }
                StmtKind::If {
                    test,
                    body,
                    elifs,
                    orelse,
                }
            }
            "while_statement" => StmtKind::While {
                test: self.field_expression(node, "condition"),
                body: self.field_suite(node, "body"),
                orelse: self.else_suite(node),
            },
            "for_statement" => StmtKind::For {
                target: self.field_expression(node, "left"),
                iter: self.field_expression(node, "right"),
                body: self.field_suite(node, "body"),
                orelse: self.else_suite(node),
            },
            "try_statement" => {
                let body = self.field_suite(node, "body");
                let mut handlers = Vec::new();
                let mut orelse = Vec::new();
                let mut finalbody = Vec::new();
                for child in self.named_children(node) {
                    match child.kind() {
                        "except_clause" | "except_group_clause" => {
                            handlers.push(self.except_handler(child));
                        }
                        "else_clause" => orelse = self.field_suite(child, "body"),
                        "finally_clause" => {
                            finalbody = child
                                .child_by_field_name("body")
                                .map(|b| self.statement_list(b))
                                .or_else(|| {
                                    self.named_children(child)
                                        .into_iter()
                                        .find(|n| n.kind() == "block")
                                        .map(|b| self.statement_list(b))
                                })
                                .unwrap_or_default();
                        }
                        _ => {}
                    }
                }
                StmtKind::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                }
            }
            "with_statement" => {
                let mut items = Vec::new();
                for clause in self.named_children(node) {
                    if clause.kind() == "with_clause" {
                        for item in self.named_children(clause) {
                            if item.kind() == "with_item" {
                                items.push(self.with_item(item));
                            }
                        }
                    }
                }
                StmtKind::With {
                    items,
                    body: self.field_suite(node, "body"),
                }
            }
            "return_statement" => StmtKind::Return {
                value: self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .map(|n| self.expression(n)),
            },
            "raise_statement" => StmtKind::Raise {
                value: self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .map(|n| self.expression(n)),
            },
            "delete_statement" => {
                let targets = match self.named_children(node).into_iter().next() {
                    Some(inner) if inner.kind() == "expression_list" => self
                        .named_children(inner)
                        .into_iter()
                        .map(|n| self.expression(n))
                        .collect(),
                    Some(inner) => vec![self.expression(inner)],
                    None => Vec::new(),
                };
                StmtKind::Delete { targets }
            }
            "global_statement" => StmtKind::Global {
                names: self.identifier_names(node),
            },
            "nonlocal_statement" => StmtKind::Nonlocal {
                names: self.identifier_names(node),
            },
            "assert_statement" => {
                let mut exprs = self.named_children(node).into_iter();
                let test = exprs
                    .next()
                    .map(|n| self.expression(n))
                    .unwrap_or_else(|| self.opaque(node));
                StmtKind::Assert {
                    test,
                    message: exprs.next().map(|n| self.expression(n)),
                }
            }
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,
            "comment" => return None,
            // match statements and other rarities flow through as opaque
            // expression statements; the default def/use rule still gathers
            // their free names.
            _ => StmtKind::Expr {
                value: self.opaque(node),
            },
        };
        Some(Stmt { location, kind })
    }

    fn else_suite(&self, node: Node<'a>) -> Vec<Stmt> {
        self.field_children(node, "alternative")
            .into_iter()
            .find(|n| n.kind() == "else_clause")
            .map(|n| self.field_suite(n, "body"))
            .unwrap_or_default()
    }

    fn field_suite(&self, node: Node<'a>, field: &str) -> Vec<Stmt> {
        node.child_by_field_name(field)
            .map(|b| self.statement_list(b))
            .unwrap_or_default()
    }

    fn field_expression(&self, node: Node<'a>, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(child) => self.expression(child),
            None => self.opaque(node),
        }
    }

    fn import_aliases(&self, node: Node<'a>) -> Vec<ImportAlias> {
        self.field_children(node, "name")
            .into_iter()
            .map(|n| match n.kind() {
                "aliased_import" => {
                    let name = n
                        .child_by_field_name("name")
                        .map(|c| self.text(c).to_string())
                        .unwrap_or_default();
                    let alias = n
                        .child_by_field_name("alias")
                        .map(|c| self.text(c).to_string());
                    ImportAlias {
                        name,
                        alias,
                        location: location_of(n),
                    }
                }
                _ => ImportAlias {
                    name: self.text(n).to_string(),
                    alias: None,
                    location: location_of(n),
                },
            })
            .collect()
    }

    fn identifier_names(&self, node: Node<'a>) -> Vec<String> {
        self.named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "identifier")
            .map(|n| self.text(n).to_string())
            .collect()
    }

    fn function_def(&self, node: Node<'a>) -> FunctionDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut params = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for param in self.named_children(parameters) {
                if let Some(p) = self.parameter(param) {
                    params.push(p);
                }
            }
        }
        FunctionDef {
            name,
            params,
            body: self.field_suite(node, "body"),
        }
    }

    fn parameter(&self, node: Node<'a>) -> Option<Parameter> {
        match node.kind() {
            "identifier" => Some(Parameter {
                name: self.text(node).to_string(),
                location: location_of(node),
            }),
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => self
                .named_children(node)
                .into_iter()
                .find(|n| n.kind() == "identifier")
                .map(|n| Parameter {
                    name: self.text(n).to_string(),
                    location: location_of(n),
                }),
            "default_parameter" | "typed_default_parameter" => node
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .map(|n| Parameter {
                    name: self.text(n).to_string(),
                    location: location_of(n),
                }),
            _ => None,
        }
    }

    fn class_def(&self, node: Node<'a>) -> ClassDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| {
                self.named_children(args)
                    .into_iter()
                    .map(|n| self.expression(n))
                    .collect()
            })
            .unwrap_or_default();
        ClassDef {
            name,
            bases,
            body: self.field_suite(node, "body"),
        }
    }

    /// The alias target of an `as_pattern`, by field when the grammar
    /// exposes it and by child kind otherwise.
    fn as_pattern_alias(&self, node: Node<'a>) -> Option<Node<'a>> {
        if let Some(alias) = node.child_by_field_name("alias") {
            return Some(alias);
        }
        let mut cursor = node.walk();
        let result = node
            .named_children(&mut cursor)
            .find(|n| n.kind() == "as_pattern_target");
        result
    }

    fn except_handler(&self, node: Node<'a>) -> ExceptHandler {
        let mut exc_type = None;
        let mut alias = None;
        let mut body = Vec::new();
        for child in self.named_children(node) {
            match child.kind() {
                "block" => body = self.statement_list(child),
                "as_pattern" => {
                    if let Some(value) = self
                        .named_children(child)
                        .into_iter()
                        .find(|n| n.kind() != "as_pattern_target")
                    {
                        exc_type = Some(self.expression(value));
                    }
                    if let Some(target) = self.as_pattern_alias(child) {
                        alias = Some((self.text(target).to_string(), location_of(target)));
                    }
                }
                _ if exc_type.is_none() => exc_type = Some(self.expression(child)),
                _ => {}
            }
        }
        ExceptHandler {
            exc_type,
            alias,
            body,
            location: location_of(node),
        }
    }

    fn with_item(&self, node: Node<'a>) -> WithItem {
        let location = location_of(node);
        let value = node.child_by_field_name("value");
        match value {
            Some(v) if v.kind() == "as_pattern" => {
                let context = self
                    .named_children(v)
                    .into_iter()
                    .find(|n| n.kind() != "as_pattern_target")
                    .map(|n| self.expression(n))
                    .unwrap_or_else(|| self.opaque(v));
                let alias = self.as_pattern_alias(v).map(|target| Expr {
                    location: location_of(target),
                    kind: ExprKind::Name {
                        id: self.text(target).to_string(),
                    },
                });
                WithItem {
                    context,
                    alias,
                    location,
                }
            }
            Some(v) => WithItem {
                context: self.expression(v),
                alias: None,
                location,
            },
            None => WithItem {
                context: self.opaque(node),
                alias: None,
                location,
            },
        }
    }

    fn assignment(&self, node: Node<'a>) -> StmtKind {
        let mut targets = Vec::new();
        let mut current = node;
        loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(self.expression(left));
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                Some(right) => {
                    return StmtKind::Assign {
                        targets,
                        sources: vec![self.expression(right)],
                        op: None,
                    };
                }
                // Annotation without a right-hand side (`x: int`).
                None => {
                    return StmtKind::Assign {
                        targets,
                        sources: Vec::new(),
                        op: None,
                    };
                }
            }
        }
    }

    fn augmented_assignment(&self, node: Node<'a>) -> StmtKind {
        let targets = node
            .child_by_field_name("left")
            .map(|n| vec![self.expression(n)])
            .unwrap_or_default();
        let sources = node
            .child_by_field_name("right")
            .map(|n| vec![self.expression(n)])
            .unwrap_or_default();
        let op = node
            .child_by_field_name("operator")
            .map(|n| self.text(n).trim_end_matches('=').to_string());
        StmtKind::Assign {
            targets,
            sources,
            op,
        }
    }

    fn expression(&self, node: Node<'a>) -> Expr {
        let location = location_of(node);
        let kind = match node.kind() {
            "identifier" => ExprKind::Name {
                id: self.text(node).to_string(),
            },
            "string" => {
                let children = self.named_children(node);
                if children.iter().any(|n| n.kind() == "interpolation") {
                    return self.opaque_with(
                        node,
                        children
                            .into_iter()
                            .filter(|n| n.kind() == "interpolation")
                            .flat_map(|n| self.named_children(n))
                            .map(|n| self.expression(n))
                            .collect(),
                    );
                }
                ExprKind::Str {
                    value: children
                        .iter()
                        .filter(|n| {
                            n.kind() == "string_content" || n.kind() == "escape_sequence"
                        })
                        .map(|n| self.text(*n))
                        .collect(),
                }
            }
            "concatenated_string" => {
                let parts: Vec<Expr> = self
                    .named_children(node)
                    .into_iter()
                    .map(|n| self.expression(n))
                    .collect();
                if parts
                    .iter()
                    .all(|p| matches!(p.kind, ExprKind::Str { .. }))
                {
                    ExprKind::Str {
                        value: parts
                            .iter()
                            .map(|p| match &p.kind {
                                ExprKind::Str { value } => value.as_str(),
                                _ => "",
                            })
                            .collect(),
                    }
                } else {
                    return self.opaque_with(node, parts);
                }
            }
            "integer" | "float" | "true" | "false" | "none" | "ellipsis" => ExprKind::Literal {
                raw: self.text(node).to_string(),
            },
            "call" => {
                let func = self.field_expression(node, "function");
                let args = match node.child_by_field_name("arguments") {
                    Some(arguments) if arguments.kind() == "argument_list" => self
                        .named_children(arguments)
                        .into_iter()
                        .map(|arg| match arg.kind() {
                            "keyword_argument" => Arg {
                                keyword: arg
                                    .child_by_field_name("name")
                                    .map(|n| self.text(n).to_string()),
                                value: self.field_expression(arg, "value"),
                            },
                            _ => Arg {
                                keyword: None,
                                value: self.expression(arg),
                            },
                        })
                        .collect(),
                    Some(arguments) => vec![Arg {
                        keyword: None,
                        value: self.expression(arguments),
                    }],
                    None => Vec::new(),
                };
                ExprKind::Call {
                    func: Box::new(func),
                    args,
                }
            }
            "attribute" => ExprKind::Attribute {
                value: Box::new(self.field_expression(node, "object")),
                attr: node
                    .child_by_field_name("attribute")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
            },
            "subscript" => {
                let value = Box::new(self.field_expression(node, "value"));
                let mut subscripts: Vec<Expr> = self
                    .field_children(node, "subscript")
                    .into_iter()
                    .map(|n| self.expression(n))
                    .collect();
                let index = if subscripts.len() == 1 {
                    Box::new(subscripts.remove(0))
                } else {
                    Box::new(Expr {
                        location: location.clone(),
                        kind: ExprKind::Tuple { elts: subscripts },
                    })
                };
                ExprKind::Subscript { value, index }
            }
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => ExprKind::Tuple {
                elts: self
                    .named_children(node)
                    .into_iter()
                    .map(|n| self.expression(n))
                    .collect(),
            },
            "list" | "list_pattern" => ExprKind::List {
                elts: self
                    .named_children(node)
                    .into_iter()
                    .map(|n| self.expression(n))
                    .collect(),
            },
            "list_splat" | "list_splat_pattern" => {
                match self.named_children(node).into_iter().next() {
                    Some(inner) => ExprKind::Starred {
                        value: Box::new(self.expression(inner)),
                    },
                    None => ExprKind::Literal {
                        raw: self.text(node).to_string(),
                    },
                }
            }
            "parenthesized_expression" => {
                return self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .map(|n| self.expression(n))
                    .unwrap_or_else(|| self.opaque(node));
            }
            "lambda" => {
                // Parameters bind locally; only the body contributes names.
                let children = node
                    .child_by_field_name("body")
                    .map(|b| vec![self.expression(b)])
                    .unwrap_or_default();
                return self.opaque_with(node, children);
            }
            _ => return self.opaque(node),
        };
        Expr { location, kind }
    }

    fn opaque(&self, node: Node<'a>) -> Expr {
        let children = self
            .named_children(node)
            .into_iter()
            .map(|n| self.expression(n))
            .collect();
        self.opaque_with(node, children)
    }

    fn opaque_with(&self, node: Node<'a>, children: Vec<Expr>) -> Expr {
        Expr {
            location: location_of(node),
            kind: ExprKind::Opaque {
                raw: self.text(node).to_string(),
                children,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> Stmt {
        let module = parse(text).unwrap();
        assert_eq!(module.code.len(), 1, "expected one statement in {text:?}");
        module.code.into_iter().next().unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        let stmt = parse_one("x = 1");
        match stmt.kind {
            StmtKind::Assign { targets, sources, op } => {
                assert_eq!(targets.len(), 1);
                assert_eq!(targets[0].as_name(), Some("x"));
                assert_eq!(sources.len(), 1);
                assert!(op.is_none());
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_chained_assignment() {
        let stmt = parse_one("x = y = 1");
        match stmt.kind {
            StmtKind::Assign { targets, .. } => {
                let names: Vec<_> = targets.iter().filter_map(|t| t.as_name()).collect();
                assert_eq!(names, vec!["x", "y"]);
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_augmented_assignment() {
        let stmt = parse_one("a += 1");
        match stmt.kind {
            StmtKind::Assign { op, .. } => assert_eq!(op.as_deref(), Some("+")),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tuple_unpacking() {
        let stmt = parse_one("a, b = c, d");
        match stmt.kind {
            StmtKind::Assign { targets, sources, .. } => {
                assert!(matches!(targets[0].kind, ExprKind::Tuple { .. }));
                assert!(matches!(sources[0].kind, ExprKind::Tuple { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_imports() {
        let stmt = parse_one("import pandas as pd");
        match stmt.kind {
            StmtKind::Import { names } => {
                assert_eq!(names[0].name, "pandas");
                assert_eq!(names[0].bound_name(), "pd");
            }
            other => panic!("expected import, got {other:?}"),
        }

        let stmt = parse_one("from sklearn.cluster import KMeans");
        match stmt.kind {
            StmtKind::FromImport { module, names, wildcard } => {
                assert_eq!(module, "sklearn.cluster");
                assert_eq!(names[0].name, "KMeans");
                assert!(!wildcard);
            }
            other => panic!("expected from-import, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_call_with_keyword() {
        let stmt = parse_one("scatter(x, y, c=clusters)");
        match stmt.kind {
            StmtKind::Expr { value } => match value.kind {
                ExprKind::Call { func, args } => {
                    assert_eq!(func.as_name(), Some("scatter"));
                    assert_eq!(args.len(), 3);
                    assert_eq!(args[2].keyword.as_deref(), Some("c"));
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_attribute_and_subscript() {
        let stmt = parse_one("d['k'] = o.x");
        match stmt.kind {
            StmtKind::Assign { targets, sources, .. } => {
                assert!(matches!(targets[0].kind, ExprKind::Subscript { .. }));
                assert!(matches!(sources[0].kind, ExprKind::Attribute { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_def_with_params() {
        let stmt = parse_one("def f(a, b=1, *args, **kw):\n    return a\n");
        match stmt.kind {
            StmtKind::Def(def) => {
                assert_eq!(def.name, "f");
                let names: Vec<_> = def.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "args", "kw"]);
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected def, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_compound_statements() {
        let module = parse(concat!(
            "if x > 0:\n",
            "    y = 1\n",
            "elif x < 0:\n",
            "    y = 2\n",
            "else:\n",
            "    y = 3\n",
            "for i in xs:\n",
            "    total += i\n",
            "while cond:\n",
            "    step()\n",
            "with open(p) as fh:\n",
            "    data = fh.read()\n",
            "try:\n",
            "    risky()\n",
            "except ValueError as e:\n",
            "    handle(e)\n",
            "finally:\n",
            "    cleanup()\n",
        ))
        .unwrap();
        assert_eq!(module.code.len(), 5);
        assert!(matches!(module.code[0].kind, StmtKind::If { .. }));
        assert!(matches!(module.code[1].kind, StmtKind::For { .. }));
        assert!(matches!(module.code[2].kind, StmtKind::While { .. }));
        assert!(matches!(module.code[3].kind, StmtKind::With { .. }));
        match &module.code[4].kind {
            StmtKind::Try { handlers, finalbody, .. } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].alias.as_ref().unwrap().0, "e");
                assert_eq!(finalbody.len(), 1);
            }
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_trailing_newline() {
        assert!(parse("x = 1").is_ok());
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(
            parse("def broken(:"),
            Err(NbflowError::Parse { .. })
        ));
    }

    #[test]
    fn test_string_literal_content() {
        let stmt = parse_one("note = 'defs: []'");
        match stmt.kind {
            StmtKind::Assign { sources, .. } => match &sources[0].kind {
                ExprKind::Str { value } => assert_eq!(value, "defs: []"),
                other => panic!("expected string, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_locations_are_one_based_lines() {
        let module = parse("a = 1\nb = a\n").unwrap();
        assert_eq!(module.code[0].location.first_line, 1);
        assert_eq!(module.code[1].location.first_line, 2);
    }
}
