//! Rendering of AST nodes back to source text.
//!
//! The output is semantically equivalent to the input, not byte-identical:
//! structured nodes render from their parts, opaque nodes replay the source
//! text captured at parse time.

use crate::python::ast::{Expr, ExprKind, Module, Stmt, StmtKind};

const INDENT: &str = "    ";

/// Render a whole module.
pub fn print_module(module: &Module) -> String {
    module
        .code
        .iter()
        .map(|s| print_node(s))
        .collect::<Vec<_>>()
        .join("")
}

/// Render a statement (including a trailing newline).
pub fn print_node(stmt: &Stmt) -> String {
    let mut out = String::new();
    write_stmt(stmt, 0, &mut out);
    out
}

/// Render an expression.
pub fn print_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Name { id } => id.clone(),
        ExprKind::Str { value } => format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'")),
        ExprKind::Literal { raw } => raw.clone(),
        ExprKind::Call { func, args } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| match &a.keyword {
                    Some(kw) => format!("{}={}", kw, print_expr(&a.value)),
                    None => print_expr(&a.value),
                })
                .collect();
            format!("{}({})", print_expr(func), rendered.join(", "))
        }
        ExprKind::Attribute { value, attr } => format!("{}.{}", print_expr(value), attr),
        ExprKind::Subscript { value, index } => {
            format!("{}[{}]", print_expr(value), print_expr(index))
        }
        ExprKind::Tuple { elts } => {
            let rendered: Vec<String> = elts.iter().map(print_expr).collect();
            rendered.join(", ")
        }
        ExprKind::List { elts } => {
            let rendered: Vec<String> = elts.iter().map(print_expr).collect();
            format!("[{}]", rendered.join(", "))
        }
        ExprKind::Starred { value } => format!("*{}", print_expr(value)),
        ExprKind::Opaque { raw, .. } => raw.clone(),
    }
}

fn write_suite(suite: &[Stmt], depth: usize, out: &mut String) {
    if suite.is_empty() {
        out.push_str(&INDENT.repeat(depth));
        out.push_str("pass\n");
        return;
    }
    for stmt in suite {
        write_stmt(stmt, depth, out);
    }
}

fn write_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match &stmt.kind {
        StmtKind::Import { names } => {
            let rendered: Vec<String> = names
                .iter()
                .map(|n| match &n.alias {
                    Some(a) => format!("{} as {}", n.name, a),
                    None => n.name.clone(),
                })
                .collect();
            out.push_str(&format!("{pad}import {}\n", rendered.join(", ")));
        }
        StmtKind::FromImport { module, names, wildcard } => {
            if *wildcard {
                out.push_str(&format!("{pad}from {module} import *\n"));
            } else {
                let rendered: Vec<String> = names
                    .iter()
                    .map(|n| match &n.alias {
                        Some(a) => format!("{} as {}", n.name, a),
                        None => n.name.clone(),
                    })
                    .collect();
                out.push_str(&format!("{pad}from {module} import {}\n", rendered.join(", ")));
            }
        }
        StmtKind::Assign { targets, sources, op } => {
            let lhs: Vec<String> = targets.iter().map(print_expr).collect();
            let rhs: Vec<String> = sources.iter().map(print_expr).collect();
            let eq = match op {
                Some(op) => format!(" {op}= "),
                None => " = ".to_string(),
            };
            if rhs.is_empty() {
                out.push_str(&format!("{pad}{}\n", lhs.join(" = ")));
            } else {
                out.push_str(&format!("{pad}{}{eq}{}\n", lhs.join(" = "), rhs.join(", ")));
            }
        }
        StmtKind::Def(def) => {
            let params: Vec<&str> = def.params.iter().map(|p| p.name.as_str()).collect();
            out.push_str(&format!("{pad}def {}({}):\n", def.name, params.join(", ")));
            write_suite(&def.body, depth + 1, out);
        }
        StmtKind::Class(class) => {
            if class.bases.is_empty() {
                out.push_str(&format!("{pad}class {}:\n", class.name));
            } else {
                let bases: Vec<String> = class.bases.iter().map(print_expr).collect();
                out.push_str(&format!("{pad}class {}({}):\n", class.name, bases.join(", ")));
            }
            write_suite(&class.body, depth + 1, out);
        }
        StmtKind::If { test, body, elifs, orelse } => {
            out.push_str(&format!("{pad}if {}:\n", print_expr(test)));
            write_suite(body, depth + 1, out);
            for (elif_test, elif_body) in elifs {
                out.push_str(&format!("{pad}elif {}:\n", print_expr(elif_test)));
                write_suite(elif_body, depth + 1, out);
            }
            if !orelse.is_empty() {
                out.push_str(&format!("{pad}else:\n"));
                write_suite(orelse, depth + 1, out);
            }
        }
        StmtKind::While { test, body, orelse } => {
            out.push_str(&format!("{pad}while {}:\n", print_expr(test)));
            write_suite(body, depth + 1, out);
            if !orelse.is_empty() {
                out.push_str(&format!("{pad}else:\n"));
                write_suite(orelse, depth + 1, out);
            }
        }
        StmtKind::For { target, iter, body, orelse } => {
            out.push_str(&format!(
                "{pad}for {} in {}:\n",
                print_expr(target),
                print_expr(iter)
            ));
            write_suite(body, depth + 1, out);
            if !orelse.is_empty() {
                out.push_str(&format!("{pad}else:\n"));
                write_suite(orelse, depth + 1, out);
            }
        }
        StmtKind::Try { body, handlers, orelse, finalbody } => {
            out.push_str(&format!("{pad}try:\n"));
            write_suite(body, depth + 1, out);
            for handler in handlers {
                match (&handler.exc_type, &handler.alias) {
                    (Some(t), Some((alias, _))) => {
                        out.push_str(&format!("{pad}except {} as {alias}:\n", print_expr(t)));
                    }
                    (Some(t), None) => {
                        out.push_str(&format!("{pad}except {}:\n", print_expr(t)));
                    }
                    _ => out.push_str(&format!("{pad}except:\n")),
                }
                write_suite(&handler.body, depth + 1, out);
            }
            if !orelse.is_empty() {
                out.push_str(&format!("{pad}else:\n"));
                write_suite(orelse, depth + 1, out);
            }
            if !finalbody.is_empty() {
                out.push_str(&format!("{pad}finally:\n"));
                write_suite(finalbody, depth + 1, out);
            }
        }
        StmtKind::With { items, body } => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match &item.alias {
                    Some(alias) => {
                        format!("{} as {}", print_expr(&item.context), print_expr(alias))
                    }
                    None => print_expr(&item.context),
                })
                .collect();
            out.push_str(&format!("{pad}with {}:\n", rendered.join(", ")));
            write_suite(body, depth + 1, out);
        }
        StmtKind::Return { value } => match value {
            Some(v) => out.push_str(&format!("{pad}return {}\n", print_expr(v))),
            None => out.push_str(&format!("{pad}return\n")),
        },
        StmtKind::Raise { value } => match value {
            Some(v) => out.push_str(&format!("{pad}raise {}\n", print_expr(v))),
            None => out.push_str(&format!("{pad}raise\n")),
        },
        StmtKind::Delete { targets } => {
            let rendered: Vec<String> = targets.iter().map(print_expr).collect();
            out.push_str(&format!("{pad}del {}\n", rendered.join(", ")));
        }
        StmtKind::Global { names } => {
            out.push_str(&format!("{pad}global {}\n", names.join(", ")));
        }
        StmtKind::Nonlocal { names } => {
            out.push_str(&format!("{pad}nonlocal {}\n", names.join(", ")));
        }
        StmtKind::Assert { test, message } => match message {
            Some(m) => out.push_str(&format!(
                "{pad}assert {}, {}\n",
                print_expr(test),
                print_expr(m)
            )),
            None => out.push_str(&format!("{pad}assert {}\n", print_expr(test))),
        },
        StmtKind::Expr { value } => out.push_str(&format!("{pad}{}\n", print_expr(value))),
        StmtKind::Pass => out.push_str(&format!("{pad}pass\n")),
        StmtKind::Break => out.push_str(&format!("{pad}break\n")),
        StmtKind::Continue => out.push_str(&format!("{pad}continue\n")),
    }
}
