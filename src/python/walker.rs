//! Preorder traversal over the typed AST.

use crate::python::ast::{Expr, Stmt};

/// Visit every expression in a statement's own syntax (not nested suites),
/// preorder, with the expression ancestor stack.
pub fn walk_exprs<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr, &[&'a Expr])) {
    let mut ancestors: Vec<&'a Expr> = Vec::new();
    for expr in stmt.expressions() {
        walk_expr(expr, &mut ancestors, f);
    }
}

/// Visit a single expression subtree, preorder, with ancestors.
pub fn walk_expr<'a>(
    expr: &'a Expr,
    ancestors: &mut Vec<&'a Expr>,
    f: &mut impl FnMut(&'a Expr, &[&'a Expr]),
) {
    f(expr, ancestors);
    ancestors.push(expr);
    for child in expr.children() {
        walk_expr(child, ancestors, f);
    }
    ancestors.pop();
}

/// Visit this statement and every nested statement, preorder.
pub fn walk_stmts<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Stmt)) {
    f(stmt);
    for suite in stmt.suites() {
        for child in suite {
            walk_stmts(child, f);
        }
    }
}

/// Visit every expression of this statement and of all nested statements.
pub fn walk_all_exprs<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr, &[&'a Expr])) {
    walk_stmts(stmt, &mut |s| {
        walk_exprs(s, f);
    });
}
