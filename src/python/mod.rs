//! Subject-language front end: typed AST, parser, walker, printer, and the
//! interactive-directive rewriter.

pub mod ast;
pub mod magics;
pub mod parser;
pub mod printer;
pub mod walker;

pub use ast::{Expr, ExprKind, Location, LocationSet, Module, Stmt, StmtKind};
pub use parser::parse;
pub use printer::{print_expr, print_module, print_node};
