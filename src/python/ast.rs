//! Typed AST for the subject language.
//!
//! The parse tree is modelled as a tagged variant over the statement and
//! expression shapes the analyses dispatch on. Expression forms with no
//! analysis significance (operators, comprehensions, lambdas, f-strings)
//! collapse into [`ExprKind::Opaque`], which preserves the raw source text
//! and the name-bearing child expressions so that free-name gathering and
//! printing still work.

use serde::Serialize;

use crate::set::{KeyedSet, SetMember};

/// A source range, 1-based lines and 0-based columns, with an optional
/// `path` tag identifying the cell execution the range was parsed from.
///
/// Ranges from different cells never compare equal once tagged, even when
/// their coordinates coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct Location {
    pub first_line: usize,
    pub first_column: usize,
    pub last_line: usize,
    pub last_column: usize,
    /// Fragment identity (the owning cell's execution event id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Location {
    /// Create an untagged location.
    pub fn new(
        first_line: usize,
        first_column: usize,
        last_line: usize,
        last_column: usize,
    ) -> Self {
        Self {
            first_line,
            first_column,
            last_line,
            last_column,
            path: None,
        }
    }

    /// Canonical identity string, used as cache and set key.
    pub fn canonical(&self) -> String {
        match &self.path {
            Some(path) => format!(
                "{}@{}:{}-{}:{}",
                path, self.first_line, self.first_column, self.last_line, self.last_column
            ),
            None => format!(
                "{}:{}-{}:{}",
                self.first_line, self.first_column, self.last_line, self.last_column
            ),
        }
    }

    fn start(&self) -> (usize, usize) {
        (self.first_line, self.first_column)
    }

    fn end(&self) -> (usize, usize) {
        (self.last_line, self.last_column)
    }

    /// Textual nesting: this range fully encloses `other`.
    pub fn contains(&self, other: &Location) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// Textual overlap or nesting.
    pub fn intersects(&self, other: &Location) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }

    /// Shift both line coordinates by a (possibly negative) offset.
    pub fn shift_lines(&mut self, offset: isize) {
        self.first_line = (self.first_line as isize + offset) as usize;
        self.last_line = (self.last_line as isize + offset) as usize;
    }
}

impl SetMember for Location {
    fn key(&self) -> String {
        self.canonical()
    }
}

/// Set of source locations.
pub type LocationSet = KeyedSet<Location>;

/// A parsed module: the ordered statement list of one code fragment.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub code: Vec<Stmt>,
    pub location: Location,
}

/// A statement with its source range.
#[derive(Debug, Clone, Serialize)]
pub struct Stmt {
    pub location: Location,
    pub kind: StmtKind,
}

/// An expression with its source range.
#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub location: Location,
    pub kind: ExprKind,
}

/// One name in an import list, possibly aliased.
#[derive(Debug, Clone, Serialize)]
pub struct ImportAlias {
    /// Dotted path as written (`matplotlib.pyplot`) or a bare name.
    pub name: String,
    pub alias: Option<String>,
    pub location: Location,
}

impl ImportAlias {
    /// The name this import binds in the current scope.
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A function parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: Location,
}

/// A `def` statement.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Stmt>,
}

/// A `class` statement.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// One `except` clause of a `try` statement.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptHandler {
    pub exc_type: Option<Expr>,
    pub alias: Option<(String, Location)>,
    pub body: Vec<Stmt>,
    pub location: Location,
}

/// One item of a `with` statement header.
#[derive(Debug, Clone, Serialize)]
pub struct WithItem {
    pub context: Expr,
    pub alias: Option<Expr>,
    pub location: Location,
}

/// Statement shapes.
#[derive(Debug, Clone, Serialize)]
pub enum StmtKind {
    /// `import a.b as c, d`
    Import { names: Vec<ImportAlias> },
    /// `from m import a as b, c` / `from m import *`
    FromImport {
        module: String,
        names: Vec<ImportAlias>,
        wildcard: bool,
    },
    /// Plain or augmented assignment. `op` holds the augmented operator
    /// (without the trailing `=`) when present. Chained assignments flatten
    /// into multiple targets.
    Assign {
        targets: Vec<Expr>,
        sources: Vec<Expr>,
        op: Option<String>,
    },
    Def(FunctionDef),
    Class(ClassDef),
    If {
        test: Expr,
        body: Vec<Stmt>,
        elifs: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Return { value: Option<Expr> },
    Raise { value: Option<Expr> },
    Delete { targets: Vec<Expr> },
    Global { names: Vec<String> },
    Nonlocal { names: Vec<String> },
    Assert {
        test: Expr,
        message: Option<Expr>,
    },
    /// Bare expression statement.
    Expr { value: Expr },
    Pass,
    Break,
    Continue,
}

/// One call argument, positional or keyword.
#[derive(Debug, Clone, Serialize)]
pub struct Arg {
    pub keyword: Option<String>,
    pub value: Expr,
}

/// Expression shapes.
#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    /// Bare identifier.
    Name { id: String },
    /// String literal with its cooked content.
    Str { value: String },
    /// Any other literal (numbers, booleans, None, ellipsis), kept as text.
    Literal { raw: String },
    Call { func: Box<Expr>, args: Vec<Arg> },
    /// Attribute access (`dot`).
    Attribute { value: Box<Expr>, attr: String },
    /// Subscript access (`index`); slices appear as opaque index expressions.
    Subscript { value: Box<Expr>, index: Box<Expr> },
    Tuple { elts: Vec<Expr> },
    List { elts: Vec<Expr> },
    Starred { value: Box<Expr> },
    /// Fallback for expression forms the analyses treat uniformly. Keeps the
    /// raw source text and the name-bearing child expressions.
    Opaque { raw: String, children: Vec<Expr> },
}

impl Expr {
    /// Direct child expressions.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Name { .. } | ExprKind::Str { .. } | ExprKind::Literal { .. } => Vec::new(),
            ExprKind::Call { func, args } => {
                let mut out = vec![func.as_ref()];
                out.extend(args.iter().map(|a| &a.value));
                out
            }
            ExprKind::Attribute { value, .. } => vec![value.as_ref()],
            ExprKind::Subscript { value, index } => vec![value.as_ref(), index.as_ref()],
            ExprKind::Tuple { elts } | ExprKind::List { elts } => elts.iter().collect(),
            ExprKind::Starred { value } => vec![value.as_ref()],
            ExprKind::Opaque { children, .. } => children.iter().collect(),
        }
    }

    /// The identifier when this expression is a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name { id } => Some(id),
            _ => None,
        }
    }

    /// All bare names in this subtree, preorder.
    pub fn gather_names<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        if matches!(self.kind, ExprKind::Name { .. }) {
            out.push(self);
        }
        for child in self.children() {
            child.gather_names(out);
        }
    }

    fn visit_locations_mut(&mut self, f: &mut impl FnMut(&mut Location)) {
        f(&mut self.location);
        match &mut self.kind {
            ExprKind::Name { .. } | ExprKind::Str { .. } | ExprKind::Literal { .. } => {}
            ExprKind::Call { func, args } => {
                func.visit_locations_mut(f);
                for arg in args {
                    arg.value.visit_locations_mut(f);
                }
            }
            ExprKind::Attribute { value, .. } => value.visit_locations_mut(f),
            ExprKind::Subscript { value, index } => {
                value.visit_locations_mut(f);
                index.visit_locations_mut(f);
            }
            ExprKind::Tuple { elts } | ExprKind::List { elts } => {
                for e in elts {
                    e.visit_locations_mut(f);
                }
            }
            ExprKind::Starred { value } => value.visit_locations_mut(f),
            ExprKind::Opaque { children, .. } => {
                for e in children {
                    e.visit_locations_mut(f);
                }
            }
        }
    }
}

impl Stmt {
    /// Expressions appearing directly in this statement's own syntax,
    /// excluding those inside nested statement suites.
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Assign { targets, sources, .. } => {
                targets.iter().chain(sources.iter()).collect()
            }
            StmtKind::If { test, .. } => vec![test],
            StmtKind::While { test, .. } => vec![test],
            StmtKind::For { target, iter, .. } => vec![target, iter],
            StmtKind::With { items, .. } => items
                .iter()
                .flat_map(|i| {
                    let mut v = vec![&i.context];
                    if let Some(alias) = &i.alias {
                        v.push(alias);
                    }
                    v
                })
                .collect(),
            StmtKind::Try { handlers, .. } => handlers
                .iter()
                .filter_map(|h| h.exc_type.as_ref())
                .collect(),
            StmtKind::Return { value } | StmtKind::Raise { value } => {
                value.iter().collect()
            }
            StmtKind::Delete { targets } => targets.iter().collect(),
            StmtKind::Assert { test, message } => {
                let mut v = vec![test];
                if let Some(m) = message {
                    v.push(m);
                }
                v
            }
            StmtKind::Expr { value } => vec![value],
            StmtKind::Class(class) => class.bases.iter().collect(),
            StmtKind::Import { .. }
            | StmtKind::FromImport { .. }
            | StmtKind::Def(_)
            | StmtKind::Global { .. }
            | StmtKind::Nonlocal { .. }
            | StmtKind::Pass
            | StmtKind::Break
            | StmtKind::Continue => Vec::new(),
        }
    }

    /// Nested statement suites of this statement.
    pub fn suites(&self) -> Vec<&[Stmt]> {
        match &self.kind {
            StmtKind::Def(def) => vec![&def.body],
            StmtKind::Class(class) => vec![&class.body],
            StmtKind::If { body, elifs, orelse, .. } => {
                let mut v: Vec<&[Stmt]> = vec![body];
                v.extend(elifs.iter().map(|(_, b)| b.as_slice()));
                v.push(orelse);
                v
            }
            StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
                vec![body, orelse]
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                let mut v: Vec<&[Stmt]> = vec![body];
                v.extend(handlers.iter().map(|h| h.body.as_slice()));
                v.push(orelse);
                v.push(finalbody);
                v
            }
            StmtKind::With { body, .. } => vec![body],
            _ => Vec::new(),
        }
    }

    /// Visit every location in this statement's subtree, including nested
    /// statements, parameters and import aliases.
    pub fn visit_locations_mut(&mut self, f: &mut impl FnMut(&mut Location)) {
        f(&mut self.location);
        match &mut self.kind {
            StmtKind::Import { names } => {
                for n in names {
                    f(&mut n.location);
                }
            }
            StmtKind::FromImport { names, .. } => {
                for n in names {
                    f(&mut n.location);
                }
            }
            StmtKind::Assign { targets, sources, .. } => {
                for e in targets.iter_mut().chain(sources.iter_mut()) {
                    e.visit_locations_mut(f);
                }
            }
            StmtKind::Def(def) => {
                for p in &mut def.params {
                    f(&mut p.location);
                }
                for s in &mut def.body {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::Class(class) => {
                for e in &mut class.bases {
                    e.visit_locations_mut(f);
                }
                for s in &mut class.body {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::If { test, body, elifs, orelse } => {
                test.visit_locations_mut(f);
                for s in body.iter_mut().chain(orelse.iter_mut()) {
                    s.visit_locations_mut(f);
                }
                for (t, b) in elifs {
                    t.visit_locations_mut(f);
                    for s in b {
                        s.visit_locations_mut(f);
                    }
                }
            }
            StmtKind::While { test, body, orelse } => {
                test.visit_locations_mut(f);
                for s in body.iter_mut().chain(orelse.iter_mut()) {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::For { target, iter, body, orelse } => {
                target.visit_locations_mut(f);
                iter.visit_locations_mut(f);
                for s in body.iter_mut().chain(orelse.iter_mut()) {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                for s in body.iter_mut() {
                    s.visit_locations_mut(f);
                }
                for h in handlers {
                    f(&mut h.location);
                    if let Some(t) = &mut h.exc_type {
                        t.visit_locations_mut(f);
                    }
                    if let Some((_, loc)) = &mut h.alias {
                        f(loc);
                    }
                    for s in &mut h.body {
                        s.visit_locations_mut(f);
                    }
                }
                for s in orelse.iter_mut().chain(finalbody.iter_mut()) {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::With { items, body } => {
                for item in items {
                    f(&mut item.location);
                    item.context.visit_locations_mut(f);
                    if let Some(a) = &mut item.alias {
                        a.visit_locations_mut(f);
                    }
                }
                for s in body {
                    s.visit_locations_mut(f);
                }
            }
            StmtKind::Return { value } | StmtKind::Raise { value } => {
                if let Some(v) = value {
                    v.visit_locations_mut(f);
                }
            }
            StmtKind::Delete { targets } => {
                for e in targets {
                    e.visit_locations_mut(f);
                }
            }
            StmtKind::Assert { test, message } => {
                test.visit_locations_mut(f);
                if let Some(m) = message {
                    m.visit_locations_mut(f);
                }
            }
            StmtKind::Expr { value } => value.visit_locations_mut(f),
            StmtKind::Global { .. }
            | StmtKind::Nonlocal { .. }
            | StmtKind::Pass
            | StmtKind::Break
            | StmtKind::Continue => {}
        }
    }
}

impl Module {
    /// Visit every location in the module.
    pub fn visit_locations_mut(&mut self, f: &mut impl FnMut(&mut Location)) {
        f(&mut self.location);
        for stmt in &mut self.code {
            stmt.visit_locations_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_contains() {
        let outer = Location::new(1, 0, 5, 10);
        let inner = Location::new(2, 4, 3, 2);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_location_intersects_overlap() {
        let a = Location::new(1, 0, 2, 5);
        let b = Location::new(2, 0, 4, 0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        let c = Location::new(5, 0, 6, 0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_same_coordinates_different_paths_distinct() {
        let mut a = Location::new(1, 0, 1, 5);
        let mut b = a.clone();
        a.path = Some("e1".into());
        b.path = Some("e2".into());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_shift_lines() {
        let mut loc = Location::new(1, 0, 2, 3);
        loc.shift_lines(4);
        assert_eq!(loc.first_line, 5);
        assert_eq!(loc.last_line, 6);
        loc.shift_lines(-4);
        assert_eq!(loc.first_line, 1);
    }
}
