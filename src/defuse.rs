//! Per-statement reference gathering.
//!
//! The pieces here are pure walks over a single statement's syntax: call
//! analysis (which consults the symbol table to decide whether calls mutate
//! their arguments), def-annotation analysis, assignment target analysis,
//! and free-name gathering. The orchestration per statement shape, and the
//! recursive analyses a `def` statement needs, live on
//! [`crate::dataflow::DataflowAnalyzer`].

use std::sync::Arc;

use serde::Deserialize;

use crate::python::ast::{Expr, ExprKind, Location, Stmt};
use crate::python::walker;
use crate::refs::{Ref, RefKind, RefLevel, RefSet};
use crate::specs::{FunctionSpec, SymbolTable, UpdateTarget};

/// The DefUse triple attached to a program point.
///
/// The same shape serves two roles, exactly as in the fixed-point transfer:
/// a statement's extracted references partitioned by level, and a block's
/// running state where each slot holds the references that feed later
/// occurrences of that level (the `uses` slot accumulates the definitions
/// and updates that later uses link from).
#[derive(Debug, Clone, Default)]
pub struct DefUse {
    pub definitions: RefSet,
    pub updates: RefSet,
    pub uses: RefSet,
}

/// Which statement levels feed a given slot.
const GEN_RULES: [(RefLevel, &[RefLevel]); 3] = [
    (RefLevel::Use, &[RefLevel::Update, RefLevel::Definition]),
    (RefLevel::Update, &[RefLevel::Definition]),
    (RefLevel::Definition, &[]),
];

/// Which existing levels a genned reference kills.
fn kill_levels(genned: RefLevel) -> &'static [RefLevel] {
    match genned {
        RefLevel::Definition | RefLevel::Update => &[RefLevel::Definition, RefLevel::Update],
        RefLevel::Use => &[],
    }
}

impl DefUse {
    /// References at a given level / in a given slot.
    pub fn level(&self, level: RefLevel) -> &RefSet {
        match level {
            RefLevel::Definition => &self.definitions,
            RefLevel::Update => &self.updates,
            RefLevel::Use => &self.uses,
        }
    }

    fn level_mut(&mut self, level: RefLevel) -> &mut RefSet {
        match level {
            RefLevel::Definition => &mut self.definitions,
            RefLevel::Update => &mut self.updates,
            RefLevel::Use => &mut self.uses,
        }
    }

    /// All defining references: definitions and updates.
    pub fn defs(&self) -> RefSet {
        self.definitions.union(&self.updates)
    }

    /// All reading references: updates and uses.
    pub fn uses_all(&self) -> RefSet {
        self.updates.union(&self.uses)
    }

    /// Component-wise union.
    pub fn union_into(&mut self, other: &DefUse) {
        self.definitions.union_into(&other.definitions);
        self.updates.union_into(&other.updates);
        self.uses.union_into(&other.uses);
    }

    /// Component-wise equality.
    pub fn equals(&self, other: &DefUse) -> bool {
        self.definitions.equals(&other.definitions)
            && self.updates.equals(&other.updates)
            && self.uses.equals(&other.uses)
    }

    /// Merge seed references into the running state as definitions: they
    /// must satisfy later uses and updates.
    pub(crate) fn seed_definitions(&mut self, seeds: &RefSet) {
        self.uses.union_into(seeds);
        self.updates.union_into(seeds);
    }

    /// Apply the gen/kill transfer of one statement's references to this
    /// running state.
    pub(crate) fn apply(&mut self, statement: &DefUse) {
        for (slot, gen_levels) in GEN_RULES {
            let mut gen = RefSet::new();
            for level in gen_levels {
                gen.union_into(statement.level(*level));
            }
            let slot = self.level_mut(slot);
            let killed = slot.filter(|existing| {
                gen.some(|g| {
                    g.name == existing.name && kill_levels(g.level).contains(&existing.level)
                })
            });
            *slot = slot.minus(&killed).union(&gen);
        }
    }
}

// =============================================================================
// Call analysis
// =============================================================================

/// Resolve a call's callee to a function spec, if possible.
///
/// Resolution order: bare name in the symbol table; `module.function` for a
/// known module (or dotted module path); `variable.method` for a variable
/// whose definition carries an inferred type.
pub(crate) fn resolve_call(
    func: &Expr,
    incoming_defs: &RefSet,
    table: &SymbolTable,
) -> Option<Arc<FunctionSpec>> {
    match &func.kind {
        ExprKind::Name { id } => table.lookup_function(id),
        ExprKind::Attribute { value, attr } => {
            if let Some(receiver) = value.as_name() {
                if table.module(receiver).is_some() {
                    return table.lookup_module_function(receiver, attr);
                }
                let typed = incoming_defs
                    .items()
                    .find(|r| r.name == receiver && r.inferred_type.is_some())?;
                return typed.inferred_type.as_ref().expect("just checked").method(attr);
            }
            // Fully dotted module path, e.g. `matplotlib.pyplot.plot`.
            let path = dotted_path(value)?;
            table.module(&path)?.function(attr)
        }
        _ => None,
    }
}

/// Render a nested attribute chain of names as a dotted path.
fn dotted_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name { id } => Some(id.clone()),
        ExprKind::Attribute { value, attr } => Some(format!("{}.{}", dotted_path(value)?, attr)),
        _ => None,
    }
}

/// Mutation references produced by the calls in a statement.
///
/// A resolved spec pins down exactly which arguments are updated. An
/// unresolved callee is assumed to mutate every bare-name argument and the
/// bare-name receiver.
pub(crate) fn call_mutations(stmt: &Stmt, incoming_defs: &RefSet, table: &SymbolTable) -> RefSet {
    let mut out = RefSet::new();
    walker::walk_exprs(stmt, &mut |expr, _| {
        let ExprKind::Call { func, args } = &expr.kind else {
            return;
        };
        match resolve_call(func, incoming_defs, table) {
            Some(spec) => {
                for update in &spec.updates {
                    match update {
                        UpdateTarget::Position(0) => {
                            if let ExprKind::Attribute { value, .. } = &func.kind {
                                if let Some(receiver) = value.as_name() {
                                    out.add(mutation_ref(receiver, value, stmt));
                                }
                            }
                        }
                        UpdateTarget::Position(pos) => {
                            let positional: Vec<&Expr> = args
                                .iter()
                                .filter(|a| a.keyword.is_none())
                                .map(|a| &a.value)
                                .collect();
                            if let Some(arg) = positional.get(pos - 1) {
                                if let Some(name) = arg.as_name() {
                                    out.add(mutation_ref(name, arg, stmt));
                                }
                            }
                        }
                        // Mutated globals are acknowledged but not modelled.
                        UpdateTarget::Global(_) => {}
                    }
                }
            }
            None => {
                for arg in args {
                    if let Some(name) = arg.value.as_name() {
                        out.add(mutation_ref(name, &arg.value, stmt));
                    }
                }
                if let ExprKind::Attribute { value, .. } = &func.kind {
                    if let Some(receiver) = value.as_name() {
                        out.add(mutation_ref(receiver, value, stmt));
                    }
                }
            }
        }
    });
    out
}

fn mutation_ref(name: &str, at: &Expr, stmt: &Stmt) -> Ref {
    Ref::new(
        name,
        RefKind::Mutation,
        RefLevel::Update,
        at.location.clone(),
        stmt.location.clone(),
    )
}

// =============================================================================
// Def-annotation analysis
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnnotatedDef {
    name: String,
    pos: [[usize; 2]; 2],
}

const DEF_ANNOTATION_PREFIX: &str = "defs: ";

/// Definitions declared by `"defs: <JSON>"` string literals.
///
/// Line deltas in the annotation are relative to the literal's first line;
/// columns are absolute. Malformed payloads are silently ignored.
pub(crate) fn annotation_defs(stmt: &Stmt) -> RefSet {
    let mut out = RefSet::new();
    walker::walk_exprs(stmt, &mut |expr, _| {
        let ExprKind::Str { value } = &expr.kind else {
            return;
        };
        let Some(payload) = value.strip_prefix(DEF_ANNOTATION_PREFIX) else {
            return;
        };
        let Ok(entries) = serde_json::from_str::<Vec<AnnotatedDef>>(payload) else {
            return;
        };
        for entry in entries {
            let mut location = Location::new(
                expr.location.first_line + entry.pos[0][0],
                entry.pos[0][1],
                expr.location.first_line + entry.pos[1][0],
                entry.pos[1][1],
            );
            location.path = expr.location.path.clone();
            out.add(Ref::new(
                entry.name,
                RefKind::Magic,
                RefLevel::Definition,
                location,
                stmt.location.clone(),
            ));
        }
    });
    out
}

// =============================================================================
// Assignment target analysis
// =============================================================================

/// References defined or updated by assignment targets.
///
/// A bare name is a definition; the base name of a dotted or subscripted
/// target is an update; names on the index side of a subscript bind nothing.
/// Augmented assignment upgrades every target definition to an update. When
/// a target's source is a call whose spec declares a return type, the type
/// handle is attached to the target's definition reference.
pub(crate) fn target_refs(
    stmt: &Stmt,
    targets: &[Expr],
    sources: &[Expr],
    augmented: bool,
    incoming_defs: &RefSet,
    table: &SymbolTable,
) -> RefSet {
    let mut refs: Vec<Ref> = Vec::new();
    for target in targets {
        collect_target(target, augmented, stmt, &mut refs);
    }

    for target in targets {
        if sources.len() == 1 {
            attach_inferred_types(target, &sources[0], &mut refs, incoming_defs, table);
        }
    }

    RefSet::from_items(refs)
}

fn collect_target(expr: &Expr, augmented: bool, stmt: &Stmt, out: &mut Vec<Ref>) {
    match &expr.kind {
        ExprKind::Name { id } => {
            let level = if augmented {
                RefLevel::Update
            } else {
                RefLevel::Definition
            };
            out.push(Ref::new(
                id,
                RefKind::Variable,
                level,
                expr.location.clone(),
                stmt.location.clone(),
            ));
        }
        ExprKind::Tuple { elts } | ExprKind::List { elts } => {
            for elt in elts {
                collect_target(elt, augmented, stmt, out);
            }
        }
        ExprKind::Starred { value } => collect_target(value, augmented, stmt, out),
        ExprKind::Attribute { value, .. } | ExprKind::Subscript { value, .. } => {
            if let Some((name, location)) = chain_base(value) {
                out.push(Ref::new(
                    name,
                    RefKind::Variable,
                    RefLevel::Update,
                    location,
                    stmt.location.clone(),
                ));
            }
        }
        _ => {}
    }
}

/// The leftmost name of an attribute/subscript chain.
fn chain_base(expr: &Expr) -> Option<(String, Location)> {
    match &expr.kind {
        ExprKind::Name { id } => Some((id.clone(), expr.location.clone())),
        ExprKind::Attribute { value, .. } | ExprKind::Subscript { value, .. } => chain_base(value),
        _ => None,
    }
}

fn attach_inferred_types(
    target: &Expr,
    source: &Expr,
    refs: &mut [Ref],
    incoming_defs: &RefSet,
    table: &SymbolTable,
) {
    match (&target.kind, &source.kind) {
        (ExprKind::Tuple { elts: t }, ExprKind::Tuple { elts: s })
        | (ExprKind::List { elts: t }, ExprKind::List { elts: s })
            if t.len() == s.len() =>
        {
            for (target, source) in t.iter().zip(s.iter()) {
                attach_inferred_types(target, source, refs, incoming_defs, table);
            }
        }
        (ExprKind::Name { id }, ExprKind::Call { func, .. }) => {
            let Some(spec) = resolve_call(func, incoming_defs, table) else {
                return;
            };
            let Some(returns_type) = spec.returns_type.clone() else {
                return;
            };
            if let Some(target_ref) = refs
                .iter_mut()
                .find(|r| r.name == *id && r.level == RefLevel::Definition)
            {
                target_ref.inferred_type = Some(returns_type);
            }
        }
        _ => {}
    }
}

// =============================================================================
// Name gathering
// =============================================================================

/// Use references for every bare name in an expression subtree.
pub(crate) fn name_uses(expr: &Expr, stmt: &Stmt, out: &mut RefSet) {
    let mut names = Vec::new();
    expr.gather_names(&mut names);
    for name_expr in names {
        if let Some(name) = name_expr.as_name() {
            out.add(Ref::new(
                name,
                RefKind::Variable,
                RefLevel::Use,
                name_expr.location.clone(),
                stmt.location.clone(),
            ));
        }
    }
}

/// Default use rule: every bare name in the statement's subtree, nested
/// statements included.
pub(crate) fn gather_statement_uses(stmt: &Stmt) -> RefSet {
    let mut out = RefSet::new();
    walker::walk_stmts(stmt, &mut |inner| {
        for expr in inner.expressions() {
            name_uses(expr, stmt, &mut out);
        }
    });
    out
}
