//! Parameter side-effect inference.
//!
//! When the extractor encounters a function definition, the body is analysed
//! with its parameters seeded as definitions. A parameter whose value flows
//! into a potentially side-effecting statement is recorded in the function's
//! spec `updates` list, so later calls mark the corresponding argument as a
//! mutation. Side-effecting means: an assignment through a dotted or
//! subscripted target, or a call whose callee has no spec; calls with
//! resolved specs contribute transitively through their own update
//! positions.
//!
//! Position 0 denotes the receiver: when the first parameter is `self`,
//! parameters map to their index, otherwise to index + 1.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::dataflow::AnalysisResult;
use crate::defuse::resolve_call;
use crate::python::ast::{Expr, ExprKind, FunctionDef, Stmt, StmtKind};
use crate::python::walker;
use crate::refs::RefSet;
use crate::specs::{FunctionSpec, SymbolTable, UpdateTarget};

/// Infer a function spec from an analysed body.
pub(crate) fn infer_spec(
    def: &FunctionDef,
    analysis: &AnalysisResult,
    table: &SymbolTable,
) -> FunctionSpec {
    // Forward adjacency over the dataflow edges, by canonical node key.
    let mut adjacency: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for flow in analysis.dataflows.items() {
        adjacency
            .entry(flow.from_node.canonical())
            .or_default()
            .push(flow.to_node.canonical());
    }

    let body_statements = collect_statements(&def.body);
    let has_receiver = def.params.first().map(|p| p.name == "self").unwrap_or(false);

    let mut updates = Vec::new();
    for (index, param) in def.params.iter().enumerate() {
        let position = if has_receiver { index } else { index + 1 };
        let reachable = reach_from(&param.location.canonical(), &adjacency);

        let mutated = body_statements.iter().any(|stmt| {
            let stmt_key = stmt.location.canonical();
            let touched = reachable.contains(&stmt_key);
            (touched && is_side_effecting(stmt, table))
                || mutated_by_resolved_call(stmt, param, &reachable, analysis, table)
        });
        if mutated {
            updates.push(UpdateTarget::Position(position));
        }
    }

    FunctionSpec {
        name: def.name.clone(),
        updates,
        reads: Vec::new(),
        returns: None,
        returns_type: None,
        higher_order: None,
    }
}

/// Transitive closure of the edge relation from one node key.
fn reach_from(start: &str, adjacency: &FxHashMap<String, Vec<String>>) -> FxHashSet<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut frontier = vec![start.to_string()];
    while let Some(key) = frontier.pop() {
        if let Some(targets) = adjacency.get(&key) {
            for target in targets {
                if seen.insert(target.clone()) {
                    frontier.push(target.clone());
                }
            }
        }
    }
    seen
}

fn collect_statements(body: &[Stmt]) -> Vec<&Stmt> {
    let mut out = Vec::new();
    for stmt in body {
        walker::walk_stmts(stmt, &mut |s| out.push(s));
    }
    out
}

/// Dotted/indexed assignment targets and unresolved calls may mutate state
/// that flowed into them.
fn is_side_effecting(stmt: &Stmt, table: &SymbolTable) -> bool {
    match &stmt.kind {
        StmtKind::Assign { targets, .. } => targets.iter().any(|t| {
            matches!(
                t.kind,
                ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
            )
        }),
        _ => {
            let mut unresolved_call = false;
            walker::walk_exprs(stmt, &mut |expr, _| {
                if let ExprKind::Call { func, .. } = &expr.kind {
                    if resolve_call(func, &RefSet::new(), table).is_none() {
                        unresolved_call = true;
                    }
                }
            });
            unresolved_call
        }
    }
}

/// Whether a resolved inner call mutates a value that flowed from `param`:
/// the call's spec updates position `i` and the i-th argument (or receiver)
/// is a bare name whose value at this statement flows from the parameter.
fn mutated_by_resolved_call(
    stmt: &Stmt,
    param: &crate::python::ast::Parameter,
    reachable: &FxHashSet<String>,
    analysis: &AnalysisResult,
    table: &SymbolTable,
) -> bool {
    let mut mutated = false;
    walker::walk_exprs(stmt, &mut |expr, _| {
        if mutated {
            return;
        }
        let ExprKind::Call { func, args } = &expr.kind else {
            return;
        };
        let Some(spec) = resolve_call(func, &RefSet::new(), table) else {
            return;
        };
        for position in spec.updated_positions() {
            let argument: Option<&Expr> = if position == 0 {
                match &func.kind {
                    ExprKind::Attribute { value, .. } => Some(value.as_ref()),
                    _ => None,
                }
            } else {
                args.iter()
                    .filter(|a| a.keyword.is_none())
                    .map(|a| &a.value)
                    .nth(position - 1)
            };
            let Some(name) = argument.and_then(|a| a.as_name()) else {
                continue;
            };
            if flows_from_param(name, stmt, param, reachable, analysis) {
                mutated = true;
                return;
            }
        }
    });
    mutated
}

fn flows_from_param(
    name: &str,
    stmt: &Stmt,
    param: &crate::python::ast::Parameter,
    reachable: &FxHashSet<String>,
    analysis: &AnalysisResult,
) -> bool {
    if name == param.name && reachable.contains(&stmt.location.canonical()) {
        return true;
    }
    // A rebinding chain: some edge into this statement carries the name and
    // originates inside the parameter's reach.
    analysis.dataflows.some(|flow| {
        flow.to_node == stmt.location
            && flow
                .to_ref
                .as_ref()
                .map(|r| r.name == name)
                .unwrap_or(false)
            && (flow.from_node == param.location
                || reachable.contains(&flow.from_node.canonical()))
    })
}

#[cfg(test)]
mod tests {
    use crate::dataflow::DataflowAnalyzer;
    use crate::python::parser::parse;
    use crate::refs::RefSet;

    fn inferred_updates(source: &str, name: &str) -> Vec<usize> {
        let module = parse(source).unwrap();
        let mut analyzer = DataflowAnalyzer::new();
        for stmt in &module.code {
            analyzer.def_use_for_statement(stmt, &RefSet::new());
        }
        analyzer
            .symbol_table()
            .lookup_function(name)
            .map(|spec| spec.updated_positions().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_attribute_assignment_marks_parameter() {
        let updates = inferred_updates("def tag(rec):\n    rec.label = 1\n", "tag");
        assert_eq!(updates, vec![1]);
    }

    #[test]
    fn test_subscript_assignment_marks_flowing_parameters() {
        // Both the container and the stored value flow into the mutating
        // statement; the index is not read by the assignment rule.
        let updates = inferred_updates("def put(d, k, v):\n    d[k] = v\n", "put");
        assert_eq!(updates, vec![1, 3]);
    }

    #[test]
    fn test_pure_function_marks_nothing() {
        let updates = inferred_updates("def double(x):\n    return x * 2\n", "double");
        assert!(updates.is_empty());
    }

    #[test]
    fn test_resolved_inner_call_propagates() {
        // random.shuffle updates its first argument; `xs` flows into it.
        let source = "import random\ndef scramble(xs):\n    random.shuffle(xs)\n";
        let updates = inferred_updates(source, "scramble");
        assert_eq!(updates, vec![1]);
    }

    #[test]
    fn test_print_only_body_is_pure() {
        let updates = inferred_updates("def show(x):\n    print(x)\n", "show");
        assert!(updates.is_empty());
    }

    #[test]
    fn test_self_receiver_is_position_zero() {
        let updates = inferred_updates(
            "def mark(self, flag):\n    self.flag = flag\n",
            "mark",
        );
        // `self` is the receiver (position 0); `flag` flows into the dotted
        // assignment as well.
        assert_eq!(updates, vec![0, 1]);
    }

    #[test]
    fn test_rebinding_chain_still_marks() {
        let source = "def fill(xs):\n    ys = xs\n    ys.append(1)\n";
        let updates = inferred_updates(source, "fill");
        assert_eq!(updates, vec![1]);
    }

    #[test]
    fn test_inferred_spec_guards_later_calls() {
        // Once `helper` is known pure, calling it does not mutate arguments.
        let source = "def helper(a):\n    return a + 1\nb = [1]\nhelper(b)\n";
        let module = parse(source).unwrap();
        let mut analyzer = DataflowAnalyzer::new();
        let cfg = crate::cfg::Cfg::from_module(&module);
        let result = analyzer.analyze(&cfg, None);
        // No mutation edge from b's definition into the helper call beyond
        // the plain use edge; b is not updated on line 4.
        assert!(!result.dataflows.some(|f| f
            .to_ref
            .as_ref()
            .map(|r| r.name == "b" && r.level == crate::refs::RefLevel::Update)
            .unwrap_or(false)));
    }
}
