//! Dataflow analysis: a fixed point over the control-flow graph producing
//! dataflow edges and unresolved uses.
//!
//! The transfer function is table-driven (see [`crate::defuse`] for the
//! gen/kill rules). Each block keeps a running [`DefUse`] triple; a block is
//! re-queued whenever a predecessor's triple grows. Control dependencies
//! recorded by the CFG builder are appended as ref-less edges after the data
//! fixed point.

pub mod side_effects;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cfg::Cfg;
use crate::defuse::{self, DefUse};
use crate::python::ast::{Location, Stmt, StmtKind};
use crate::refs::{Ref, RefKind, RefLevel, RefSet};
use crate::set::{KeyedSet, SetMember};
use crate::specs::table::ImportedName;
use crate::specs::{default_specs, SpecBundle, SymbolTable};

/// Iteration guard for the worklist; a correct analysis converges far below
/// this.
const MAX_ITERATIONS: usize = 10_000;

/// One dataflow edge between two program points.
///
/// Identity is the `(from, to)` location pair; edges from control
/// dependencies carry no references.
#[derive(Debug, Clone, Serialize)]
pub struct Dataflow {
    pub from_node: Location,
    pub to_node: Location,
    pub from_ref: Option<Ref>,
    pub to_ref: Option<Ref>,
}

impl SetMember for Dataflow {
    fn key(&self) -> String {
        format!("{}->{}", self.from_node.canonical(), self.to_node.canonical())
    }
}

/// Keyed set of dataflow edges.
pub type DataflowSet = KeyedSet<Dataflow>;

/// Result of analysing one CFG.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub dataflows: DataflowSet,
    /// Uses that no definition reached.
    pub undefined_refs: RefSet,
}

/// The dataflow analyzer: owns the symbol table that imports and function
/// definitions accumulate into, and the per-statement def/use cache.
///
/// One analyzer must not be shared across concurrent analyses; give each
/// analysis its own instance.
pub struct DataflowAnalyzer {
    symbol_table: SymbolTable,
    def_use_cache: FxHashMap<String, DefUse>,
}

impl Default for DataflowAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataflowAnalyzer {
    /// Analyzer over the default spec bundle.
    pub fn new() -> Self {
        Self::with_specs(default_specs().clone())
    }

    /// Analyzer over a caller-provided spec bundle.
    pub fn with_specs(specs: SpecBundle) -> Self {
        Self {
            symbol_table: SymbolTable::new(specs),
            def_use_cache: FxHashMap::default(),
        }
    }

    /// The accumulated symbol table.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    /// The def/use triple of one statement.
    ///
    /// Cached on the statement's canonical location; locations are unique
    /// per cell parse, so the cache is never invalidated.
    pub fn def_use_for_statement(&mut self, stmt: &Stmt, incoming_defs: &RefSet) -> DefUse {
        let key = stmt.location.canonical();
        if let Some(cached) = self.def_use_cache.get(&key) {
            return cached.clone();
        }
        let computed = self.compute_def_use(stmt, incoming_defs);
        self.def_use_cache.insert(key, computed.clone());
        computed
    }

    fn compute_def_use(&mut self, stmt: &Stmt, incoming_defs: &RefSet) -> DefUse {
        let mut definitions = RefSet::new();
        let mut updates = RefSet::new();
        let mut uses = RefSet::new();

        match &stmt.kind {
            StmtKind::Import { names } => {
                for name in names {
                    definitions.add(Ref::new(
                        name.bound_name(),
                        RefKind::Import,
                        RefLevel::Definition,
                        name.location.clone(),
                        stmt.location.clone(),
                    ));
                    self.symbol_table
                        .import_module(&name.name, name.alias.as_deref());
                }
            }
            StmtKind::FromImport { module, names, wildcard } => {
                for name in names {
                    definitions.add(Ref::new(
                        name.bound_name(),
                        RefKind::Import,
                        RefLevel::Definition,
                        name.location.clone(),
                        stmt.location.clone(),
                    ));
                }
                let imports: Vec<ImportedName> = if *wildcard {
                    vec![ImportedName::plain("*")]
                } else {
                    names
                        .iter()
                        .map(|n| ImportedName {
                            name: n.name.clone(),
                            alias: n.alias.clone(),
                        })
                        .collect()
                };
                self.symbol_table.import_module_definitions(module, &imports);
            }
            StmtKind::Def(def) => {
                definitions.add(Ref::new(
                    &def.name,
                    RefKind::Function,
                    RefLevel::Definition,
                    stmt.location.clone(),
                    stmt.location.clone(),
                ));
                let (free_vars, spec) = self.analyze_def(def);
                self.symbol_table.put_function(spec);
                uses = free_vars;
            }
            StmtKind::Class(class) => {
                definitions.add(Ref::new(
                    &class.name,
                    RefKind::Class,
                    RefLevel::Definition,
                    stmt.location.clone(),
                    stmt.location.clone(),
                ));
                for child in &class.body {
                    let child_du = self.def_use_for_statement(child, incoming_defs);
                    uses.union_into(&child_du.uses_all());
                }
            }
            StmtKind::Assign { targets, sources, op } => {
                let target_set = defuse::target_refs(
                    stmt,
                    targets,
                    sources,
                    op.is_some(),
                    incoming_defs,
                    &self.symbol_table,
                );
                for r in target_set.items() {
                    match r.level {
                        RefLevel::Definition => definitions.add(r.clone()),
                        _ => updates.add(r.clone()),
                    }
                }
                updates.union_into(&defuse::call_mutations(
                    stmt,
                    incoming_defs,
                    &self.symbol_table,
                ));
                definitions.union_into(&defuse::annotation_defs(stmt));

                for source in sources {
                    defuse::name_uses(source, stmt, &mut uses);
                }
                if op.is_some() {
                    for target in targets {
                        defuse::name_uses(target, stmt, &mut uses);
                    }
                }
            }
            _ => {
                updates.union_into(&defuse::call_mutations(
                    stmt,
                    incoming_defs,
                    &self.symbol_table,
                ));
                definitions.union_into(&defuse::annotation_defs(stmt));
                uses = defuse::gather_statement_uses(stmt);
            }
        }

        DefUse {
            definitions,
            updates,
            uses,
        }
    }

    /// Nested analysis of a function body: returns the body's free
    /// variables (its unresolved uses with parameters seeded as
    /// definitions) and the function's inferred side-effect spec.
    fn analyze_def(
        &mut self,
        def: &crate::python::ast::FunctionDef,
    ) -> (RefSet, crate::specs::FunctionSpec) {
        let cfg = Cfg::from_statements(&def.body);
        let seeds: RefSet = def
            .params
            .iter()
            .map(|param| {
                Ref::new(
                    &param.name,
                    RefKind::Variable,
                    RefLevel::Definition,
                    param.location.clone(),
                    param.location.clone(),
                )
            })
            .collect();
        let result = self.analyze(&cfg, Some(&seeds));
        let spec = side_effects::infer_spec(def, &result, &self.symbol_table);
        (result.undefined_refs, spec)
    }

    /// Run the fixed point over a CFG.
    ///
    /// `seed_refs`, when given, are merged into the entry block's incoming
    /// state as definitions (used to seed function parameters).
    pub fn analyze(&mut self, cfg: &Cfg, seed_refs: Option<&RefSet>) -> AnalysisResult {
        let mut state: FxHashMap<usize, DefUse> = cfg
            .blocks()
            .iter()
            .map(|b| (b.id.0, DefUse::default()))
            .collect();
        if let Some(seeds) = seed_refs {
            state
                .get_mut(&cfg.entry().0)
                .expect("entry block exists")
                .seed_definitions(seeds);
        }

        // Seeded with all blocks in reverse order and drained from the
        // back, so the entry block is processed first and inferred types
        // are in place before the statements that resolve through them.
        let mut worklist: Vec<_> = cfg.blocks().iter().rev().map(|b| b.id).collect();
        let mut dataflows = DataflowSet::new();
        let mut defined = RefSet::new();
        let mut undefined = RefSet::new();
        let mut iterations = 0usize;

        while let Some(block_id) = worklist.pop() {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                warn!(iterations, "dataflow fixed point exceeded iteration guard");
                break;
            }

            // The block's old triple is the accumulator; predecessors are
            // unioned into it so its own contribution survives rescheduling.
            let mut block_in = state[&block_id.0].clone();
            for pred in cfg.predecessors(block_id) {
                block_in.union_into(&state[&pred.0]);
            }

            for stmt in &cfg.blocks()[block_id.0].statements {
                let statement_du = self.def_use_for_statement(stmt, &block_in.defs());

                for level in RefLevel::ALL {
                    for to_ref in statement_du.level(level).items() {
                        for from_ref in block_in
                            .level(level)
                            .items()
                            .filter(|r| r.name == to_ref.name)
                        {
                            dataflows.add(Dataflow {
                                from_node: from_ref.node.clone(),
                                to_node: to_ref.node.clone(),
                                from_ref: Some(from_ref.clone()),
                                to_ref: Some(to_ref.clone()),
                            });
                            defined.add(to_ref.clone());
                        }
                    }
                }

                undefined.union_into(&statement_du.uses_all());
                undefined = undefined.minus(&defined);

                block_in.apply(&statement_du);
            }

            if !block_in.equals(&state[&block_id.0]) {
                state.insert(block_id.0, block_in);
                for succ in cfg.successors(block_id) {
                    if !worklist.contains(succ) {
                        worklist.push(*succ);
                    }
                }
            }
        }
        debug!(iterations, edges = dataflows.size(), "dataflow fixed point");

        // Late flows may have satisfied uses recorded early.
        undefined = undefined.minus(&defined);

        cfg.visit_control_dependencies(|control, dependent| {
            if control.location != dependent.location {
                dataflows.add(Dataflow {
                    from_node: control.location.clone(),
                    to_node: dependent.location.clone(),
                    from_ref: None,
                    to_ref: None,
                });
            }
        });

        AnalysisResult {
            dataflows,
            undefined_refs: undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::parser::parse;

    fn analyze(text: &str) -> AnalysisResult {
        let module = parse(text).unwrap();
        let cfg = Cfg::from_module(&module);
        DataflowAnalyzer::new().analyze(&cfg, None)
    }

    fn has_edge(result: &AnalysisResult, from_line: usize, to_line: usize) -> bool {
        result.dataflows.some(|f| {
            f.from_node.first_line == from_line && f.to_node.first_line == to_line
        })
    }

    #[test]
    fn test_straight_line_flow() {
        let result = analyze("a = 1\nb = a\n");
        assert!(has_edge(&result, 1, 2));
        assert!(result.undefined_refs.empty());
    }

    #[test]
    fn test_undefined_use_reported() {
        let result = analyze("b = a\n");
        assert_eq!(result.undefined_refs.size(), 1);
        assert_eq!(result.undefined_refs.items().next().unwrap().name, "a");
    }

    #[test]
    fn test_redefinition_kills_earlier_flow() {
        let result = analyze("x = 1\nx = 2\ny = x\n");
        assert!(has_edge(&result, 2, 3));
        assert!(!has_edge(&result, 1, 3));
    }

    #[test]
    fn test_both_branches_reach_join() {
        let result = analyze("if c:\n    y = 1\nelse:\n    y = 2\nz = y\n");
        assert!(has_edge(&result, 2, 5));
        assert!(has_edge(&result, 4, 5));
    }

    #[test]
    fn test_loop_body_flow_through_back_edge() {
        let result = analyze("x = 0\nfor i in xs:\n    x = x + i\ny = x\n");
        // Initial definition reaches the loop body use.
        assert!(has_edge(&result, 1, 3));
        // The loop body's own definition flows around the back edge.
        assert!(has_edge(&result, 3, 3));
        // Both reach the final use.
        assert!(has_edge(&result, 1, 4));
        assert!(has_edge(&result, 3, 4));
    }

    #[test]
    fn test_control_dependency_edges_present() {
        let result = analyze("if c:\n    y = 1\n");
        assert!(has_edge(&result, 1, 2));
    }

    #[test]
    fn test_augmented_assignment_links_def_and_use() {
        let result = analyze("a = 1\na += 1\nb = a\n");
        assert!(has_edge(&result, 1, 2));
        assert!(has_edge(&result, 2, 3));
    }

    #[test]
    fn test_update_chain_through_method_calls() {
        let result = analyze(
            "import pandas as pd\nd = pd.read_csv(p)\nd.pop('c')\nd.memory_usage()\nd.count()\n",
        );
        assert!(has_edge(&result, 1, 2));
        assert!(has_edge(&result, 2, 3));
        assert!(has_edge(&result, 3, 5));
        // Nothing flows out of the pure observation on line 4.
        assert!(!result.dataflows.some(|f| f.from_node.first_line == 4));
    }

    #[test]
    fn test_function_free_variables_exclude_params() {
        let module = parse("def f(a):\n    return a + b\n").unwrap();
        let mut analyzer = DataflowAnalyzer::new();
        let du = analyzer.def_use_for_statement(&module.code[0], &RefSet::new());
        let names: Vec<String> = du.uses.items().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["b".to_string()]);
    }

    #[test]
    fn test_def_registers_side_effect_spec() {
        let module = parse("def fill(xs):\n    xs.append(1)\n").unwrap();
        let mut analyzer = DataflowAnalyzer::new();
        analyzer.def_use_for_statement(&module.code[0], &RefSet::new());
        let spec = analyzer.symbol_table().lookup_function("fill").unwrap();
        let positions: Vec<usize> = spec.updated_positions().collect();
        assert_eq!(positions, vec![1]);
    }

    #[test]
    fn test_def_use_cache_is_stable() {
        let module = parse("a = 1\n").unwrap();
        let mut analyzer = DataflowAnalyzer::new();
        let first = analyzer.def_use_for_statement(&module.code[0], &RefSet::new());
        let second = analyzer.def_use_for_statement(&module.code[0], &RefSet::new());
        assert!(first.equals(&second));
    }

    #[test]
    fn test_dataflow_edges_deduplicated() {
        // Two uses of the same name in one statement produce one edge.
        let result = analyze("a = 1\nb = a + a\n");
        let count = result
            .dataflows
            .items()
            .filter(|f| f.from_node.first_line == 1 && f.to_node.first_line == 2)
            .count();
        assert_eq!(count, 1);
    }
}
