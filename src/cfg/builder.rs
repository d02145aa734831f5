//! CFG construction from a statement list.

use crate::cfg::types::{Block, BlockId, Cfg};
use crate::python::ast::{Expr, Location, Stmt, StmtKind};

/// Loop context for break/continue edges.
struct LoopFrame {
    head: BlockId,
    after: BlockId,
}

pub(crate) struct CfgBuilder {
    blocks: Vec<Block>,
    edges: Vec<(BlockId, BlockId)>,
    exits: Vec<BlockId>,
    control_deps: Vec<(Stmt, Stmt)>,
    loop_stack: Vec<LoopFrame>,
}

impl CfgBuilder {
    pub(crate) fn build(statements: &[Stmt]) -> Cfg {
        let mut builder = Self {
            blocks: Vec::new(),
            edges: Vec::new(),
            exits: Vec::new(),
            control_deps: Vec::new(),
            loop_stack: Vec::new(),
        };
        let entry = builder.new_block("entry");
        let last = builder.process_suite(statements, entry, None);
        if !builder.exits.contains(&last) {
            builder.exits.push(last);
        }
        Cfg::from_parts(
            builder.blocks,
            builder.edges,
            entry,
            builder.exits,
            builder.control_deps,
        )
    }

    fn new_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            id,
            label: label.to_string(),
            statements: Vec::new(),
        });
        id
    }

    fn append(&mut self, block: BlockId, stmt: Stmt) {
        self.blocks[block.0].statements.push(stmt);
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
        }
    }

    fn depend(&mut self, control: Option<&Stmt>, dependent: &Stmt) {
        if let Some(control) = control {
            self.control_deps.push((control.clone(), dependent.clone()));
        }
    }

    /// Process a statement list, returning the block control falls out of.
    fn process_suite(
        &mut self,
        statements: &[Stmt],
        entry: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let mut current = entry;
        for stmt in statements {
            current = self.process_statement(stmt, current, control);
        }
        current
    }

    fn process_statement(
        &mut self,
        stmt: &Stmt,
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        match &stmt.kind {
            StmtKind::If { test, body, elifs, orelse } => {
                self.process_if(test, body, elifs, orelse, current, control)
            }
            StmtKind::While { test, body, orelse } => {
                self.process_while(test, body, orelse, current, control)
            }
            StmtKind::For { target, iter, body, orelse } => {
                self.process_for(target, iter, body, orelse, current, control)
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                self.process_try(body, handlers, orelse, finalbody, current, control)
            }
            StmtKind::With { items, body } => {
                self.process_with(items, body, current, control)
            }
            StmtKind::Return { .. } | StmtKind::Raise { .. } => {
                self.append(current, stmt.clone());
                self.depend(control, stmt);
                self.exits.push(current);
                self.new_block("unreachable")
            }
            StmtKind::Break => {
                self.append(current, stmt.clone());
                self.depend(control, stmt);
                let after = self.loop_stack.last().map(|frame| frame.after);
                if let Some(after) = after {
                    self.add_edge(current, after);
                }
                self.new_block("unreachable")
            }
            StmtKind::Continue => {
                self.append(current, stmt.clone());
                self.depend(control, stmt);
                let head = self.loop_stack.last().map(|frame| frame.head);
                if let Some(head) = head {
                    self.add_edge(current, head);
                }
                self.new_block("unreachable")
            }
            _ => {
                self.append(current, stmt.clone());
                self.depend(control, stmt);
                current
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_if(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        elifs: &[(Expr, Vec<Stmt>)],
        orelse: &[Stmt],
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let test_stmt = expr_stmt(test);
        self.append(current, test_stmt.clone());
        self.depend(control, &test_stmt);

        let join = self.new_block("after if");

        let body_entry = self.new_block("if body");
        self.add_edge(current, body_entry);
        let body_exit = self.process_suite(body, body_entry, Some(&test_stmt));
        self.add_edge(body_exit, join);

        let mut cond_block = current;
        let mut last_test = test_stmt;
        for (elif_test, elif_body) in elifs {
            let elif_block = self.new_block("elif test");
            self.add_edge(cond_block, elif_block);
            let elif_stmt = expr_stmt(elif_test);
            self.append(elif_block, elif_stmt.clone());
            self.depend(Some(&last_test), &elif_stmt);

            let elif_entry = self.new_block("elif body");
            self.add_edge(elif_block, elif_entry);
            let elif_exit = self.process_suite(elif_body, elif_entry, Some(&elif_stmt));
            self.add_edge(elif_exit, join);

            cond_block = elif_block;
            last_test = elif_stmt;
        }

        if orelse.is_empty() {
            self.add_edge(cond_block, join);
        } else {
            let else_entry = self.new_block("else body");
            self.add_edge(cond_block, else_entry);
            let else_exit = self.process_suite(orelse, else_entry, Some(&last_test));
            self.add_edge(else_exit, join);
        }

        join
    }

    #[allow(clippy::too_many_arguments)]
    fn process_while(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let head = self.new_block("loop head");
        self.add_edge(current, head);
        let test_stmt = expr_stmt(test);
        self.append(head, test_stmt.clone());
        self.depend(control, &test_stmt);

        let after = self.new_block("after loop");
        self.loop_stack.push(LoopFrame { head, after });

        let body_entry = self.new_block("loop body");
        self.add_edge(head, body_entry);
        let body_exit = self.process_suite(body, body_entry, Some(&test_stmt));
        self.add_edge(body_exit, head);

        self.loop_stack.pop();

        if orelse.is_empty() {
            self.add_edge(head, after);
        } else {
            let else_entry = self.new_block("loop else");
            self.add_edge(head, else_entry);
            let else_exit = self.process_suite(orelse, else_entry, Some(&test_stmt));
            self.add_edge(else_exit, after);
        }

        after
    }

    #[allow(clippy::too_many_arguments)]
    fn process_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let head = self.new_block("loop head");
        self.add_edge(current, head);

        // The header binds the loop variable from the iterable on every
        // iteration; model it as an assignment spanning the header.
        let header = Stmt {
            location: span(&target.location, &iter.location),
            kind: StmtKind::Assign {
                targets: vec![target.clone()],
                sources: vec![iter.clone()],
                op: None,
            },
        };
        self.append(head, header.clone());
        self.depend(control, &header);

        let after = self.new_block("after loop");
        self.loop_stack.push(LoopFrame { head, after });

        let body_entry = self.new_block("loop body");
        self.add_edge(head, body_entry);
        let body_exit = self.process_suite(body, body_entry, Some(&header));
        self.add_edge(body_exit, head);

        self.loop_stack.pop();

        if orelse.is_empty() {
            self.add_edge(head, after);
        } else {
            let else_entry = self.new_block("loop else");
            self.add_edge(head, else_entry);
            let else_exit = self.process_suite(orelse, else_entry, Some(&header));
            self.add_edge(else_exit, after);
        }

        after
    }

    fn process_try(
        &mut self,
        body: &[Stmt],
        handlers: &[crate::python::ast::ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let body_entry = self.new_block("try body");
        self.add_edge(current, body_entry);
        let body_exit = self.process_suite(body, body_entry, control);

        let mut exit_points = Vec::new();

        if orelse.is_empty() {
            exit_points.push(body_exit);
        } else {
            let else_entry = self.new_block("try else");
            self.add_edge(body_exit, else_entry);
            exit_points.push(self.process_suite(orelse, else_entry, control));
        }

        for handler in handlers {
            let handler_entry = self.new_block("except");
            // An exception may leave the body anywhere.
            self.add_edge(body_entry, handler_entry);
            self.add_edge(body_exit, handler_entry);

            let binder = match (&handler.alias, &handler.exc_type) {
                (Some((alias, alias_loc)), exc_type) => Some(Stmt {
                    location: handler_binder_span(alias_loc, exc_type),
                    kind: StmtKind::Assign {
                        targets: vec![Expr {
                            location: alias_loc.clone(),
                            kind: crate::python::ast::ExprKind::Name { id: alias.clone() },
                        }],
                        sources: exc_type.iter().cloned().collect(),
                        op: None,
                    },
                }),
                (None, Some(exc_type)) => Some(expr_stmt(exc_type)),
                (None, None) => None,
            };

            let handler_control = match binder {
                Some(binder) => {
                    self.append(handler_entry, binder.clone());
                    self.depend(control, &binder);
                    Some(binder)
                }
                None => control.cloned(),
            };
            let handler_exit =
                self.process_suite(&handler.body, handler_entry, handler_control.as_ref());
            exit_points.push(handler_exit);
        }

        let after = self.new_block("after try");
        if finalbody.is_empty() {
            for point in exit_points {
                self.add_edge(point, after);
            }
        } else {
            let finally_entry = self.new_block("finally");
            for point in exit_points {
                self.add_edge(point, finally_entry);
            }
            let finally_exit = self.process_suite(finalbody, finally_entry, control);
            self.add_edge(finally_exit, after);
        }
        after
    }

    fn process_with(
        &mut self,
        items: &[crate::python::ast::WithItem],
        body: &[Stmt],
        current: BlockId,
        control: Option<&Stmt>,
    ) -> BlockId {
        let mut first_binder: Option<Stmt> = None;
        for item in items {
            let binder = match &item.alias {
                Some(alias) => Stmt {
                    location: item.location.clone(),
                    kind: StmtKind::Assign {
                        targets: vec![alias.clone()],
                        sources: vec![item.context.clone()],
                        op: None,
                    },
                },
                None => Stmt {
                    location: item.location.clone(),
                    kind: StmtKind::Expr {
                        value: item.context.clone(),
                    },
                },
            };
            self.append(current, binder.clone());
            self.depend(control, &binder);
            if first_binder.is_none() {
                first_binder = Some(binder);
            }
        }
        // The body runs unconditionally, but keeping the context managers is
        // required whenever any body statement is kept.
        self.process_suite(body, current, first_binder.as_ref().or(control))
    }
}

/// Wrap an expression as a program point at its own location.
fn expr_stmt(expr: &Expr) -> Stmt {
    Stmt {
        location: expr.location.clone(),
        kind: StmtKind::Expr {
            value: expr.clone(),
        },
    }
}

fn span(a: &Location, b: &Location) -> Location {
    let mut loc = Location::new(a.first_line, a.first_column, b.last_line, b.last_column);
    loc.path = a.path.clone();
    loc
}

fn handler_binder_span(alias_loc: &Location, exc_type: &Option<Expr>) -> Location {
    match exc_type {
        Some(t) => span(&t.location, alias_loc),
        None => alias_loc.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Cfg;
    use crate::python::parser::parse;

    fn cfg_of(text: &str) -> Cfg {
        let module = parse(text).unwrap();
        Cfg::from_module(&module)
    }

    #[test]
    fn test_linear_statements_share_a_block() {
        let cfg = cfg_of("a = 1\nb = a\nc = b\n");
        let entry = cfg.entry();
        assert_eq!(cfg.blocks()[entry.0].statements.len(), 3);
    }

    #[test]
    fn test_if_splits_blocks_and_rejoins() {
        let cfg = cfg_of("if x > 0:\n    y = 1\nelse:\n    y = 2\nz = y\n");
        // The test expression is a program point in the entry block.
        let entry_statements = &cfg.blocks()[cfg.entry().0].statements;
        assert_eq!(entry_statements.len(), 1);
        // Both branch exits feed the join.
        let join = cfg
            .blocks()
            .iter()
            .find(|b| b.statements.iter().any(|s| s.location.first_line == 5))
            .expect("join block holds the statement after the if");
        assert!(cfg.predecessors(join.id).len() >= 2);
    }

    #[test]
    fn test_loop_has_back_edge() {
        let cfg = cfg_of("for i in xs:\n    total = total + i\n");
        let head = cfg
            .blocks()
            .iter()
            .find(|b| b.label == "loop head")
            .unwrap();
        let body = cfg
            .blocks()
            .iter()
            .find(|b| b.label == "loop body")
            .unwrap();
        assert!(cfg.successors(body.id).contains(&head.id));
    }

    #[test]
    fn test_for_header_is_an_assignment() {
        let cfg = cfg_of("for i in xs:\n    pass\n");
        let header = cfg
            .statements()
            .find(|s| matches!(s.kind, StmtKind::Assign { .. }))
            .expect("synthesized loop header");
        assert_eq!(header.location.first_line, 1);
    }

    #[test]
    fn test_control_dependencies_cover_branch_bodies() {
        let cfg = cfg_of("if x > 0:\n    y = 1\n    z = 2\n");
        let mut dependents = Vec::new();
        cfg.visit_control_dependencies(|control, dependent| {
            assert_eq!(control.location.first_line, 1);
            dependents.push(dependent.location.first_line);
        });
        dependents.sort_unstable();
        assert_eq!(dependents, vec![2, 3]);
    }

    #[test]
    fn test_nested_compounds_chain_control() {
        let cfg = cfg_of("if a:\n    if b:\n        c = 1\n");
        let mut pairs = Vec::new();
        cfg.visit_control_dependencies(|control, dependent| {
            pairs.push((control.location.first_line, dependent.location.first_line));
        });
        pairs.sort_unstable();
        // Outer test governs the inner test; inner test governs the body.
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn test_return_marks_exit() {
        let cfg = cfg_of("def f():\n    pass\nx = 1\n");
        // Module-level CFG treats the def as a simple statement.
        assert_eq!(cfg.blocks()[cfg.entry().0].statements.len(), 2);

        let module = parse("return x\n");
        // Parsing a bare return at module level is fine for a function body.
        if let Ok(module) = module {
            let cfg = Cfg::from_statements(&module.code);
            assert!(!cfg.exits().is_empty());
        }
    }

    #[test]
    fn test_try_handler_binds_alias() {
        let cfg = cfg_of("try:\n    risky()\nexcept ValueError as e:\n    print(e)\n");
        let binder = cfg
            .statements()
            .find(|s| matches!(&s.kind, StmtKind::Assign { targets, .. }
                if targets.first().and_then(|t| t.as_name()) == Some("e")))
            .expect("handler binder");
        assert_eq!(binder.location.first_line, 3);
    }

    #[test]
    fn test_with_binds_alias_in_current_block() {
        let cfg = cfg_of("with open(p) as fh:\n    data = fh.read()\n");
        let entry_statements = &cfg.blocks()[cfg.entry().0].statements;
        assert_eq!(entry_statements.len(), 2);
        assert!(matches!(
            entry_statements[0].kind,
            StmtKind::Assign { .. }
        ));
    }

    #[test]
    fn test_break_edges_to_after_loop() {
        let cfg = cfg_of("while cond:\n    if done:\n        break\n    step()\nrest = 1\n");
        let after = cfg
            .blocks()
            .iter()
            .find(|b| b.statements.iter().any(|s| s.location.first_line == 5))
            .expect("after-loop block");
        // Break block links directly to the block after the loop.
        let break_block = cfg
            .blocks()
            .iter()
            .find(|b| b.statements.iter().any(|s| matches!(s.kind, StmtKind::Break)))
            .unwrap();
        assert!(cfg.successors(break_block.id).contains(&after.id));
    }
}
