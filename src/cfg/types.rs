//! CFG type definitions.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::cfg::builder;
use crate::python::ast::{Module, Stmt};

/// Unique identifier for a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockId(pub usize);

/// A basic block: an ordered run of program points.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    /// Unique block identifier.
    pub id: BlockId,
    /// Human-readable label.
    pub label: String,
    /// Program points in this block, in execution order.
    pub statements: Vec<Stmt>,
}

impl Block {
    /// First source line covered by this block, if any.
    pub fn start_line(&self) -> Option<usize> {
        self.statements.iter().map(|s| s.location.first_line).min()
    }

    /// Last source line covered by this block, if any.
    pub fn end_line(&self) -> Option<usize> {
        self.statements.iter().map(|s| s.location.last_line).max()
    }
}

/// Control-flow graph over a module or function body.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub(crate) blocks: Vec<Block>,
    pub(crate) edges: Vec<(BlockId, BlockId)>,
    pub(crate) entry: BlockId,
    pub(crate) exits: Vec<BlockId>,
    pub(crate) control_deps: Vec<(Stmt, Stmt)>,
    successors: FxHashMap<BlockId, Vec<BlockId>>,
    predecessors: FxHashMap<BlockId, Vec<BlockId>>,
}

impl Cfg {
    /// Build a CFG for a whole module.
    pub fn from_module(module: &Module) -> Self {
        Self::from_statements(&module.code)
    }

    /// Build a CFG for a statement list (e.g. a function body).
    pub fn from_statements(statements: &[Stmt]) -> Self {
        builder::CfgBuilder::build(statements)
    }

    pub(crate) fn from_parts(
        blocks: Vec<Block>,
        edges: Vec<(BlockId, BlockId)>,
        entry: BlockId,
        exits: Vec<BlockId>,
        control_deps: Vec<(Stmt, Stmt)>,
    ) -> Self {
        let mut successors: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();
        let mut predecessors: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();
        for (from, to) in &edges {
            successors.entry(*from).or_default().push(*to);
            predecessors.entry(*to).or_default().push(*from);
        }
        Self {
            blocks,
            edges,
            entry,
            exits,
            control_deps,
            successors,
            predecessors,
        }
    }

    /// All blocks, in creation (roughly program) order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The entry block.
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// Blocks where control leaves the graph.
    pub fn exits(&self) -> &[BlockId] {
        &self.exits
    }

    /// Successor blocks of a block.
    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        self.successors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Predecessor blocks of a block.
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.predecessors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit `(control statement, dependent statement)` pairs: every program
    /// point directly governed by a synthesized control header.
    pub fn visit_control_dependencies(&self, mut cb: impl FnMut(&Stmt, &Stmt)) {
        for (control, dependent) in &self.control_deps {
            cb(control, dependent);
        }
    }

    /// All program points of the graph.
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.blocks.iter().flat_map(|b| b.statements.iter())
    }
}
