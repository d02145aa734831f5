//! The execution-log slicer: the public entry point of the engine.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::SystemTime;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cells::{Cell, CellProgram, CellSlice, ProgramBuilder, SlicedExecution};
use crate::cfg::Cfg;
use crate::dataflow::DataflowAnalyzer;
use crate::graph::DiGraph;
use crate::python::ast::{Location, LocationSet};
use crate::slice::{close_over_dataflows, SliceDirection};
use crate::specs::{default_specs, SpecBundle};

/// One entry of the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellExecution {
    pub cell: Cell,
    pub execution_time: SystemTime,
}

type Subscriber = Box<dyn FnMut(&CellExecution)>;

/// Records cell executions and answers slice queries over the history.
///
/// The log is append-only; `reset` replaces it wholesale. Subscribers run
/// synchronously in registration order; a panicking subscriber is isolated
/// so it cannot corrupt the log.
pub struct ExecutionLogSlicer {
    specs: SpecBundle,
    execution_log: Vec<CellExecution>,
    program_builder: ProgramBuilder,
    subscribers: Vec<Subscriber>,
}

impl Default for ExecutionLogSlicer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionLogSlicer {
    /// Slicer over the default spec bundle.
    pub fn new() -> Self {
        Self::with_specs(default_specs().clone())
    }

    /// Slicer over a caller-provided spec bundle.
    pub fn with_specs(specs: SpecBundle) -> Self {
        Self {
            program_builder: ProgramBuilder::with_specs(specs.clone()),
            specs,
            execution_log: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Record an execution happening now.
    pub fn log_execution(&mut self, cell: Cell) {
        self.add_execution_to_log(CellExecution {
            cell,
            execution_time: SystemTime::now(),
        });
    }

    /// Record a historical execution without re-stamping its time.
    pub fn add_execution_to_log(&mut self, execution: CellExecution) {
        self.program_builder.add(execution.cell.clone());
        self.execution_log.push(execution);
        let execution = self.execution_log.last().expect("just pushed");
        for subscriber in &mut self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| subscriber(execution))).is_err() {
                warn!("execution subscriber panicked; continuing");
            }
        }
    }

    /// Subscribe to future executions.
    pub fn on_execution(&mut self, subscriber: impl FnMut(&CellExecution) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// The recorded executions, in order.
    pub fn execution_log(&self) -> &[CellExecution] {
        &self.execution_log
    }

    /// The most recent cell program for an execution event id.
    pub fn cell_program(&self, execution_event_id: &str) -> Option<&CellProgram> {
        self.program_builder.get_cell_program(execution_event_id)
    }

    /// Clear the log and the program builder.
    pub fn reset(&mut self) {
        self.execution_log.clear();
        self.program_builder = ProgramBuilder::with_specs(self.specs.clone());
    }

    /// Slice every logged execution of a cell.
    ///
    /// Without seed locations the whole target cell is the seed. Each
    /// returned [`SlicedExecution`] carries per-cell slices in cell-relative
    /// coordinates, grouped in first-occurrence order.
    pub fn slice_all_executions(
        &self,
        persistent_id: &str,
        seeds: Option<&LocationSet>,
    ) -> Vec<SlicedExecution> {
        let mut out = Vec::new();
        for execution in &self.execution_log {
            if execution.cell.persistent_id != persistent_id
                || execution.cell.execution_count.is_none()
            {
                continue;
            }
            let event_id = &execution.cell.execution_event_id;
            let Some(program) = self.program_builder.build_to(event_id) else {
                continue;
            };
            let Some(first_line) = program.cell_start_line(event_id) else {
                continue;
            };
            let last_line = program.cell_end_line(event_id).unwrap_or(first_line);

            let absolute_seeds: LocationSet = match seeds {
                Some(seeds) => seeds.map(|loc| {
                    let mut shifted = loc.clone();
                    shifted.shift_lines(first_line as isize - 1);
                    shifted
                }),
                None => LocationSet::from_items([Location::new(first_line, 0, last_line, 10_000)]),
            };

            let mut analyzer = DataflowAnalyzer::with_specs(self.specs.clone());
            let sliced = crate::slice::slice(
                &program.tree,
                &absolute_seeds,
                &mut analyzer,
                SliceDirection::Backward,
            );

            let mut locations = sliced.to_vec();
            locations.sort_by_key(|loc| (loc.first_line, loc.first_column));

            let mut order: Vec<String> = Vec::new();
            let mut grouped: rustc_hash::FxHashMap<String, CellSlice> =
                rustc_hash::FxHashMap::default();
            for location in locations {
                let Some(cell) = program.line_to_cell_map.get(&location.first_line) else {
                    continue;
                };
                let Some(cell_first) = program.cell_start_line(&cell.execution_event_id) else {
                    continue;
                };
                let mut relative = location.clone();
                relative.shift_lines(-(cell_first as isize - 1));

                let key = cell.execution_event_id.clone();
                match grouped.get_mut(&key) {
                    Some(slice) => slice.slice.add(relative),
                    None => {
                        grouped.insert(
                            key.clone(),
                            CellSlice {
                                cell: cell.clone(),
                                slice: LocationSet::from_items([relative]),
                            },
                        );
                        order.push(key);
                    }
                }
            }

            out.push(SlicedExecution {
                execution_time: execution.execution_time,
                cell_slices: order
                    .into_iter()
                    .map(|key| grouped.remove(&key).expect("key recorded"))
                    .collect(),
            });
        }
        out
    }

    /// Slice the most recent execution of a cell.
    pub fn slice_latest_execution(
        &self,
        persistent_id: &str,
        seeds: Option<&LocationSet>,
    ) -> Option<SlicedExecution> {
        self.slice_all_executions(persistent_id, seeds).pop()
    }

    /// The cells that transitively depend on values defined by the given
    /// execution, in topological order of the dataflow between them.
    ///
    /// Every logged execution sharing the target's persistent id seeds the
    /// forward slice; the target's own cell is dropped from the result and
    /// cells are de-duplicated by persistent id.
    pub fn get_dependent_cells(&self, execution_event_id: &str) -> Vec<Cell> {
        let Some(target) = self.program_builder.get_cell_program(execution_event_id) else {
            return Vec::new();
        };
        let target_persistent_id = target.cell.persistent_id.clone();
        let Some(program) = self.program_builder.build_from(execution_event_id) else {
            return Vec::new();
        };

        let mut seeds = LocationSet::new();
        for cell in &program.cells {
            if cell.persistent_id != target_persistent_id {
                continue;
            }
            let Some(first) = program.cell_start_line(&cell.execution_event_id) else {
                continue;
            };
            let last = program
                .cell_end_line(&cell.execution_event_id)
                .unwrap_or(first);
            seeds.add(Location::new(first, 0, last, 10_000));
        }

        let cfg = Cfg::from_module(&program.tree);
        let mut analyzer = DataflowAnalyzer::with_specs(self.specs.clone());
        let analysis = analyzer.analyze(&cfg, None);
        let sliced = close_over_dataflows(&cfg, &analysis.dataflows, &seeds, SliceDirection::Forward);

        let mut in_slice: FxHashSet<String> = FxHashSet::default();
        for location in sliced.items() {
            if let Some(cell) = program.line_to_cell_map.get(&location.first_line) {
                in_slice.insert(cell.execution_event_id.clone());
            }
        }

        // Order cells by the dataflow between them.
        let mut graph: DiGraph<Cell> = DiGraph::new(cell_identity);
        for cell in &program.cells {
            graph.add_node(cell.clone());
        }
        for flow in analysis.dataflows.items() {
            let from = program.line_to_cell_map.get(&flow.from_node.first_line);
            let to = program.line_to_cell_map.get(&flow.to_node.first_line);
            if let (Some(from), Some(to)) = (from, to) {
                if from.execution_event_id != to.execution_event_id {
                    graph.add_edge(from.clone(), to.clone());
                }
            }
        }

        let mut seen_persistent: FxHashSet<String> = FxHashSet::default();
        let mut dependents = Vec::new();
        for cell in graph.topo_sort() {
            if !in_slice.contains(&cell.execution_event_id) {
                continue;
            }
            if cell.persistent_id == target_persistent_id {
                continue;
            }
            if seen_persistent.insert(cell.persistent_id.clone()) {
                dependents.push(cell);
            }
        }
        dependents
    }
}

fn cell_identity(cell: &Cell) -> String {
    cell.execution_event_id.clone()
}
