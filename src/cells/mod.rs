//! Cells, cell programs, and assembled virtual programs.
//!
//! A [`Cell`] is one user-submitted code fragment; re-executions share a
//! `persistent_id` but get fresh `execution_event_id`s. The program builder
//! parses each logged cell once into a [`CellProgram`] and can assemble a
//! [`Program`] — a virtual module whose line numbers are contiguous and
//! disjoint per cell, with line maps in both directions.

pub mod builder;
pub mod log;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::python::ast::{Location, LocationSet, Module, Stmt};
use crate::refs::Ref;
use crate::set::NumberSet;

pub use builder::ProgramBuilder;
pub use log::{CellExecution, ExecutionLogSlicer};

/// A code fragment executed as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    /// Monotonic per-cell counter; `None` for cells that never ran.
    pub execution_count: Option<u32>,
    /// Unique per execution.
    pub execution_event_id: String,
    /// Stable across re-executions of the same cell.
    pub persistent_id: String,
    pub has_error: bool,
}

impl Cell {
    /// A deep copy of this cell.
    pub fn deep_copy(&self) -> Cell {
        self.clone()
    }

    /// Number of lines this cell occupies in an assembled program.
    pub(crate) fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }
}

/// Parsed form of a single cell. Created once when the cell is logged and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CellProgram {
    pub cell: Cell,
    pub statements: Vec<Stmt>,
    pub defs: Vec<Ref>,
    pub uses: Vec<Ref>,
    /// Parse or analysis failure, or an execution error reported by the
    /// kernel. Error cells contribute no statements.
    pub has_error: bool,
}

impl CellProgram {
    pub(crate) fn errored(cell: Cell) -> Self {
        Self {
            cell,
            statements: Vec::new(),
            defs: Vec::new(),
            uses: Vec::new(),
            has_error: true,
        }
    }
}

/// A virtual program assembled from an ordered list of cell programs.
#[derive(Debug, Clone)]
pub struct Program {
    /// Concatenated statements with lines shifted to program coordinates.
    pub tree: Module,
    /// The cells of the program, in order.
    pub cells: Vec<Cell>,
    /// Cell execution event id → the program lines it owns.
    pub cell_to_line_map: FxHashMap<String, NumberSet>,
    /// Program line → owning cell.
    pub line_to_cell_map: FxHashMap<usize, Cell>,
}

impl Program {
    pub(crate) fn assemble(cell_programs: &[&CellProgram]) -> Self {
        let mut code: Vec<Stmt> = Vec::new();
        let mut cells = Vec::new();
        let mut cell_to_line_map: FxHashMap<String, NumberSet> = FxHashMap::default();
        let mut line_to_cell_map: FxHashMap<usize, Cell> = FxHashMap::default();

        let mut next_line = 1usize;
        for cell_program in cell_programs {
            let cell = &cell_program.cell;
            let line_count = cell.line_count();
            let offset = next_line as isize - 1;

            for stmt in &cell_program.statements {
                let mut shifted = stmt.clone();
                shifted.visit_locations_mut(&mut |loc| loc.shift_lines(offset));
                code.push(shifted);
            }

            let lines: NumberSet = (next_line..next_line + line_count).collect();
            for line in next_line..next_line + line_count {
                line_to_cell_map.insert(line, cell.clone());
            }
            cell_to_line_map.insert(cell.execution_event_id.clone(), lines);
            cells.push(cell.clone());
            next_line += line_count;
        }

        let location = Location::new(1, 0, next_line.saturating_sub(1).max(1), 0);
        Program {
            tree: Module { code, location },
            cells,
            cell_to_line_map,
            line_to_cell_map,
        }
    }

    /// First program line owned by a cell.
    pub fn cell_start_line(&self, execution_event_id: &str) -> Option<usize> {
        self.cell_to_line_map
            .get(execution_event_id)?
            .items()
            .min()
            .copied()
    }

    /// Last program line owned by a cell.
    pub fn cell_end_line(&self, execution_event_id: &str) -> Option<usize> {
        self.cell_to_line_map
            .get(execution_event_id)?
            .items()
            .max()
            .copied()
    }
}

/// The part of a slice that falls in one cell, in cell-relative coordinates.
#[derive(Debug, Clone)]
pub struct CellSlice {
    pub cell: Cell,
    pub slice: LocationSet,
}

/// The slice of one logged execution.
#[derive(Debug, Clone)]
pub struct SlicedExecution {
    pub execution_time: SystemTime,
    pub cell_slices: Vec<CellSlice>,
}

impl SlicedExecution {
    /// Union this slice with others, keyed by cell execution event id. The
    /// merged cell slices are sorted by execution count.
    pub fn merge(&self, others: &[&SlicedExecution]) -> SlicedExecution {
        let mut merged: FxHashMap<String, CellSlice> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();

        for slice_set in std::iter::once(self).chain(others.iter().copied()) {
            for cell_slice in &slice_set.cell_slices {
                let key = cell_slice.cell.execution_event_id.clone();
                match merged.get_mut(&key) {
                    Some(existing) => existing.slice.union_into(&cell_slice.slice),
                    None => {
                        merged.insert(key.clone(), cell_slice.clone());
                        order.push(key);
                    }
                }
            }
        }

        let mut cell_slices: Vec<CellSlice> =
            order.into_iter().map(|key| merged.remove(&key).expect("key recorded")).collect();
        cell_slices.sort_by_key(|cs| cs.cell.execution_count.unwrap_or(0));

        SlicedExecution {
            execution_time: self.execution_time,
            cell_slices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(event_id: &str, persistent_id: &str, count: u32, text: &str) -> Cell {
        Cell {
            text: text.to_string(),
            execution_count: Some(count),
            execution_event_id: event_id.to_string(),
            persistent_id: persistent_id.to_string(),
            has_error: false,
        }
    }

    fn slice_for(cell: Cell, line: usize) -> CellSlice {
        CellSlice {
            cell,
            slice: LocationSet::from_items([Location::new(line, 0, line, 10)]),
        }
    }

    #[test]
    fn test_deep_copy_is_equal() {
        let c = cell("e1", "p1", 1, "x = 1\n");
        let copy = c.deep_copy();
        assert_eq!(copy.execution_event_id, c.execution_event_id);
        assert_eq!(copy.text, c.text);
    }

    #[test]
    fn test_merge_unions_disjoint_cells() {
        let a = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e1", "p1", 2, "a = 1\n"), 1)],
        };
        let b = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e2", "p2", 1, "b = 2\n"), 1)],
        };
        let merged = a.merge(&[&b]);
        assert_eq!(merged.cell_slices.len(), 2);
        // Sorted by execution count.
        assert_eq!(merged.cell_slices[0].cell.execution_event_id, "e2");
        assert_eq!(merged.cell_slices[1].cell.execution_event_id, "e1");
    }

    #[test]
    fn test_merge_with_disjoint_slice_is_stable() {
        let a = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e1", "p1", 1, "a = 1\n"), 1)],
        };
        let merged = a.merge(&[]);
        assert_eq!(merged.cell_slices.len(), 1);
        assert_eq!(merged.cell_slices[0].slice.size(), 1);
    }

    #[test]
    fn test_merge_same_cell_unions_locations() {
        let a = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e1", "p1", 1, "a = 1\nb = 2\n"), 1)],
        };
        let b = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e1", "p1", 1, "a = 1\nb = 2\n"), 2)],
        };
        let merged = a.merge(&[&b]);
        assert_eq!(merged.cell_slices.len(), 1);
        assert_eq!(merged.cell_slices[0].slice.size(), 2);
    }

    #[test]
    fn test_merge_is_order_insensitive_on_contents() {
        let a = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e1", "p1", 1, "a\n"), 1)],
        };
        let b = SlicedExecution {
            execution_time: SystemTime::UNIX_EPOCH,
            cell_slices: vec![slice_for(cell("e2", "p2", 2, "b\n"), 1)],
        };
        let ab = a.merge(&[&b]);
        let ba = b.merge(&[&a]);
        let ids = |s: &SlicedExecution| {
            s.cell_slices
                .iter()
                .map(|cs| cs.cell.execution_event_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&ab), ids(&ba));
    }
}
