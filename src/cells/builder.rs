//! Assembling virtual programs from a history of cell executions.

use tracing::{debug, warn};

use crate::cells::{Cell, CellProgram, Program};
use crate::dataflow::DataflowAnalyzer;
use crate::python::magics;
use crate::python::parser;
use crate::refs::RefSet;
use crate::specs::{default_specs, SpecBundle};

/// Parses logged cells and assembles virtual programs for slicing.
///
/// Owns a [`DataflowAnalyzer`] whose symbol table accumulates imports and
/// function definitions as cells are added, and which extracts each cell's
/// defs and uses once, at add time.
pub struct ProgramBuilder {
    specs: SpecBundle,
    analyzer: DataflowAnalyzer,
    cell_programs: Vec<CellProgram>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// Builder over the default spec bundle.
    pub fn new() -> Self {
        Self::with_specs(default_specs().clone())
    }

    /// Builder over a caller-provided spec bundle.
    pub fn with_specs(specs: SpecBundle) -> Self {
        Self {
            analyzer: DataflowAnalyzer::with_specs(specs.clone()),
            specs,
            cell_programs: Vec::new(),
        }
    }

    /// Parse a cell and record its cell program.
    ///
    /// Interactive directives are rewritten first; every parsed location is
    /// tagged with the cell's execution event id. A cell that fails to
    /// parse, or that the kernel reported as failed, is stored as an error
    /// cell with no statements.
    pub fn add(&mut self, cell: Cell) {
        let cleaned = magics::rewrite(&cell.text);
        let module = match parser::parse(&cleaned) {
            Ok(module) => module,
            Err(error) => {
                warn!(
                    cell = %cell.execution_event_id,
                    %error,
                    "cell failed to parse; storing as error cell"
                );
                self.cell_programs.push(CellProgram::errored(cell));
                return;
            }
        };

        let mut module = module;
        let path = cell.execution_event_id.clone();
        module.visit_locations_mut(&mut |loc| loc.path = Some(path.clone()));

        let mut defs = Vec::new();
        let mut uses = Vec::new();
        for stmt in &module.code {
            let def_use = self.analyzer.def_use_for_statement(stmt, &RefSet::new());
            defs.extend(def_use.defs().to_vec());
            uses.extend(def_use.uses_all().to_vec());
        }

        debug!(
            cell = %cell.execution_event_id,
            statements = module.code.len(),
            defs = defs.len(),
            uses = uses.len(),
            "cell added"
        );
        let has_error = cell.has_error;
        self.cell_programs.push(CellProgram {
            cell,
            statements: module.code,
            defs,
            uses,
            has_error,
        });
    }

    /// The most recent cell program with the given execution event id.
    pub fn get_cell_program(&self, execution_event_id: &str) -> Option<&CellProgram> {
        self.cell_programs
            .iter()
            .rev()
            .find(|cp| cp.cell.execution_event_id == execution_event_id)
    }

    /// All recorded cell programs, in log order.
    pub fn cell_programs(&self) -> &[CellProgram] {
        &self.cell_programs
    }

    /// Assemble the program leading up to (and including) the given
    /// execution.
    ///
    /// Walking backward from the target, a prior cell is included iff its
    /// execution count is strictly below the last included count and it has
    /// no error; an equal or larger count marks a stale re-execution that a
    /// later run superseded. Returns `None` for an unknown event id.
    pub fn build_to(&self, execution_event_id: &str) -> Option<Program> {
        let index = self
            .cell_programs
            .iter()
            .rposition(|cp| cp.cell.execution_event_id == execution_event_id)?;
        let target = &self.cell_programs[index];

        let mut selected: Vec<&CellProgram> = vec![target];
        let mut last_count = target.cell.execution_count.unwrap_or(0);
        for cell_program in self.cell_programs[..index].iter().rev() {
            let count = cell_program.cell.execution_count.unwrap_or(0);
            if cell_program.has_error || count >= last_count {
                continue;
            }
            selected.push(cell_program);
            last_count = count;
        }
        selected.reverse();
        Some(Program::assemble(&selected))
    }

    /// Assemble the program from the first execution of the target's cell
    /// onward.
    pub fn build_from(&self, execution_event_id: &str) -> Option<Program> {
        let persistent_id = &self
            .get_cell_program(execution_event_id)?
            .cell
            .persistent_id;
        let index = self
            .cell_programs
            .iter()
            .position(|cp| cp.cell.persistent_id == *persistent_id)?;
        let selected: Vec<&CellProgram> = self.cell_programs[index..].iter().collect();
        Some(Program::assemble(&selected))
    }

    /// Drop all recorded cells and start from a fresh analyzer.
    pub fn reset(&mut self) {
        self.cell_programs.clear();
        self.analyzer = DataflowAnalyzer::with_specs(self.specs.clone());
    }
}
