//! nbflow — dataflow analysis and program slicing for logs of executed
//! notebook cells.
//!
//! Given the history of code fragments a user has run, the engine answers
//! two questions at source-location granularity:
//!
//! - **Backward slice**: which fragments (and which of their lines) must be
//!   kept to preserve the computation at a chosen result?
//! - **Forward slice**: which later fragments transitively depend on the
//!   values a fragment defines?
//!
//! The pipeline: each logged cell is rewritten ([`python::magics`]), parsed
//! into a typed AST ([`python::parser`]), and tagged with its execution
//! event id. For a query, the [`cells::ProgramBuilder`] assembles the
//! relevant cells into a virtual program with program-wide line numbers, a
//! CFG is built over it ([`cfg`]), the [`dataflow::DataflowAnalyzer`] runs
//! a gen/kill fixed point producing dataflow edges, and the [`slice`]
//! module closes the seed locations under those edges. Library behavior
//! (which calls mutate arguments, what they return) comes from JSON specs
//! ([`specs`]), so a `df.pop(...)` counts as an update of `df` while
//! `df.count()` does not.
//!
//! # Example
//!
//! ```
//! use nbflow::cells::{Cell, ExecutionLogSlicer};
//!
//! let mut slicer = ExecutionLogSlicer::new();
//! for (event, persistent, count, text) in [
//!     ("e1", "p1", 1, "a = 1\n"),
//!     ("e2", "p2", 2, "b = a + 1\n"),
//!     ("e3", "p3", 3, "print('unrelated')\n"),
//!     ("e4", "p4", 4, "c = b * 2\n"),
//! ] {
//!     slicer.log_execution(Cell {
//!         text: text.to_string(),
//!         execution_count: Some(count),
//!         execution_event_id: event.to_string(),
//!         persistent_id: persistent.to_string(),
//!         has_error: false,
//!     });
//! }
//!
//! let sliced = slicer.slice_latest_execution("p4", None).unwrap();
//! let kept: Vec<&str> = sliced
//!     .cell_slices
//!     .iter()
//!     .map(|cs| cs.cell.execution_event_id.as_str())
//!     .collect();
//! assert_eq!(kept, vec!["e1", "e2", "e4"]);
//! ```

pub mod cells;
pub mod cfg;
pub mod dataflow;
pub mod defuse;
pub mod error;
pub mod graph;
pub mod python;
pub mod refs;
pub mod set;
pub mod slice;
pub mod specs;

pub use cells::{Cell, CellExecution, CellSlice, ExecutionLogSlicer, Program, ProgramBuilder, SlicedExecution};
pub use dataflow::{AnalysisResult, Dataflow, DataflowAnalyzer, DataflowSet};
pub use defuse::DefUse;
pub use error::{NbflowError, Result};
pub use python::ast::{Location, LocationSet};
pub use refs::{Ref, RefKind, RefLevel, RefSet};
pub use slice::{slice, slice_backward, SliceDirection};
pub use specs::{default_specs, SpecBundle, SymbolTable};
