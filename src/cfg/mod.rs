//! Control-flow graph construction.
//!
//! The graph decomposes compound statements into statement-granular program
//! points: tests, loop headers, with-items and except clauses are
//! synthesized into simple statements whose locations lie inside the
//! compound header. The dataflow analyzer walks blocks of these program
//! points; the slicer enumerates them as candidate seed statements.

pub mod builder;
pub mod types;

pub use types::{Block, BlockId, Cfg};
