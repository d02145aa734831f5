//! Program slicing: closing a set of seed locations under the dataflow
//! relation.

use serde::Serialize;

use crate::cfg::Cfg;
use crate::dataflow::{DataflowAnalyzer, DataflowSet};
use crate::python::ast::{LocationSet, Module};

/// Direction of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceDirection {
    /// What must be kept to preserve the seed's computation?
    Backward,
    /// What depends on the seed's values?
    Forward,
}

/// Slice a module at the given seed locations.
///
/// Builds the CFG, runs the analyzer, and closes the seed statements under
/// the dataflow relation. The result contains only statement locations.
pub fn slice(
    module: &Module,
    seeds: &LocationSet,
    analyzer: &mut DataflowAnalyzer,
    direction: SliceDirection,
) -> LocationSet {
    let cfg = Cfg::from_module(module);
    let result = analyzer.analyze(&cfg, None);
    close_over_dataflows(&cfg, &result.dataflows, seeds, direction)
}

/// Backward slice with a fresh default analyzer.
pub fn slice_backward(module: &Module, seeds: &LocationSet) -> LocationSet {
    slice(module, seeds, &mut DataflowAnalyzer::new(), SliceDirection::Backward)
}

/// The closure step, reusable when the caller already has the dataflow set.
pub(crate) fn close_over_dataflows(
    cfg: &Cfg,
    dataflows: &DataflowSet,
    seeds: &LocationSet,
    direction: SliceDirection,
) -> LocationSet {
    // Seed statements: program points whose location intersects a seed.
    // Locations outside them only enter through the closure rule.
    let seed_statements: LocationSet = cfg
        .statements()
        .filter(|stmt| seeds.some(|seed| stmt.location.intersects(seed)))
        .map(|stmt| stmt.location.clone())
        .collect();

    let mut accepted = seed_statements.clone();
    loop {
        let before = accepted.size();
        for flow in dataflows.items() {
            let (start, end) = match direction {
                SliceDirection::Backward => (&flow.from_node, &flow.to_node),
                SliceDirection::Forward => (&flow.to_node, &flow.from_node),
            };
            if seed_statements.some(|seed| seed.intersects(end)) {
                accepted.add(end.clone());
            }
            if accepted.some(|loc| loc.contains(end)) {
                accepted.add(start.clone());
            }
        }
        if accepted.size() == before {
            break;
        }
    }
    accepted
}
