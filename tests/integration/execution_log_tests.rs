//! End-to-end scenarios over the execution log.

use nbflow::{Cell, ExecutionLogSlicer};

fn cell(event_id: &str, persistent_id: &str, count: u32, text: &str) -> Cell {
    Cell {
        text: text.to_string(),
        execution_count: Some(count),
        execution_event_id: event_id.to_string(),
        persistent_id: persistent_id.to_string(),
        has_error: false,
    }
}

/// The clustering notebook of the slicing tests, split into five cells.
fn log_clustering_notebook(slicer: &mut ExecutionLogSlicer) {
    slicer.log_execution(cell(
        "e1",
        "imports",
        1,
        "from matplotlib.pyplot import scatter\nfrom sklearn.cluster import KMeans\nfrom sklearn import datasets\n",
    ));
    slicer.log_execution(cell(
        "e2",
        "data",
        2,
        "data = datasets.load_iris().data[:,2:4]\npetal_length, petal_width = data[:,0], data[:,1]\n",
    ));
    slicer.log_execution(cell(
        "e3",
        "explore",
        3,
        "print(\"Average petal length: %.3f\" % (sum(petal_length)/len(petal_length),))\n",
    ));
    slicer.log_execution(cell("e4", "peek", 4, "print(data.shape)\n"));
    slicer.log_execution(cell(
        "e5",
        "plot",
        5,
        "clusters = KMeans(n_clusters=5).fit(data).labels_\nscatter(petal_length, petal_width, c=clusters)\n",
    ));
}

#[test]
fn test_slice_latest_keeps_computation_cells_only() {
    let mut slicer = ExecutionLogSlicer::new();
    log_clustering_notebook(&mut slicer);

    let sliced = slicer.slice_latest_execution("plot", None).unwrap();
    let mut counts: Vec<u32> = sliced
        .cell_slices
        .iter()
        .filter_map(|cs| cs.cell.execution_count)
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 5]);
}

#[test]
fn test_slice_locations_are_cell_relative() {
    let mut slicer = ExecutionLogSlicer::new();
    log_clustering_notebook(&mut slicer);

    let sliced = slicer.slice_latest_execution("plot", None).unwrap();
    for cell_slice in &sliced.cell_slices {
        let line_count = cell_slice.cell.text.lines().count();
        for loc in cell_slice.slice.items() {
            assert!(loc.first_line >= 1);
            assert!(
                loc.first_line <= line_count,
                "location {loc:?} outside cell of {line_count} lines"
            );
        }
    }
}

#[test]
fn test_slice_all_executions_returns_one_per_run() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("e1", "p1", 1, "x = 1\n"));
    slicer.log_execution(cell("e2", "p1", 2, "x = 2\n"));
    slicer.log_execution(cell("e3", "p1", 3, "x = 3\n"));
    assert_eq!(slicer.slice_all_executions("p1", None).len(), 3);
}

#[test]
fn test_dependent_cells_transitive_chain() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("c0", "p0", 1, "x = 3\n"));
    slicer.log_execution(cell("c1", "p1", 2, "y = x + 1\n"));
    slicer.log_execution(cell("c2", "p2", 3, "z = y - 1\n"));

    let dependents = slicer.get_dependent_cells("c0");
    let ids: Vec<&str> = dependents
        .iter()
        .map(|c| c.execution_event_id.as_str())
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[test]
fn test_dependent_cells_after_reexecution() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("c0a", "p0", 1, "x = 2\n"));
    slicer.log_execution(cell("c1", "p1", 2, "y = x + 1\n"));
    slicer.log_execution(cell("c2", "p2", 3, "q = 2\n"));
    slicer.log_execution(cell("c0b", "p0", 4, "x = 20\n"));

    let dependents = slicer.get_dependent_cells("c0b");
    let ids: Vec<&str> = dependents
        .iter()
        .map(|c| c.execution_event_id.as_str())
        .collect();
    assert_eq!(ids, vec!["c1"]);
}

#[test]
fn test_error_cell_is_skipped_in_history() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("e1", "p1", 1, "a = 1\n"));
    slicer.log_execution(cell("e2", "p2", 2, "this is not python(\n"));
    slicer.log_execution(cell("e3", "p3", 3, "b = a + 1\n"));

    let sliced = slicer.slice_latest_execution("p3", None).unwrap();
    let ids: Vec<&str> = sliced
        .cell_slices
        .iter()
        .map(|cs| cs.cell.execution_event_id.as_str())
        .collect();
    assert_eq!(ids, vec!["e1", "e3"]);
}

#[test]
fn test_stale_counts_are_skipped_in_build() {
    let mut slicer = ExecutionLogSlicer::new();
    // The first run of p1 was superseded: its count is not below the
    // second run's predecessor bound.
    slicer.log_execution(cell("e1", "p1", 4, "a = 'stale'\n"));
    slicer.log_execution(cell("e2", "p2", 2, "a = 1\n"));
    slicer.log_execution(cell("e3", "p3", 3, "b = a\n"));

    let sliced = slicer.slice_latest_execution("p3", None).unwrap();
    let ids: Vec<&str> = sliced
        .cell_slices
        .iter()
        .map(|cs| cs.cell.execution_event_id.as_str())
        .collect();
    assert_eq!(ids, vec!["e2", "e3"]);
}

#[test]
fn test_magic_lines_do_not_break_slicing() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("e1", "p1", 1, "%matplotlib inline\nx = 1\n"));
    slicer.log_execution(cell("e2", "p2", 2, "y = x + 1\n"));

    let sliced = slicer.slice_latest_execution("p2", None).unwrap();
    let ids: Vec<&str> = sliced
        .cell_slices
        .iter()
        .map(|cs| cs.cell.execution_event_id.as_str())
        .collect();
    assert_eq!(ids, vec!["e1", "e2"]);
}

#[test]
fn test_merge_two_executions_of_a_notebook() {
    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("e1", "p1", 1, "a = 1\n"));
    slicer.log_execution(cell("e2", "p2", 2, "b = a\n"));
    slicer.log_execution(cell("e3", "p3", 3, "c = a\n"));

    let for_b = slicer.slice_latest_execution("p2", None).unwrap();
    let for_c = slicer.slice_latest_execution("p3", None).unwrap();
    let merged = for_b.merge(&[&for_c]);

    let ids: Vec<&str> = merged
        .cell_slices
        .iter()
        .map(|cs| cs.cell.execution_event_id.as_str())
        .collect();
    // Sorted by execution count, union of both slices.
    assert_eq!(ids, vec!["e1", "e2", "e3"]);
}

#[test]
fn test_explicit_seed_narrows_the_slice() {
    use nbflow::{Location, LocationSet};

    let mut slicer = ExecutionLogSlicer::new();
    slicer.log_execution(cell("e1", "p1", 1, "a = 1\nb = 2\n"));
    slicer.log_execution(cell("e2", "p2", 2, "x = a\ny = b\n"));

    // Seed only the first line of the target cell.
    let seeds = LocationSet::from_items([Location::new(1, 0, 1, 100)]);
    let sliced = slicer.slice_latest_execution("p2", Some(&seeds)).unwrap();

    let e1 = sliced
        .cell_slices
        .iter()
        .find(|cs| cs.cell.execution_event_id == "e1")
        .expect("a's cell in slice");
    // Only `a = 1` from the first cell is needed.
    assert!(e1.slice.some(|loc| loc.first_line == 1));
    assert!(!e1.slice.some(|loc| loc.first_line == 2));

    let e2 = sliced
        .cell_slices
        .iter()
        .find(|cs| cs.cell.execution_event_id == "e2")
        .expect("target cell in slice");
    assert!(!e2.slice.some(|loc| loc.first_line == 2));
}
