//! Directed graph with topological sorting.
//!
//! Used by the execution-log slicer to order dependent cells consistently
//! with the dataflow between them. Nodes are keyed by a caller-supplied
//! identity, so the same value inserted twice is one node.

use rustc_hash::FxHashMap;

/// Directed graph keyed by an identity function.
pub struct DiGraph<T> {
    key_of: fn(&T) -> String,
    nodes: FxHashMap<String, T>,
    outgoing: FxHashMap<String, Vec<String>>,
    incoming_count: FxHashMap<String, usize>,
    insertion_order: Vec<String>,
}

impl<T: Clone> DiGraph<T> {
    /// Create an empty graph with the given identity function.
    pub fn new(key_of: fn(&T) -> String) -> Self {
        Self {
            key_of,
            nodes: FxHashMap::default(),
            outgoing: FxHashMap::default(),
            incoming_count: FxHashMap::default(),
            insertion_order: Vec::new(),
        }
    }

    /// Insert a node without edges.
    pub fn add_node(&mut self, node: T) {
        let key = (self.key_of)(&node);
        if !self.nodes.contains_key(&key) {
            self.insertion_order.push(key.clone());
            self.incoming_count.entry(key.clone()).or_insert(0);
            self.nodes.insert(key, node);
        }
    }

    /// Insert an edge, adding both endpoints implicitly.
    pub fn add_edge(&mut self, from: T, to: T) {
        let from_key = (self.key_of)(&from);
        let to_key = (self.key_of)(&to);
        self.add_node(from);
        self.add_node(to);
        let targets = self.outgoing.entry(from_key).or_default();
        if !targets.contains(&to_key) {
            targets.push(to_key.clone());
            *self.incoming_count.entry(to_key).or_insert(0) += 1;
        }
    }

    /// All known nodes, in insertion order.
    pub fn nodes(&self) -> Vec<T> {
        self.insertion_order
            .iter()
            .map(|k| self.nodes[k].clone())
            .collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topological sort using Kahn's algorithm over a working copy of the
    /// adjacency.
    ///
    /// When the graph is a DAG the returned order is consistent with every
    /// edge. When it is not, the cyclic remainder is appended in insertion
    /// order, so the result is always a total order over the nodes.
    pub fn topo_sort(&self) -> Vec<T> {
        let mut in_degree = self.incoming_count.clone();
        let mut ready: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|k| in_degree.get(*k).copied().unwrap_or(0) == 0)
            .cloned()
            .collect();
        let mut sorted: Vec<String> = Vec::with_capacity(self.nodes.len());

        while let Some(key) = ready.pop() {
            sorted.push(key.clone());
            if let Some(targets) = self.outgoing.get(&key) {
                for target in targets {
                    let degree = in_degree.get_mut(target).expect("edge target is a node");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(target.clone());
                    }
                }
            }
        }

        // Cycle remainder: anything not emitted keeps insertion order.
        if sorted.len() < self.nodes.len() {
            for key in &self.insertion_order {
                if !sorted.contains(key) {
                    sorted.push(key.clone());
                }
            }
        }

        sorted.into_iter().map(|k| self.nodes[&k].clone()).collect()
    }
}
