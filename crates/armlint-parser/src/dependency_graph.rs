//! Reference graph between loaded documents

use std::collections::{BTreeSet, HashMap};

use armlint_core::SpecPath;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;

/// Directed graph with an edge `from -> to` whenever `from` holds a `$ref`
/// into `to`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<SpecPath, ()>,
    indices: HashMap<SpecPath, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, path: &SpecPath) -> NodeIndex {
        if let Some(&idx) = self.indices.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.indices.insert(path.clone(), idx);
        idx
    }

    /// Record that `from` references `to`. Self edges and duplicates are
    /// ignored; returns whether a new edge was added.
    pub fn add_reference(&mut self, from: &SpecPath, to: &SpecPath) -> bool {
        if from == to {
            return false;
        }
        let from_idx = self.add_document(from);
        let to_idx = self.add_document(to);
        if self.graph.contains_edge(from_idx, to_idx) {
            return false;
        }
        self.graph.add_edge(from_idx, to_idx, ());
        true
    }

    pub fn contains(&self, path: &SpecPath) -> bool {
        self.indices.contains_key(path)
    }

    /// Documents `path` points at directly.
    pub fn dependencies_of(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Documents that point at `path` directly.
    pub fn references_of(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(&self, path: &SpecPath, direction: Direction) -> BTreeSet<SpecPath> {
        match self.indices.get(path) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, direction)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Everything reachable from `path`, excluding `path` itself unless it
    /// sits on a cycle.
    pub fn transitive_dependencies(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        let mut result = BTreeSet::new();
        let Some(&start) = self.indices.get(path) else {
            return result;
        };

        for next in self.graph.neighbors(start) {
            let mut dfs = Dfs::new(&self.graph, next);
            while let Some(idx) = dfs.next(&self.graph) {
                result.insert(self.graph[idx].clone());
            }
        }
        result
    }

    /// Groups of documents that reference each other in a loop. Each group
    /// is sorted, and groups are ordered by their first member.
    pub fn detect_cycles(&self) -> Vec<Vec<SpecPath>> {
        let mut cycles: Vec<Vec<SpecPath>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<SpecPath> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn document_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> SpecPath {
        SpecPath::new(raw).unwrap()
    }

    #[test]
    fn test_edges_deduplicated() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_reference(&p("/a.json"), &p("/b.json")));
        assert!(!graph.add_reference(&p("/A.json"), &p("/b.json")));
        assert!(!graph.add_reference(&p("/a.json"), &p("/a.json")));
        assert_eq!(graph.reference_count(), 1);
        assert_eq!(graph.document_count(), 2);
    }

    #[test]
    fn test_forward_and_reverse_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_reference(&p("/a.json"), &p("/common.json"));
        graph.add_reference(&p("/b.json"), &p("/common.json"));
        graph.add_reference(&p("/common.json"), &p("/types.json"));

        let referrers: Vec<String> = graph
            .references_of(&p("/common.json"))
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(referrers, vec!["/a.json", "/b.json"]);
        assert_eq!(graph.dependencies_of(&p("/a.json")).len(), 1);

        let reachable = graph.transitive_dependencies(&p("/a.json"));
        assert!(reachable.contains(&p("/types.json")));
        assert!(!reachable.contains(&p("/a.json")));
    }

    #[test]
    fn test_detect_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_reference(&p("/a.json"), &p("/b.json"));
        graph.add_reference(&p("/b.json"), &p("/a.json"));
        graph.add_reference(&p("/b.json"), &p("/c.json"));

        let cycles = graph.detect_cycles();
        assert_eq!(cycles, vec![vec![p("/a.json"), p("/b.json")]]);
        assert!(graph
            .transitive_dependencies(&p("/a.json"))
            .contains(&p("/a.json")));
    }

    #[test]
    fn test_unknown_document_has_no_edges() {
        let graph = DependencyGraph::new();
        assert!(graph.references_of(&p("/x.json")).is_empty());
        assert!(graph.detect_cycles().is_empty());
    }
}
