use std::collections::HashMap;

use iceos_core::NodeId;
use iceos_error::IceError;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::Blueprint;

/// Adjacency and reverse-adjacency over a blueprint's top-level nodes. Nested
/// bodies (`condition.true_path`, `loop.body`, `parallel.branches`, ...) are
/// separate sub-blueprints run by recursing into the scheduler, not part of
/// this graph — matching "Nested workflows, loops, and recursion recurse
/// through C4."
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    index_of: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph from a blueprint's top-level node list. Fails if a
    /// `dependencies` entry references an unknown node id.
    pub fn from_blueprint(blueprint: &Blueprint) -> Result<Self, IceError> {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();

        for node in &blueprint.nodes {
            let idx = graph.add_node(node.id.clone());
            index_of.insert(node.id.clone(), idx);
        }

        for node in &blueprint.nodes {
            let to_idx = index_of[&node.id];
            for dep in &node.dependencies {
                let Some(&from_idx) = index_of.get(dep) else {
                    return Err(IceError::validation(format!(
                        "node '{}' depends on unknown node '{dep}'",
                        node.id
                    )));
                };
                graph.add_edge(from_idx, to_idx, ());
            }
        }

        Ok(Self { graph, index_of })
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Returns every node id with no incoming edges.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Incoming).next().is_none())
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Returns every node id with no outgoing edges.
    #[must_use]
    pub fn exit_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).next().is_none())
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    #[must_use]
    pub fn predecessors(&self, id: &NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.index_of.get(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| self.graph[edge.source()].clone())
            .collect()
    }

    #[must_use]
    pub fn successors(&self, id: &NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.index_of.get(id) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| self.graph[edge.target()].clone())
            .collect()
    }

    /// Computes topological levels via repeated Kahn peeling: level `k`
    /// contains every node whose dependencies are all in levels `< k`.
    pub fn levels(&self) -> Result<Vec<Vec<NodeId>>, IceError> {
        if self.is_cyclic() {
            return Err(IceError::CircularDependency { node_id: self.first_cycle_node() });
        }

        let mut remaining_incoming: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.edges_directed(idx, Direction::Incoming).count()))
            .collect();

        let mut levels = Vec::new();
        let mut placed = 0usize;

        while placed < self.graph.node_count() {
            let ready: Vec<NodeIndex> =
                remaining_incoming.iter().filter(|&(_, &count)| count == 0).map(|(&idx, _)| idx).collect();

            if ready.is_empty() {
                return Err(IceError::internal("topological level computation stalled"));
            }

            for &idx in &ready {
                remaining_incoming.remove(&idx);
                for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                    if let Some(count) = remaining_incoming.get_mut(&edge.target()) {
                        *count -= 1;
                    }
                }
            }

            placed += ready.len();
            let mut level: Vec<NodeId> = ready.into_iter().map(|idx| self.graph[idx].clone()).collect();
            level.sort();
            levels.push(level);
        }

        Ok(levels)
    }

    fn first_cycle_node(&self) -> String {
        self.graph.node_indices().next().map(|idx| self.graph[idx].to_string()).unwrap_or_default()
    }
}
