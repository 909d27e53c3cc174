//! Type-level relationship graph powered by petgraph.
//!
//! Loads one [`ProjectGraph`] into an in-memory `DiGraph` whose nodes are
//! types and whose edges are resolved dependencies and supertype links, and
//! answers reachability questions over it.
//!
//! ```text
//! ProjectGraph (records) -> TypeGraph (in-memory) -> impact / dependencies
//! ```
//!
//! Every traversal accepts an optional edge-kind filter, so callers can ask
//! "who inherits from X" separately from "who imports X".

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::extractor::resolve_type_reference;
use crate::types::{DependencyVia, ProjectGraph};

/// Label on a [`TypeGraph`] edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DependsOn(DependencyVia),
    Extends,
    Implements,
}

impl EdgeKind {
    /// Coarse kind name, ignoring the dependency channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::DependsOn(_) => "depends_on",
            EdgeKind::Extends => "extends",
            EdgeKind::Implements => "implements",
        }
    }

    pub fn is_supertype(&self) -> bool {
        matches!(self, EdgeKind::Extends | EdgeKind::Implements)
    }
}

/// How many extends/implements references found an internal target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStats {
    pub resolved: usize,
    pub unresolved: usize,
}

/// Directed graph of types. An edge `a -> b` means `a` uses or inherits `b`.
pub struct TypeGraph {
    graph: DiGraph<String, EdgeKind>,
    node_map: HashMap<String, NodeIndex>,
    relations: RelationStats,
}

impl TypeGraph {
    /// Build the graph from a snapshot, resolving supertype references
    /// against the snapshot's own types.
    pub fn from_project(project: &ProjectGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::with_capacity(project.types.len());

        for fqn in project.types.keys() {
            let idx = graph.add_node(fqn.clone());
            node_map.insert(fqn.clone(), idx);
        }

        let mut type_graph = TypeGraph {
            graph,
            node_map,
            relations: RelationStats::default(),
        };

        for edge in &project.dependencies {
            type_graph.add_edge(&edge.from_fqn, &edge.to_fqn, EdgeKind::DependsOn(edge.via));
        }

        let supertypes = project
            .extends
            .iter()
            .map(|r| (r, EdgeKind::Extends))
            .chain(project.implements.iter().map(|r| (r, EdgeKind::Implements)));
        for ((child, reference), kind) in supertypes {
            match resolve_type_reference(&project.types, reference).fqn() {
                Some(parent) => {
                    type_graph.relations.resolved += 1;
                    type_graph.add_edge(child, parent, kind);
                }
                None => {
                    type_graph.relations.unresolved += 1;
                    debug!("Unresolved {} reference {} from {}", kind.as_str(), reference, child);
                }
            }
        }

        type_graph
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) {
        // skip if source/target doesn't exist
        if let (Some(&s), Some(&d)) = (self.node_map.get(from), self.node_map.get(to)) {
            if s != d && !self.graph.edges_connecting(s, d).any(|e| *e.weight() == kind) {
                self.graph.add_edge(s, d, kind);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_type(&self, fqn: &str) -> bool {
        self.node_map.contains_key(fqn)
    }

    pub fn relation_stats(&self) -> RelationStats {
        self.relations
    }

    /// Everything `fqn` transitively uses or inherits.
    pub fn dependencies(&self, fqn: &str, kinds: Option<&[EdgeKind]>) -> Vec<String> {
        self.traverse_bfs(&[fqn], Direction::Outgoing, kinds)
    }

    /// Everything that transitively uses or inherits `fqn`: what may break
    /// if `fqn` changes.
    pub fn dependents(&self, fqn: &str, kinds: Option<&[EdgeKind]>) -> Vec<String> {
        self.traverse_bfs(&[fqn], Direction::Incoming, kinds)
    }

    /// Union of [`dependents`](Self::dependents) over several seeds, without
    /// the seeds themselves.
    pub fn impact<S: AsRef<str>>(&self, seeds: &[S], kinds: Option<&[EdgeKind]>) -> Vec<String> {
        let seeds: Vec<&str> = seeds.iter().map(|s| s.as_ref()).collect();
        self.traverse_bfs(&seeds, Direction::Incoming, kinds)
    }

    /// Transitive supertypes through extends and implements edges.
    pub fn supertypes(&self, fqn: &str) -> Vec<String> {
        self.traverse_bfs(
            &[fqn],
            Direction::Outgoing,
            Some(&[EdgeKind::Extends, EdgeKind::Implements]),
        )
    }

    /// Direct neighbors along one direction.
    pub fn neighbors(&self, fqn: &str, direction: Direction, kinds: Option<&[EdgeKind]>) -> Vec<String> {
        let Some(&start) = self.node_map.get(fqn) else {
            return vec![];
        };
        let found: BTreeSet<String> = self
            .graph
            .edges_directed(start, direction)
            .filter(|e| edge_allowed(e.weight(), kinds))
            .map(|e| {
                let other = if direction == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                self.graph[other].clone()
            })
            .collect();
        found.into_iter().collect()
    }

    /// BFS from every seed; returns reached types in fqn order.
    fn traverse_bfs(
        &self,
        seeds: &[&str],
        direction: Direction,
        kinds: Option<&[EdgeKind]>,
    ) -> Vec<String> {
        let starts: Vec<NodeIndex> = seeds
            .iter()
            .filter_map(|s| self.node_map.get(*s).copied())
            .collect();

        let mut visited: HashSet<NodeIndex> = starts.iter().copied().collect();
        let mut queue: VecDeque<NodeIndex> = starts.iter().copied().collect();
        let mut result = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            for edge in self.graph.edges_directed(current, direction) {
                if !edge_allowed(edge.weight(), kinds) {
                    continue;
                }

                let neighbor = if direction == Direction::Outgoing {
                    edge.target()
                } else {
                    edge.source()
                };

                if visited.insert(neighbor) {
                    result.insert(self.graph[neighbor].clone());
                    queue.push_back(neighbor);
                }
            }
        }

        result.into_iter().collect()
    }
}

/// `DependsOn` filter entries match on the dependency channel too.
fn edge_allowed(kind: &EdgeKind, filter: Option<&[EdgeKind]>) -> bool {
    filter.map(|allowed| allowed.contains(kind)).unwrap_or(true)
}
