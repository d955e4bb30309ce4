//! Resonance-linked graph of state nodes.
//!
//! Nodes keep their creation order, which drives default arguments such as
//! "the previously created node" and the order of persisted snapshots.

pub mod node;
pub mod resonance;

pub use node::MeshNode;
pub use resonance::{mesh_resonance, resonance, NEUTRAL_RESONANCE};

use indexmap::IndexMap;

/// Insertion-ordered node store keyed by node id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    nodes: IndexMap<String, MeshNode>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&MeshNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MeshNode> {
        self.nodes.get_mut(id)
    }

    /// Insert a node, replacing any node with the same id in place.
    pub fn insert(&mut self, node: MeshNode) -> Option<MeshNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn first_id(&self) -> Option<&str> {
        self.nodes.keys().next().map(String::as_str)
    }

    pub fn last_id(&self) -> Option<&str> {
        self.nodes.keys().last().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut MeshNode> {
        self.nodes.values_mut()
    }

    /// Smallest free id of the form `{prefix}_{n}` with `n ≥ len()`.
    pub fn next_id(&self, prefix: &str) -> String {
        let mut n = self.nodes.len();
        loop {
            let candidate = format!("{prefix}_{n}");
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Directed edges whose target exists, in source creation order.
    pub fn edges(&self) -> impl Iterator<Item = (&MeshNode, &MeshNode)> {
        self.nodes.values().flat_map(move |source| {
            source
                .connections
                .iter()
                .filter_map(move |target| self.nodes.get(target).map(|node| (source, node)))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }
}

impl FromIterator<MeshNode> for Mesh {
    fn from_iter<T: IntoIterator<Item = MeshNode>>(iter: T) -> Self {
        let mut mesh = Mesh::new();
        for node in iter {
            mesh.insert(node);
        }
        mesh
    }
}
