use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::vector::SpiralVector;

/// A state-bearing node in the execution mesh.
///
/// Connections are directed and may name nodes that do not exist; such
/// dangling edges are kept but ignored by resonance scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshNode {
    pub id: String,
    pub vector: SpiralVector,
    /// Free-form string-keyed memory.
    #[serde(default)]
    pub memory: Map<String, Value>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default = "default_resonance")]
    pub resonance: f64,
}

impl MeshNode {
    pub fn new(id: impl Into<String>, vector: SpiralVector) -> Self {
        Self {
            id: id.into(),
            vector,
            memory: Map::new(),
            connections: Vec::new(),
            resonance: default_resonance(),
        }
    }

    pub fn with_connections<I, S>(mut self, connections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for target in connections {
            self.connect(target);
        }
        self
    }

    /// Add a directed edge; repeated targets are stored once.
    pub fn connect(&mut self, target: impl Into<String>) {
        let target = target.into();
        if !self.connections.iter().any(|existing| *existing == target) {
            self.connections.push(target);
        }
    }

    pub fn is_connected_to(&self, target: &str) -> bool {
        self.connections.iter().any(|existing| existing == target)
    }
}

pub(crate) fn default_resonance() -> f64 {
    1.0
}
