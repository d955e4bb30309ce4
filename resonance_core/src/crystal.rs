//! Crystal snapshots: JSON persistence of the VM's durable state.
//!
//! A crystal holds the mesh, the four registers, the spiral depth and the
//! resonance log. Writing one creates missing parent directories. Loading
//! one replaces all of that state and clears everything else the VM
//! accumulated at run time, leaving only configuration and the event sink.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mesh::node::default_resonance;
use crate::mesh::MeshNode;
use crate::vector::SpiralVector;
use crate::vm::{Register, ResonanceEntry, ResonanceVm};

/// Errors that can occur while writing or reading crystals.
#[derive(Debug)]
pub enum CrystalError {
    /// Underlying I/O failure while reading or writing crystal files.
    Io(std::io::Error),
    /// Malformed JSON or a document that does not fit the crystal schema.
    Serialization(serde_json::Error),
    /// Well-formed document carrying values the VM cannot accept.
    InvalidFormat(String),
}

impl fmt::Display for CrystalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrystalError::Io(err) => write!(f, "I/O error while accessing crystal: {err}"),
            CrystalError::Serialization(err) => {
                write!(f, "Failed to (de)serialize crystal: {err}")
            }
            CrystalError::InvalidFormat(msg) => write!(f, "Crystal has invalid structure: {msg}"),
        }
    }
}

impl std::error::Error for CrystalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrystalError::Io(err) => Some(err),
            CrystalError::Serialization(err) => Some(err),
            CrystalError::InvalidFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for CrystalError {
    fn from(err: std::io::Error) -> Self {
        CrystalError::Io(err)
    }
}

impl From<serde_json::Error> for CrystalError {
    fn from(err: serde_json::Error) -> Self {
        CrystalError::Serialization(err)
    }
}

/// Persisted form of a mesh node; the id is the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub vector: SpiralVector,
    #[serde(default)]
    pub memory: Map<String, Value>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default = "default_resonance")]
    pub resonance: f64,
}

impl From<&MeshNode> for NodeRecord {
    fn from(node: &MeshNode) -> Self {
        Self {
            vector: node.vector,
            memory: node.memory.clone(),
            connections: node.connections.clone(),
            resonance: node.resonance,
        }
    }
}

impl NodeRecord {
    fn into_node(self, id: String) -> MeshNode {
        MeshNode {
            id,
            vector: self.vector,
            memory: self.memory,
            connections: self.connections,
            resonance: self.resonance,
        }
    }
}

/// Top-level crystal document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalSnapshot {
    pub mesh: IndexMap<String, NodeRecord>,
    pub registers: BTreeMap<String, SpiralVector>,
    pub spiral_depth: u32,
    pub resonance_log: Vec<ResonanceEntry>,
}

impl CrystalSnapshot {
    /// NaN and infinities have no JSON encoding and are refused before writing.
    pub fn check_finite(&self) -> Result<(), CrystalError> {
        let bad = |what: String| Err(CrystalError::InvalidFormat(format!("{what} is not finite")));
        for (id, record) in &self.mesh {
            if !record.vector.is_finite() || !record.resonance.is_finite() {
                return bad(format!("node '{id}'"));
            }
        }
        for (name, vector) in &self.registers {
            if !vector.is_finite() {
                return bad(format!("register {name}"));
            }
        }
        for (idx, entry) in self.resonance_log.iter().enumerate() {
            if ![entry.pre_resonance, entry.post_resonance, entry.delta]
                .iter()
                .all(|v| v.is_finite())
            {
                return bad(format!("resonance log entry {idx}"));
            }
        }
        Ok(())
    }
}

/// Components that persist themselves as crystal JSON implement this trait.
pub trait Crystalline {
    /// Write the current state to `path`.
    fn save_crystal<P: AsRef<Path>>(&self, path: P) -> Result<(), CrystalError>;

    /// Replace the current state with the crystal stored at `path`.
    fn load_crystal<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CrystalError>;

    /// Pretty-print `document` to `path`, creating parent directories.
    fn write_document<P, T>(document: &T, path: P) -> Result<(), CrystalError>
    where
        P: AsRef<Path>,
        T: Serialize,
    {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.flush()?;
        Ok(())
    }

    fn read_document<P, T>(path: P) -> Result<T, CrystalError>
    where
        P: AsRef<Path>,
        T: serde::de::DeserializeOwned,
    {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl ResonanceVm {
    pub fn snapshot(&self) -> CrystalSnapshot {
        CrystalSnapshot {
            mesh: self
                .mesh
                .nodes()
                .map(|node| (node.id.clone(), NodeRecord::from(node)))
                .collect(),
            registers: self
                .registers
                .iter()
                .map(|(register, vector)| (register.name().to_string(), vector))
                .collect(),
            spiral_depth: self.spiral_depth,
            resonance_log: self.resonance_log.clone(),
        }
    }

    /// Reset to a fresh VM, then load `snapshot`.
    ///
    /// Register names are checked before anything is touched, so a rejected
    /// snapshot leaves the VM as it was.
    pub fn restore(&mut self, snapshot: CrystalSnapshot) -> Result<(), CrystalError> {
        let mut registers = Vec::with_capacity(snapshot.registers.len());
        for (name, vector) in snapshot.registers {
            let register: Register = name.parse().map_err(CrystalError::InvalidFormat)?;
            registers.push((register, vector));
        }

        self.reset_state();
        for (register, vector) in registers {
            self.registers.set(register, vector);
        }
        for (id, record) in snapshot.mesh {
            self.mesh.insert(record.into_node(id));
        }
        self.spiral_depth = snapshot.spiral_depth;
        self.resonance_log = snapshot.resonance_log;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CrystalError> {
        let snapshot = self.snapshot();
        snapshot.check_finite()?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn restore_json(&mut self, text: &str) -> Result<(), CrystalError> {
        let snapshot: CrystalSnapshot = serde_json::from_str(text)?;
        self.restore(snapshot)
    }
}

impl Crystalline for ResonanceVm {
    fn save_crystal<P: AsRef<Path>>(&self, path: P) -> Result<(), CrystalError> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        snapshot.check_finite()?;
        Self::write_document(&snapshot, path)?;
        tracing::debug!("Crystal written to {}", path.display());
        Ok(())
    }

    fn load_crystal<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CrystalError> {
        let path = path.as_ref();
        let snapshot: CrystalSnapshot = Self::read_document(path)?;
        self.restore(snapshot)?;
        tracing::info!(
            "Crystal loaded from {} ({} nodes)",
            path.display(),
            self.mesh.len()
        );
        Ok(())
    }
}
