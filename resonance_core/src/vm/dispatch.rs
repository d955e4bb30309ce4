//! Per-opcode semantics.
//!
//! Handlers return `Result<(), Interrupt>` so `?` works for both fault
//! kinds; [`ResonanceVm::dispatch`] folds the result into a [`StepOutcome`].

use std::path::PathBuf;

use resonance_shared::Opcode;
use serde_json::json;

use super::error::{OpcodeFault, StepOutcome, VmError};
use super::executor::ResonanceVm;
use super::instruction::Instruction;
use super::registers::Register;
use crate::config::VmConfig;
use crate::crystal::Crystalline;
use crate::mesh::{mesh_resonance, resonance, MeshNode};
use crate::vector::SpiralVector;

const ORIGIN_NODE: &str = "origin";

enum Interrupt {
    Fault(OpcodeFault),
    Fatal(VmError),
}

impl From<OpcodeFault> for Interrupt {
    fn from(fault: OpcodeFault) -> Self {
        Interrupt::Fault(fault)
    }
}

impl From<VmError> for Interrupt {
    fn from(err: VmError) -> Self {
        Interrupt::Fatal(err)
    }
}

type OpResult = Result<(), Interrupt>;

fn cycle_id(i: usize) -> String {
    format!("cycle_{i}")
}

fn missing(id: &str) -> OpcodeFault {
    OpcodeFault::NodeNotFound { id: id.to_string() }
}

/// Non-finite results are faulted instead of stored.
fn finite(vector: SpiralVector, opcode: Opcode) -> Result<SpiralVector, OpcodeFault> {
    if vector.is_finite() {
        Ok(vector)
    } else {
        Err(OpcodeFault::NonFinite { opcode })
    }
}

impl ResonanceVm {
    pub(crate) fn dispatch(&mut self, instruction: &Instruction, flags: &VmConfig) -> StepOutcome {
        let result = match instruction {
            Instruction::Init { mesh } => self.op_init(*mesh, flags),
            Instruction::Mesh { id, connect } => self.op_mesh(id.as_deref(), connect.as_deref(), flags),
            Instruction::Phi { register } => {
                let value = self.registers.get(*register);
                self.registers.set(*register, value.phi_wrapped());
                Ok(())
            }
            Instruction::Rot { register } => {
                self.registers.get_mut(*register).rotate_by_phi();
                Ok(())
            }
            Instruction::Bound { register, min, max } => self.op_bound(*register, *min, *max),
            Instruction::Flow { from, to } => self.op_flow(from.as_deref(), to.as_deref()),
            Instruction::Seek { node, register } => self.op_seek(node.as_deref(), *register),
            Instruction::Spiral {
                increment,
                register,
            } => {
                self.spiral_depth = self.spiral_depth.saturating_add(*increment);
                let slot = self.registers.get_mut(*register);
                for _ in 0..*increment {
                    slot.rotate_by_phi();
                }
                Ok(())
            }
            Instruction::Cycle { count, start, end } => self.op_cycle(*count, *start, *end, flags),
            Instruction::Forge { id, connect, .. } => self.op_forge(id.as_deref(), connect, flags),
            Instruction::Sync { local, remote } => {
                self.op_sync(*local, *remote, flags);
                Ok(())
            }
            Instruction::Mask { node, register } => self.op_mask(node.as_deref(), *register),
            Instruction::Cryst { node } => self.op_cryst(node.as_deref()),
            Instruction::Spec => self.op_spec(),
            Instruction::Bloom => {
                if let Some(entry) = self.error_mansion.last() {
                    let patched = entry.vector.rotated();
                    self.registers.set(Register::C, patched);
                }
                Ok(())
            }
            Instruction::Save { path } => self.op_save(path.as_ref(), flags),
        };

        match result {
            Ok(()) => StepOutcome::Applied,
            Err(Interrupt::Fault(fault)) => StepOutcome::Recoverable(fault),
            Err(Interrupt::Fatal(err)) => StepOutcome::Fatal(err),
        }
    }

    /// New ids must fit the node budget; updates to existing ids always do.
    fn admit_node(&self, id: &str, flags: &VmConfig) -> Result<(), VmError> {
        if self.mesh.contains(id) || self.mesh.len() < flags.max_mesh_nodes {
            Ok(())
        } else {
            Err(VmError::CapacityExceeded {
                current: self.mesh.len(),
                max: flags.max_mesh_nodes,
            })
        }
    }

    /// Explicit node id, or the most recently created node.
    fn target_node(&self, node: Option<&str>, opcode: Opcode) -> Result<String, OpcodeFault> {
        match node {
            Some(id) if self.mesh.contains(id) => Ok(id.to_string()),
            Some(id) => Err(missing(id)),
            None => self
                .mesh
                .last_id()
                .map(str::to_string)
                .ok_or(OpcodeFault::EmptyMesh { opcode }),
        }
    }

    fn op_init(&mut self, mesh: bool, flags: &VmConfig) -> OpResult {
        self.registers.reset();
        self.registers.set(Register::A, SpiralVector::seed());
        if mesh {
            self.mesh.clear();
            self.admit_node(ORIGIN_NODE, flags)?;
            self.mesh
                .insert(MeshNode::new(ORIGIN_NODE, self.registers.get(Register::A)));
        }
        Ok(())
    }

    fn op_mesh(
        &mut self,
        id: Option<&str>,
        connect: Option<&[String]>,
        flags: &VmConfig,
    ) -> OpResult {
        let vector = self.registers.get(Register::A);
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| self.mesh.next_id("node"));

        if let Some(node) = self.mesh.get_mut(&id) {
            node.vector = vector;
            for target in connect.unwrap_or_default() {
                node.connect(target.as_str());
            }
            return Ok(());
        }

        self.admit_node(&id, flags)?;
        let connections: Vec<String> = match connect {
            Some(list) => list.to_vec(),
            None => self.mesh.last_id().map(str::to_string).into_iter().collect(),
        };
        self.mesh
            .insert(MeshNode::new(id, vector).with_connections(connections));
        Ok(())
    }

    fn op_bound(&mut self, register: Register, min: f64, max: f64) -> OpResult {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(OpcodeFault::InvalidBounds { min, max }.into());
        }
        let value = self.registers.get(register);
        self.registers.set(register, value.clamped(min, max));
        Ok(())
    }

    fn op_flow(&mut self, from: Option<&str>, to: Option<&str>) -> OpResult {
        let empty = || OpcodeFault::EmptyMesh {
            opcode: Opcode::Flow,
        };
        let from = match from {
            Some(id) => id.to_string(),
            None => self.mesh.first_id().map(str::to_string).ok_or_else(empty)?,
        };
        let to = match to {
            Some(id) => id.to_string(),
            None => self.mesh.last_id().map(str::to_string).ok_or_else(empty)?,
        };

        let source = self.mesh.get(&from).ok_or_else(|| missing(&from))?.vector;
        let target = self.mesh.get_mut(&to).ok_or_else(|| missing(&to))?;
        target.vector = finite(target.vector.blend(&source, 0.5), Opcode::Flow)?;

        if from != to {
            if let Some(node) = self.mesh.get_mut(&from) {
                node.connect(to);
            }
        }
        Ok(())
    }

    fn op_seek(&mut self, node: Option<&str>, register: Register) -> OpResult {
        let found = match node {
            Some(id) => self.mesh.get(id).ok_or_else(|| missing(id))?.vector,
            None => {
                let query = self.registers.get(register);
                let mut best: Option<(f64, SpiralVector)> = None;
                for candidate in self.mesh.nodes() {
                    let score = resonance(&candidate.vector, &query);
                    if best.map_or(true, |(top, _)| score > top) {
                        best = Some((score, candidate.vector));
                    }
                }
                best.map(|(_, vector)| vector).ok_or(OpcodeFault::EmptyMesh {
                    opcode: Opcode::Seek,
                })?
            }
        };
        self.registers.set(register, found);
        Ok(())
    }

    fn op_spec(&mut self) -> OpResult {
        let spectrum = SpiralVector::new(
            self.registers.get(Register::A).magnitude(),
            self.registers.get(Register::B).magnitude(),
            self.registers.get(Register::C).magnitude(),
            mesh_resonance(&self.mesh),
        );
        self.registers
            .set(Register::D, finite(spectrum, Opcode::Spec)?);
        Ok(())
    }

    fn op_cycle(&mut self, count: u32, start: usize, end: usize, flags: &VmConfig) -> OpResult {
        if end < start {
            return Err(OpcodeFault::InvalidRange {
                opcode: Opcode::Cycle,
                start,
                end,
            }
            .into());
        }

        let seed = self.registers.get(Register::A);
        for i in start..end {
            let id = cycle_id(i);
            if !self.mesh.contains(&id) {
                self.admit_node(&id, flags)?;
                let mut node = MeshNode::new(id.as_str(), seed);
                if let Some(prev) = i.checked_sub(1).map(cycle_id) {
                    if self.mesh.contains(&prev) {
                        node.connect(prev);
                    }
                }
                self.mesh.insert(node);
            }
            if let Some(node) = self.mesh.get_mut(&id) {
                for _ in 0..count {
                    node.vector.rotate_by_phi();
                }
            }
        }
        Ok(())
    }

    fn op_forge(&mut self, id: Option<&str>, connect: &[String], flags: &VmConfig) -> OpResult {
        let vector = self
            .registers
            .get(Register::A)
            .wrapped_sum(&self.registers.get(Register::B));
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| self.mesh.next_id("forge"));

        if let Some(node) = self.mesh.get_mut(&id) {
            node.vector = vector;
            for target in connect {
                node.connect(target.as_str());
            }
            return Ok(());
        }

        self.admit_node(&id, flags)?;
        self.mesh
            .insert(MeshNode::new(id, vector).with_connections(connect.iter().cloned()));
        Ok(())
    }

    fn op_sync(&mut self, local: f64, remote: f64, flags: &VmConfig) {
        let score = 1.0 / (1.0 + (local - remote).abs());
        let reference = self.registers.get(Register::A);
        for node in self.mesh.nodes_mut() {
            node.resonance = resonance(&node.vector, &reference);
        }

        if score >= flags.resonance_threshold {
            tracing::info!(
                "SYNC score {:.4} reached threshold {:.4}",
                score,
                flags.resonance_threshold
            );
            self.emit(
                "resonance_threshold",
                json!({
                    "ip": self.ip,
                    "score": score,
                    "threshold": flags.resonance_threshold,
                    "local": local,
                    "remote": remote,
                }),
            );
        }
    }

    fn op_mask(&mut self, node: Option<&str>, register: Register) -> OpResult {
        let id = self.target_node(node, Opcode::Mask)?;
        let held = self.registers.get(register);
        let node = self.mesh.get_mut(&id).ok_or_else(|| missing(&id))?;
        let masked = std::mem::replace(&mut node.vector, held);
        self.registers.set(register, masked);
        Ok(())
    }

    fn op_cryst(&mut self, node: Option<&str>) -> OpResult {
        let id = self.target_node(node, Opcode::Cryst)?;
        let crystal = self.registers.get(Register::A).to_array();
        let depth = self.spiral_depth;
        let node = self.mesh.get_mut(&id).ok_or_else(|| missing(&id))?;
        node.memory.insert("crystal".to_string(), json!(crystal));
        node.memory.insert("crystal_depth".to_string(), json!(depth));
        Ok(())
    }

    fn op_save(&mut self, path: Option<&PathBuf>, flags: &VmConfig) -> OpResult {
        let target = path.cloned().unwrap_or_else(|| flags.crystal_path.clone());
        if !self.mode.allows_durable_writes() || flags.dry_run {
            tracing::info!(
                "SAVE skipped in {} (dry_run = {})",
                self.mode,
                flags.dry_run
            );
            self.emit(
                "save_skipped",
                json!({
                    "ip": self.ip,
                    "path": target.display().to_string(),
                    "mode": self.mode.name(),
                    "dry_run": flags.dry_run,
                }),
            );
            return Ok(());
        }

        self.save_crystal(&target)
            .map_err(|err| OpcodeFault::Persistence(err.to_string()))?;
        self.emit(
            "crystal_saved",
            json!({ "ip": self.ip, "path": target.display().to_string() }),
        );
        Ok(())
    }
}
