//! # Resonance VM Core
//!
//! A deterministic symbolic virtual machine over golden-ratio spiral vectors.
//! Sixteen fixed opcodes drive a register file and a resonance-linked mesh of
//! state nodes; every instruction is scored by mesh-wide resonance, faults are
//! collected instead of aborting the run, and the full state round-trips
//! through a JSON crystal.
//!
//! ## Quick Start
//!
//! ```rust
//! use resonance_vm_core::{ExecutionMode, Program, ResonanceVm, VmConfig};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = VmConfig::default().with_crystal_path(dir.path().join("run.crystal.json"));
//!
//! let program = Program::from_json(
//!     &json!([
//!         ["INIT", {"mesh": true}],
//!         ["MESH", {}],
//!         ["CYCLE", {"count": 2, "start": 1, "end": 2}],
//!         ["SPEC"]
//!     ])
//!     .to_string(),
//! )
//! .unwrap();
//!
//! let mut vm = ResonanceVm::with_config(config);
//! let summary = vm.execute(program, ExecutionMode::Simulate).unwrap();
//!
//! assert_eq!(vm.mesh().len(), 3);
//! assert_eq!(vm.resonance_log().len(), 4);
//! assert_eq!(summary.faults, 0);
//! ```
//!
//! ## Core Modules
//!
//! - [`vector`] - Spiral vector algebra
//! - [`mesh`] - Node store and resonance scoring
//! - [`vm`] - Instructions, programs and the register-mesh executor
//! - [`crystal`] - JSON snapshot persistence
//! - [`stack`] - LIFO stack machine with tensor operations
//! - [`config`] - VM flags via TOML
//! - [`logging`] - Structured event sinks

pub mod config;
pub mod crystal;
pub mod logging;
pub mod mesh;
pub mod stack;
pub mod vector;
pub mod vm;

pub use config::{ConfigError, VmConfig};
pub use crystal::{CrystalError, CrystalSnapshot, Crystalline, NodeRecord};
pub use logging::{EventError, EventSink, JsonlEventLog, MemoryEventLog, VmEvent};
pub use mesh::{mesh_resonance, resonance, Mesh, MeshNode};
pub use stack::{
    run_opcodes, run_opcodes_with, ProgramStack, StackError, StackInstruction, StackValue,
    StackVm, Tensor,
};
pub use vector::SpiralVector;
pub use vm::{
    ArgMap, ErrorHandler, ExecutionMode, FailureVector, Instruction, MansionEntry, MansionKind,
    OpcodeFault, OpcodeRef, Program, Register, RegisterFile, ResonanceEntry, ResonanceVm,
    RunSummary, StepOutcome, VmError, VmResult,
};

pub use resonance_shared::{Opcode, PHI, PHI_INV, TAU};
