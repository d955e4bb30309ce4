//! Register-mesh run loop.
//!
//! Each instruction is bracketed by mesh-resonance measurements that land in
//! the resonance log. Faults are routed to the error handler and the
//! ErrorMansion without stopping the run; the pointer always advances by
//! one. Every `spiral_depth` instructions a self-audit re-scores the mesh.
//! The run ends with an unconditional crystal snapshot.

use std::fmt;
use std::path::PathBuf;

use resonance_shared::PHI_INV;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{OpcodeFault, StepOutcome, VmResult};
use super::handler::{
    ErrorHandler, FailureVector, MansionEntry, MansionKind, COLLAPSE_LESSON,
};
use super::instruction::Instruction;
use super::mode::ExecutionMode;
use super::program::Program;
use super::registers::{Register, RegisterFile};
use crate::config::VmConfig;
use crate::crystal::Crystalline;
use crate::logging::{EventSink, VmEvent};
use crate::mesh::{mesh_resonance, Mesh};
use crate::vector::SpiralVector;

/// ErrorMansion size that, together with a collapsed mesh, arms the VM.
pub const ARM_ERROR_LIMIT: usize = 10;

/// Resonance measured around one executed instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceEntry {
    pub op: String,
    pub pre_resonance: f64,
    pub post_resonance: f64,
    pub delta: f64,
}

/// What a completed run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub instructions: usize,
    pub faults: usize,
    pub final_resonance: f64,
    pub mode: ExecutionMode,
    pub crystal_path: PathBuf,
}

/// Spiral-aware symbolic executor.
///
/// # Examples
///
/// ```no_run
/// use resonance_vm_core::{Instruction, Program, ResonanceVm};
///
/// let mut vm = ResonanceVm::new();
/// let program = Program::new(vec![
///     Instruction::Init { mesh: true },
///     Instruction::Spiral { increment: 2, register: resonance_vm_core::Register::A },
/// ]);
/// vm.run(program).unwrap();
/// assert_eq!(vm.spiral_depth(), 2);
/// ```
pub struct ResonanceVm {
    pub(crate) mesh: Mesh,
    pub(crate) registers: RegisterFile,
    pub(crate) ip: usize,
    pub(crate) program: Program,
    pub(crate) mode: ExecutionMode,
    pub(crate) error_mansion: Vec<MansionEntry>,
    pub(crate) spiral_depth: u32,
    pub(crate) resonance_log: Vec<ResonanceEntry>,
    pub(crate) handler: ErrorHandler,
    pub(crate) fork_count: usize,
    pub(crate) forks: Vec<usize>,
    config: VmConfig,
    events: Option<Box<dyn EventSink>>,
}

impl ResonanceVm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            mesh: Mesh::new(),
            registers: RegisterFile::new(),
            ip: 0,
            program: Program::default(),
            mode: ExecutionMode::default(),
            error_mansion: Vec::new(),
            spiral_depth: 0,
            resonance_log: Vec::new(),
            handler: ErrorHandler::new(),
            fork_count: 0,
            forks: Vec::new(),
            config,
            events: None,
        }
    }

    /// Attach a structured event sink.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Some(Box::new(sink));
        self
    }

    pub fn set_event_sink(&mut self, sink: Option<Box<dyn EventSink>>) {
        self.events = sink;
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VmConfig) {
        self.config = config;
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn register(&self, register: Register) -> SpiralVector {
        self.registers.get(register)
    }

    pub fn resonance_log(&self) -> &[ResonanceEntry] {
        &self.resonance_log
    }

    pub fn error_mansion(&self) -> &[MansionEntry] {
        &self.error_mansion
    }

    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }

    pub fn spiral_depth(&self) -> u32 {
        self.spiral_depth
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn fork_count(&self) -> usize {
        self.fork_count
    }

    /// Fork counter value after each fork of the current VM lifetime.
    pub fn forks(&self) -> &[usize] {
        &self.forks
    }

    pub fn mesh_resonance(&self) -> f64 {
        mesh_resonance(&self.mesh)
    }

    /// Run under SIMULATE.
    pub fn run(&mut self, program: impl Into<Program>) -> VmResult<RunSummary> {
        self.execute(program, ExecutionMode::Simulate)
    }

    /// Run `program` to completion and persist the crystal.
    ///
    /// Opcode faults never abort the run. An exhausted node budget does, and
    /// so does a failing end-of-run save.
    pub fn execute(
        &mut self,
        program: impl Into<Program>,
        mode: ExecutionMode,
    ) -> VmResult<RunSummary> {
        let flags = self.config.clone();
        self.mode = if mode == ExecutionMode::Simulate && flags.narrative_mode {
            ExecutionMode::Trace
        } else {
            mode
        };
        self.ip = 0;
        self.program = program.into();

        let mut faults = 0usize;
        while let Some(instruction) = self.program.get(self.ip).cloned() {
            if flags.fork_tracking && self.program.forks_at(self.ip) {
                self.enter_fork();
            }
            self.narrate(&instruction, &flags);

            let pre = mesh_resonance(&self.mesh);
            let outcome = self.dispatch(&instruction, &flags);
            let post = mesh_resonance(&self.mesh);
            self.resonance_log.push(ResonanceEntry {
                op: instruction.opcode().name().to_string(),
                pre_resonance: pre,
                post_resonance: post,
                delta: post - pre,
            });

            match outcome {
                StepOutcome::Applied => {}
                StepOutcome::Recoverable(fault) => {
                    faults += 1;
                    self.record_fault(&instruction, &fault);
                }
                StepOutcome::Fatal(err) => {
                    // An aborted run is not a completed one, so no end-of-run crystal.
                    self.ip += 1;
                    tracing::error!("Run aborted at ip {}: {}", self.ip - 1, err);
                    return Err(err);
                }
            }

            self.ip += 1;
            if self.spiral_depth > 0 && self.ip % self.spiral_depth as usize == 0 {
                self.spiral_audit();
            }
        }

        self.save_crystal(&flags.crystal_path)?;

        Ok(RunSummary {
            instructions: self.program.len(),
            faults,
            final_resonance: mesh_resonance(&self.mesh),
            mode: self.mode,
            crystal_path: flags.crystal_path,
        })
    }

    fn record_fault(&mut self, instruction: &Instruction, fault: &OpcodeFault) {
        let op = instruction.opcode();
        let lesson = fault.to_string();
        tracing::warn!("{} fault at ip {}: {}", op.name(), self.ip, lesson);

        self.handler.handle(FailureVector {
            op: op.name().to_string(),
            ip: self.ip,
            error: lesson.clone(),
        });
        self.error_mansion.push(MansionEntry::new(
            MansionKind::Exception,
            self.registers.get(Register::A),
            &lesson,
        ));
    }

    fn spiral_audit(&mut self) {
        let resonance = mesh_resonance(&self.mesh);
        if resonance >= PHI_INV {
            return;
        }

        self.error_mansion.push(MansionEntry::new(
            MansionKind::ResonanceCollapse,
            self.registers.get(Register::A),
            COLLAPSE_LESSON,
        ));
        tracing::warn!(
            "Resonance collapse at ip {}: mesh resonance {:.4} below φ⁻¹",
            self.ip,
            resonance
        );
        self.emit(
            "resonance_collapse",
            json!({ "ip": self.ip, "resonance": resonance, "spiral_depth": self.spiral_depth }),
        );

        if self.error_mansion.len() > ARM_ERROR_LIMIT && self.mode != ExecutionMode::Arm {
            self.mode = ExecutionMode::Arm;
            tracing::warn!(
                "Entering ARM: {} ErrorMansion entries, resonance {:.4}",
                self.error_mansion.len(),
                resonance
            );
            self.emit(
                "arm_entered",
                json!({ "ip": self.ip, "errors": self.error_mansion.len(), "resonance": resonance }),
            );
        }
    }

    fn enter_fork(&mut self) {
        self.mode = ExecutionMode::Fork;
        self.fork_count += 1;
        self.forks.push(self.fork_count);
        self.emit("fork", json!({ "ip": self.ip, "count": self.fork_count }));
    }

    fn narrate(&mut self, instruction: &Instruction, flags: &VmConfig) {
        let op = instruction.opcode();
        tracing::debug!("ip {} {} ({})", self.ip, op.name(), self.mode);
        if !(self.mode.narrates() || flags.dry_run) {
            return;
        }

        tracing::info!(
            "{} {} at ip {}: {}",
            op.glyph(),
            op.name(),
            self.ip,
            op.description()
        );
        self.emit(
            "op_narrative",
            json!({
                "ip": self.ip,
                "op": op.name(),
                "glyph": op.glyph(),
                "description": op.description(),
                "mode": self.mode.name(),
            }),
        );
    }

    pub(crate) fn emit(&mut self, event_type: &str, payload: Value) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        match VmEvent::new(event_type, payload) {
            Ok(event) => {
                if let Err(err) = sink.record(&event) {
                    tracing::warn!("Failed to record {} event: {}", event_type, err);
                }
            }
            Err(err) => tracing::warn!("Dropped malformed event: {}", err),
        }
    }

    /// Back to a freshly constructed VM, keeping config and event sink.
    pub(crate) fn reset_state(&mut self) {
        self.mesh.clear();
        self.registers.reset();
        self.ip = 0;
        self.program = Program::default();
        self.mode = ExecutionMode::default();
        self.error_mansion.clear();
        self.spiral_depth = 0;
        self.resonance_log.clear();
        self.handler.reset();
        self.fork_count = 0;
        self.forks.clear();
    }
}

impl Default for ResonanceVm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResonanceVm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResonanceVm")
            .field("mode", &self.mode)
            .field("ip", &self.ip)
            .field("nodes", &self.mesh.len())
            .field("spiral_depth", &self.spiral_depth)
            .field("errors", &self.error_mansion.len())
            .field("log_entries", &self.resonance_log.len())
            .finish_non_exhaustive()
    }
}
