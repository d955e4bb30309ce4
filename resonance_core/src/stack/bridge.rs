//! Runs bare opcode sequences through the register-mesh executor.
//!
//! Each code becomes one instruction with default arguments; the run uses
//! SIMULATE and the finished executor is handed back for inspection.

use crate::config::VmConfig;
use crate::vm::{ExecutionMode, Program, ResonanceVm, VmResult};

/// Run `codes` with the default configuration.
///
/// The end-of-run crystal goes to the default crystal path; use
/// [`run_opcodes_with`] to redirect it.
pub fn run_opcodes(codes: &[u8]) -> VmResult<ResonanceVm> {
    run_opcodes_with(codes, VmConfig::default())
}

pub fn run_opcodes_with(codes: &[u8], config: VmConfig) -> VmResult<ResonanceVm> {
    let program = Program::from_codes(codes)?;
    let mut vm = ResonanceVm::with_config(config);
    vm.execute(program, ExecutionMode::Simulate)?;
    Ok(vm)
}
