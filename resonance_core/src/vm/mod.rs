//! Register-mesh virtual machine.

mod dispatch;
pub mod error;
pub mod executor;
pub mod handler;
pub mod instruction;
pub mod mode;
pub mod program;
pub mod registers;

pub use error::{OpcodeFault, StepOutcome, VmError, VmResult};
pub use executor::{ResonanceEntry, ResonanceVm, RunSummary, ARM_ERROR_LIMIT};
pub use handler::{ErrorHandler, FailureVector, MansionEntry, MansionKind};
pub use instruction::{ArgMap, Instruction};
pub use mode::ExecutionMode;
pub use program::{OpcodeRef, Program};
pub use registers::{Register, RegisterFile};
