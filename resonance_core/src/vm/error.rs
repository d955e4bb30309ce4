//! Error types for the register-mesh executor.
//!
//! [`OpcodeFault`]s are raised while dispatching one instruction and are
//! always recovered by the run loop. [`VmError`]s reach the caller.

use std::fmt;

use resonance_shared::{Opcode, OpcodeError};

use crate::config::ConfigError;
use crate::crystal::CrystalError;

/// Result type alias for VM operations
pub type VmResult<T> = Result<T, VmError>;

/// Caller-visible VM failures.
#[derive(Debug)]
pub enum VmError {
    /// Integer code outside the opcode table.
    UnknownOpcode { code: u8 },
    /// Opcode name that matches nothing.
    UnknownOpcodeName { name: String },
    /// Argument present with the wrong type or an unusable value.
    InvalidArgument {
        opcode: Opcode,
        key: String,
        reason: String,
    },
    /// Program text that is not a list of `(op, args)` pairs.
    InvalidProgram(String),
    /// Mesh node budget exhausted.
    CapacityExceeded { current: usize, max: usize },
    /// Crystal save/load failure.
    Persistence(CrystalError),
    /// Configuration could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::UnknownOpcode { code } => write!(f, "Unknown opcode 0x{code:X}"),
            VmError::UnknownOpcodeName { name } => write!(f, "Unknown opcode name '{name}'"),
            VmError::InvalidArgument {
                opcode,
                key,
                reason,
            } => write!(f, "Invalid argument '{key}' for {opcode}: {reason}"),
            VmError::InvalidProgram(msg) => write!(f, "Invalid program: {msg}"),
            VmError::CapacityExceeded { current, max } => write!(
                f,
                "Mesh capacity exceeded: {current} nodes present, budget is {max}"
            ),
            VmError::Persistence(err) => write!(f, "Crystal persistence failed: {err}"),
            VmError::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::Persistence(err) => Some(err),
            VmError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OpcodeError> for VmError {
    fn from(err: OpcodeError) -> Self {
        match err {
            OpcodeError::UnknownCode(code) => VmError::UnknownOpcode { code },
            OpcodeError::UnknownName(name) => VmError::UnknownOpcodeName { name },
        }
    }
}

impl From<CrystalError> for VmError {
    fn from(err: CrystalError) -> Self {
        VmError::Persistence(err)
    }
}

impl From<ConfigError> for VmError {
    fn from(err: ConfigError) -> Self {
        VmError::Config(err)
    }
}

/// Recoverable fault raised while dispatching a single instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum OpcodeFault {
    NodeNotFound { id: String },
    EmptyMesh { opcode: Opcode },
    InvalidRange {
        opcode: Opcode,
        start: usize,
        end: usize,
    },
    InvalidBounds { min: f64, max: f64 },
    /// The result overflowed `f64` and was not stored.
    NonFinite { opcode: Opcode },
    Persistence(String),
}

impl fmt::Display for OpcodeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeFault::NodeNotFound { id } => write!(f, "mesh node '{id}' not found"),
            OpcodeFault::EmptyMesh { opcode } => write!(f, "{opcode} requires a non-empty mesh"),
            OpcodeFault::InvalidRange { opcode, start, end } => {
                write!(f, "{opcode} range {start}..{end} is reversed")
            }
            OpcodeFault::InvalidBounds { min, max } => {
                write!(f, "bounds [{min}, {max}] are empty or not finite")
            }
            OpcodeFault::NonFinite { opcode } => write!(f, "{opcode} produced a non-finite vector"),
            OpcodeFault::Persistence(msg) => write!(f, "crystal write failed: {msg}"),
        }
    }
}

impl std::error::Error for OpcodeFault {}

/// Outcome of dispatching one instruction.
#[derive(Debug)]
pub enum StepOutcome {
    Applied,
    /// Logged to the error handler and ErrorMansion; the run continues.
    Recoverable(OpcodeFault),
    /// Stops the run and is returned to the caller.
    Fatal(VmError),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_errors_convert() {
        let err: VmError = OpcodeError::UnknownCode(0x1F).into();
        assert!(matches!(err, VmError::UnknownOpcode { code: 0x1F }));
        assert_eq!(err.to_string(), "Unknown opcode 0x1F");
    }

    #[test]
    fn fault_messages_name_the_problem() {
        let fault = OpcodeFault::NodeNotFound { id: "ghost".into() };
        assert_eq!(fault.to_string(), "mesh node 'ghost' not found");
        let fault = OpcodeFault::InvalidRange {
            opcode: Opcode::Cycle,
            start: 3,
            end: 1,
        };
        assert_eq!(fault.to_string(), "CYCLE range 3..1 is reversed");
    }
}
