use std::fmt;

/// Errors raised by the stack execution path. None of them are recovered.
#[derive(Debug, Clone, PartialEq)]
pub enum StackError {
    /// An operation popped an empty stack.
    Underflow { op: &'static str },
    /// Element-wise operands with different shapes.
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },
    /// Scalar where a tensor was required, or the other way round.
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
    },
    DivisionByZero,
    /// Nested array input that is ragged or holds non-numbers.
    InvalidTensor(String),
    /// An instruction that needs an operand was given none.
    MissingOperand { op: &'static str },
    UnknownMnemonic(String),
    /// Program text that is not a list of `[mnemonic, operand?]` entries.
    InvalidProgram(String),
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Underflow { op } => write!(f, "{op}: stack underflow"),
            StackError::ShapeMismatch { op, left, right } => {
                write!(f, "{op}: shape mismatch {left:?} vs {right:?}")
            }
            StackError::TypeMismatch { op, expected } => {
                write!(f, "{op}: expected a {expected} operand")
            }
            StackError::DivisionByZero => write!(f, "DIV: division by zero"),
            StackError::InvalidTensor(msg) => write!(f, "Invalid tensor: {msg}"),
            StackError::MissingOperand { op } => write!(f, "{op}: missing operand"),
            StackError::UnknownMnemonic(name) => write!(f, "Unknown mnemonic '{name}'"),
            StackError::InvalidProgram(msg) => write!(f, "Invalid stack program: {msg}"),
        }
    }
}

impl std::error::Error for StackError {}
