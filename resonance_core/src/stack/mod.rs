//! Stack execution path.
//!
//! An independent LIFO runner for mnemonic instructions over scalars and
//! n-dimensional tensors, plus the [`bridge`] that feeds bare opcode
//! sequences to the register-mesh executor.

pub mod bridge;
pub mod error;
pub mod machine;
pub mod operations;
pub mod value;

pub use bridge::{run_opcodes, run_opcodes_with};
pub use error::StackError;
pub use machine::{StackInstruction, StackVm};
pub use value::{StackValue, Tensor};

/// Strict LIFO stack.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::ProgramStack;
///
/// let mut stack = ProgramStack::new();
/// stack.push(1);
/// stack.push(2);
/// assert_eq!(stack.pop().unwrap(), 2);
/// assert_eq!(stack.pop().unwrap(), 1);
/// assert!(stack.pop().is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramStack<T> {
    items: Vec<T>,
}

// Hand-written so that `T` need not implement `Default`.
impl<T> Default for ProgramStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProgramStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Result<T, StackError> {
        self.pop_for("POP")
    }

    /// Pop on behalf of `op`, naming it in the underflow error.
    pub fn pop_for(&mut self, op: &'static str) -> Result<T, StackError> {
        self.items.pop().ok_or(StackError::Underflow { op })
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Bottom to top.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_reverse_push_order() {
        let mut stack = ProgramStack::new();
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.peek(), Some(&2));
        assert_eq!(stack.pop().unwrap(), 2);
        assert_eq!(stack.pop().unwrap(), 1);
        assert!(stack.is_empty());
    }

    #[test]
    fn empty_pop_underflows() {
        let mut stack: ProgramStack<f64> = ProgramStack::new();
        assert!(matches!(stack.pop(), Err(StackError::Underflow { op: "POP" })));
        assert!(matches!(
            stack.pop_for("T_ADD"),
            Err(StackError::Underflow { op: "T_ADD" })
        ));
    }

    #[test]
    fn into_vec_is_bottom_to_top() {
        let mut stack = ProgramStack::new();
        for i in 0..4 {
            stack.push(i);
        }
        assert_eq!(stack.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(stack.into_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn default_stack_of_values_is_empty() {
        let stack: ProgramStack<StackValue> = ProgramStack::default();
        assert!(stack.is_empty());
        assert!(StackVm::default().execute(&[]).unwrap().is_empty());
    }
}
