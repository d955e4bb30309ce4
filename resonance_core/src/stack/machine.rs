//! Mnemonic-addressed stack machine.
//!
//! Binary operators pop the right operand first: `PUSH a; PUSH b; SUB`
//! leaves `a - b`. `T_SCALE` expects the scalar on top of the tensor.

use std::fmt;

use serde_json::Value;

use super::error::StackError;
use super::operations;
use super::value::{StackValue, Tensor};
use super::ProgramStack;

#[derive(Debug, Clone, PartialEq)]
pub enum StackInstruction {
    Push(StackValue),
    Pop,
    Dup,
    Swap,
    Add,
    Sub,
    Mul,
    Div,
    TAdd,
    TSub,
    TMul,
    TScale,
    TSum,
}

impl StackInstruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            StackInstruction::Push(_) => "PUSH",
            StackInstruction::Pop => "POP",
            StackInstruction::Dup => "DUP",
            StackInstruction::Swap => "SWAP",
            StackInstruction::Add => "ADD",
            StackInstruction::Sub => "SUB",
            StackInstruction::Mul => "MUL",
            StackInstruction::Div => "DIV",
            StackInstruction::TAdd => "T_ADD",
            StackInstruction::TSub => "T_SUB",
            StackInstruction::TMul => "T_MUL",
            StackInstruction::TScale => "T_SCALE",
            StackInstruction::TSum => "T_SUM",
        }
    }

    /// Parse a mnemonic (any case) with its optional operand.
    ///
    /// Only `PUSH` takes an operand; the others ignore one if given.
    pub fn parse(mnemonic: &str, operand: Option<&Value>) -> Result<Self, StackError> {
        let instruction = match mnemonic.trim().to_ascii_uppercase().as_str() {
            "PUSH" => {
                let value = operand
                    .filter(|value| !value.is_null())
                    .ok_or(StackError::MissingOperand { op: "PUSH" })?;
                StackInstruction::Push(StackValue::from_json(value)?)
            }
            "POP" => StackInstruction::Pop,
            "DUP" => StackInstruction::Dup,
            "SWAP" => StackInstruction::Swap,
            "ADD" => StackInstruction::Add,
            "SUB" => StackInstruction::Sub,
            "MUL" => StackInstruction::Mul,
            "DIV" => StackInstruction::Div,
            "T_ADD" => StackInstruction::TAdd,
            "T_SUB" => StackInstruction::TSub,
            "T_MUL" => StackInstruction::TMul,
            "T_SCALE" => StackInstruction::TScale,
            "T_SUM" => StackInstruction::TSum,
            _ => return Err(StackError::UnknownMnemonic(mnemonic.to_string())),
        };
        Ok(instruction)
    }

    /// Parse JSON text of the form `[["PUSH", 1], ["PUSH", 2], ["ADD"]]`.
    pub fn parse_program(text: &str) -> Result<Vec<Self>, StackError> {
        let entries: Vec<Value> = serde_json::from_str(text)
            .map_err(|err| StackError::InvalidProgram(err.to_string()))?;

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let parts = entry.as_array().ok_or_else(|| {
                    StackError::InvalidProgram(format!("entry {index} is not an array"))
                })?;
                let mnemonic = parts.first().and_then(Value::as_str).ok_or_else(|| {
                    StackError::InvalidProgram(format!("entry {index} has no mnemonic"))
                })?;
                Self::parse(mnemonic, parts.get(1))
            })
            .collect()
    }
}

impl fmt::Display for StackInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackInstruction::Push(value) => write!(f, "PUSH {value}"),
            other => f.write_str(other.mnemonic()),
        }
    }
}

/// Runs [`StackInstruction`] programs over a [`ProgramStack`].
///
/// # Examples
///
/// ```
/// use resonance_vm_core::{StackInstruction, StackValue, StackVm};
///
/// let mut vm = StackVm::new();
/// let result = vm
///     .execute(&[
///         StackInstruction::Push(StackValue::Scalar(6.0)),
///         StackInstruction::Push(StackValue::Scalar(3.0)),
///         StackInstruction::Div,
///     ])
///     .unwrap();
/// assert_eq!(result, vec![StackValue::Scalar(2.0)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StackVm {
    stack: ProgramStack<StackValue>,
}

impl StackVm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self) -> &ProgramStack<StackValue> {
        &self.stack
    }

    /// Clear the stack, run `program`, and return the final stack bottom to
    /// top. The first error aborts the run.
    pub fn execute(
        &mut self,
        program: &[StackInstruction],
    ) -> Result<Vec<StackValue>, StackError> {
        self.stack.clear();
        for instruction in program {
            self.step(instruction)?;
        }
        Ok(self.stack.as_slice().to_vec())
    }

    pub fn step(&mut self, instruction: &StackInstruction) -> Result<(), StackError> {
        let op = instruction.mnemonic();
        tracing::trace!("stack {} (depth {})", instruction, self.stack.len());

        match instruction {
            StackInstruction::Push(value) => self.stack.push(value.clone()),
            StackInstruction::Pop => {
                self.stack.pop_for(op)?;
            }
            StackInstruction::Dup => {
                let top = self
                    .stack
                    .peek()
                    .cloned()
                    .ok_or(StackError::Underflow { op })?;
                self.stack.push(top);
            }
            StackInstruction::Swap => {
                let b = self.stack.pop_for(op)?;
                let a = self.stack.pop_for(op)?;
                self.stack.push(b);
                self.stack.push(a);
            }
            StackInstruction::Add => self.scalar_binary(op, |a, b| Ok(a + b))?,
            StackInstruction::Sub => self.scalar_binary(op, |a, b| Ok(a - b))?,
            StackInstruction::Mul => self.scalar_binary(op, |a, b| Ok(a * b))?,
            StackInstruction::Div => self.scalar_binary(op, |a, b| {
                if b == 0.0 {
                    Err(StackError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            })?,
            StackInstruction::TAdd => self.tensor_binary(op, operations::add)?,
            StackInstruction::TSub => self.tensor_binary(op, operations::sub)?,
            StackInstruction::TMul => self.tensor_binary(op, operations::mul)?,
            StackInstruction::TScale => {
                let factor = self.pop_scalar(op)?;
                let tensor = self.pop_tensor(op)?;
                self.stack
                    .push(StackValue::Tensor(operations::scale(&tensor, factor)));
            }
            StackInstruction::TSum => {
                let tensor = self.pop_tensor(op)?;
                self.stack.push(StackValue::Scalar(tensor.sum()));
            }
        }
        Ok(())
    }

    fn scalar_binary(
        &mut self,
        op: &'static str,
        f: impl Fn(f64, f64) -> Result<f64, StackError>,
    ) -> Result<(), StackError> {
        let b = self.pop_scalar(op)?;
        let a = self.pop_scalar(op)?;
        self.stack.push(StackValue::Scalar(f(a, b)?));
        Ok(())
    }

    fn tensor_binary(
        &mut self,
        op: &'static str,
        f: impl Fn(&Tensor, &Tensor) -> Result<Tensor, StackError>,
    ) -> Result<(), StackError> {
        let b = self.pop_tensor(op)?;
        let a = self.pop_tensor(op)?;
        self.stack.push(StackValue::Tensor(f(&a, &b)?));
        Ok(())
    }

    fn pop_scalar(&mut self, op: &'static str) -> Result<f64, StackError> {
        match self.stack.pop_for(op)? {
            StackValue::Scalar(value) => Ok(value),
            StackValue::Tensor(_) => Err(StackError::TypeMismatch {
                op,
                expected: "scalar",
            }),
        }
    }

    fn pop_tensor(&mut self, op: &'static str) -> Result<Tensor, StackError> {
        match self.stack.pop_for(op)? {
            StackValue::Tensor(tensor) => Ok(tensor),
            StackValue::Scalar(_) => Err(StackError::TypeMismatch {
                op,
                expected: "tensor",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push(value: Value) -> StackInstruction {
        StackInstruction::parse("push", Some(&value)).unwrap()
    }

    #[test]
    fn scalar_arithmetic_uses_push_order() {
        let mut vm = StackVm::new();
        let out = vm
            .execute(&[push(json!(10)), push(json!(4)), StackInstruction::Sub])
            .unwrap();
        assert_eq!(out, vec![StackValue::Scalar(6.0)]);
    }

    #[test]
    fn dup_and_swap() {
        let mut vm = StackVm::new();
        let out = vm
            .execute(&[
                push(json!(1)),
                push(json!(2)),
                StackInstruction::Swap,
                StackInstruction::Dup,
            ])
            .unwrap();
        assert_eq!(
            out,
            vec![
                StackValue::Scalar(2.0),
                StackValue::Scalar(1.0),
                StackValue::Scalar(1.0),
            ]
        );
    }

    #[test]
    fn tensor_pipeline() {
        let mut vm = StackVm::new();
        let out = vm
            .execute(&[
                push(json!([[1, 2], [3, 4]])),
                push(json!([[1, 1], [1, 1]])),
                StackInstruction::TAdd,
                push(json!(2)),
                StackInstruction::TScale,
                StackInstruction::TSum,
            ])
            .unwrap();
        assert_eq!(out, vec![StackValue::Scalar(28.0)]);
    }

    #[test]
    fn t_add_shape_mismatch_propagates() {
        let mut vm = StackVm::new();
        let err = vm
            .execute(&[push(json!([1, 2])), push(json!([1, 2, 3])), StackInstruction::TAdd])
            .unwrap_err();
        assert!(matches!(err, StackError::ShapeMismatch { op: "T_ADD", .. }));
    }

    #[test]
    fn type_and_arithmetic_errors() {
        let mut vm = StackVm::new();
        let err = vm
            .execute(&[push(json!([1])), push(json!(1)), StackInstruction::Add])
            .unwrap_err();
        assert_eq!(
            err,
            StackError::TypeMismatch {
                op: "ADD",
                expected: "scalar"
            }
        );

        let err = vm
            .execute(&[push(json!(1)), push(json!(0)), StackInstruction::Div])
            .unwrap_err();
        assert_eq!(err, StackError::DivisionByZero);

        let err = vm.execute(&[StackInstruction::Pop]).unwrap_err();
        assert_eq!(err, StackError::Underflow { op: "POP" });
    }

    #[test]
    fn parse_is_case_insensitive_and_strict() {
        assert_eq!(
            StackInstruction::parse("t_add", None).unwrap(),
            StackInstruction::TAdd
        );
        assert_eq!(
            StackInstruction::parse("PUSH", None).unwrap_err(),
            StackError::MissingOperand { op: "PUSH" }
        );
        assert!(matches!(
            StackInstruction::parse("JUMP", None),
            Err(StackError::UnknownMnemonic(_))
        ));
    }

    #[test]
    fn parse_program_from_json() {
        let program =
            StackInstruction::parse_program(r#"[["PUSH", 2], ["PUSH", 3], ["MUL"]]"#).unwrap();
        assert_eq!(program.len(), 3);
        let out = StackVm::new().execute(&program).unwrap();
        assert_eq!(out, vec![StackValue::Scalar(6.0)]);

        assert!(matches!(
            StackInstruction::parse_program(r#"[{"op": "PUSH"}]"#),
            Err(StackError::InvalidProgram(_))
        ));
    }
}
