use std::fmt;

use ndarray::{ArrayD, IxDyn};
use serde_json::Value;

use super::error::StackError;

/// N-dimensional `f64` tensor.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::Tensor;
/// use serde_json::json;
///
/// let tensor = Tensor::from_json(&json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
/// assert_eq!(tensor.shape(), &[2, 2]);
/// assert_eq!(tensor.sum(), 10.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: ArrayD<f64>,
}

impl Tensor {
    pub fn new(data: ArrayD<f64>) -> Self {
        Self { data }
    }

    pub fn from_shape_vec(shape: &[usize], values: Vec<f64>) -> Result<Self, StackError> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::new)
            .map_err(|err| StackError::InvalidTensor(err.to_string()))
    }

    /// Build from nested JSON arrays of numbers; every level must be
    /// rectangular.
    pub fn from_json(value: &Value) -> Result<Self, StackError> {
        let mut flat = Flattener::default();
        flat.visit(value, 0)?;
        Self::from_shape_vec(&flat.shape, flat.values)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

#[derive(Default)]
struct Flattener {
    shape: Vec<usize>,
    rank: Option<usize>,
    values: Vec<f64>,
}

impl Flattener {
    fn visit(&mut self, value: &Value, depth: usize) -> Result<(), StackError> {
        match value {
            Value::Array(items) => {
                if self.rank.is_some_and(|rank| depth >= rank) {
                    return Err(ragged(depth));
                }
                if depth == self.shape.len() {
                    self.shape.push(items.len());
                } else if self.shape[depth] != items.len() {
                    return Err(ragged(depth));
                }
                for item in items {
                    self.visit(item, depth + 1)?;
                }
                Ok(())
            }
            Value::Number(number) => {
                match self.rank {
                    None if depth == self.shape.len() => self.rank = Some(depth),
                    Some(rank) if rank == depth => {}
                    _ => return Err(ragged(depth)),
                }
                let value = number.as_f64().ok_or_else(|| {
                    StackError::InvalidTensor(format!("{number} is not representable as f64"))
                })?;
                self.values.push(value);
                Ok(())
            }
            other => Err(StackError::InvalidTensor(format!(
                "expected a number or an array, found {other}"
            ))),
        }
    }
}

fn ragged(depth: usize) -> StackError {
    StackError::InvalidTensor(format!("ragged nesting at depth {depth}"))
}

/// Operand held on the stack.
#[derive(Clone, Debug, PartialEq)]
pub enum StackValue {
    Scalar(f64),
    Tensor(Tensor),
}

impl StackValue {
    /// A bare number is a scalar; an array is a tensor.
    pub fn from_json(value: &Value) -> Result<Self, StackError> {
        match value {
            Value::Number(number) => number.as_f64().map(StackValue::Scalar).ok_or_else(|| {
                StackError::InvalidTensor(format!("{number} is not representable as f64"))
            }),
            Value::Array(_) => Tensor::from_json(value).map(StackValue::Tensor),
            other => Err(StackError::InvalidTensor(format!(
                "expected a number or an array, found {other}"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StackValue::Scalar(_) => "scalar",
            StackValue::Tensor(_) => "tensor",
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            StackValue::Scalar(value) => Some(*value),
            StackValue::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            StackValue::Scalar(_) => None,
            StackValue::Tensor(tensor) => Some(tensor),
        }
    }
}

impl From<f64> for StackValue {
    fn from(value: f64) -> Self {
        StackValue::Scalar(value)
    }
}

impl From<Tensor> for StackValue {
    fn from(tensor: Tensor) -> Self {
        StackValue::Tensor(tensor)
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Scalar(value) => write!(f, "{value}"),
            StackValue::Tensor(tensor) => write!(f, "{tensor}"),
        }
    }
}
