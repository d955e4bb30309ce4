//! Element-wise tensor primitives for the stack machine.
//!
//! - [`add`], [`sub`], [`mul`] - element-wise over identical shapes
//! - [`scale`] - multiply every element by a scalar
//!
//! Results always have the shape of their inputs.

use ndarray::{ArrayD, Zip};

use super::error::StackError;
use super::value::Tensor;

/// Element-wise sum of two tensors with identical shapes.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::stack::operations::add;
/// use resonance_vm_core::Tensor;
/// use serde_json::json;
///
/// let a = Tensor::from_json(&json!([1.0, 2.0])).unwrap();
/// let b = Tensor::from_json(&json!([10.0, 20.0])).unwrap();
/// assert_eq!(add(&a, &b).unwrap().data().as_slice().unwrap(), &[11.0, 22.0]);
/// ```
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor, StackError> {
    zip_with("T_ADD", a, b, |lhs, rhs| lhs + rhs)
}

pub fn sub(a: &Tensor, b: &Tensor) -> Result<Tensor, StackError> {
    zip_with("T_SUB", a, b, |lhs, rhs| lhs - rhs)
}

/// Hadamard product.
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor, StackError> {
    zip_with("T_MUL", a, b, |lhs, rhs| lhs * rhs)
}

pub fn scale(a: &Tensor, factor: f64) -> Tensor {
    let tensor = Tensor::new(a.data().mapv(|value| value * factor));
    log_operation("T_SCALE", &tensor);
    tensor
}

fn zip_with(
    op: &'static str,
    a: &Tensor,
    b: &Tensor,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Tensor, StackError> {
    ensure_same_shape(op, a, b)?;
    let mut out = ArrayD::zeros(a.data().raw_dim());
    Zip::from(&mut out)
        .and(a.data())
        .and(b.data())
        .for_each(|out, &lhs, &rhs| {
            *out = f(lhs, rhs);
        });

    let tensor = Tensor::new(out);
    log_operation(op, &tensor);
    Ok(tensor)
}

fn log_operation(op: &str, tensor: &Tensor) {
    tracing::trace!("{} -> shape {:?}, sum {}", op, tensor.shape(), tensor.sum());
}

fn ensure_same_shape(op: &'static str, a: &Tensor, b: &Tensor) -> Result<(), StackError> {
    if a.shape() == b.shape() {
        Ok(())
    } else {
        Err(StackError::ShapeMismatch {
            op,
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tensor(value: serde_json::Value) -> Tensor {
        Tensor::from_json(&value).unwrap()
    }

    #[test]
    fn add_preserves_shape() {
        let a = tensor(json!([[1, 2, 3], [4, 5, 6]]));
        let b = tensor(json!([[1, 1, 1], [1, 1, 1]]));
        let sum = add(&a, &b).unwrap();
        assert_eq!(sum.shape(), a.shape());
        assert_eq!(sum, tensor(json!([[2, 3, 4], [5, 6, 7]])));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let a = tensor(json!([[1, 2], [3, 4]]));
        let b = tensor(json!([1, 2, 3, 4]));
        let err = add(&a, &b).unwrap_err();
        assert_eq!(
            err,
            StackError::ShapeMismatch {
                op: "T_ADD",
                left: vec![2, 2],
                right: vec![4],
            }
        );
        assert!(mul(&a, &b).is_err());
    }

    #[test]
    fn sub_mul_and_scale() {
        let a = tensor(json!([4, 6]));
        let b = tensor(json!([1, 2]));
        assert_eq!(sub(&a, &b).unwrap(), tensor(json!([3, 4])));
        assert_eq!(mul(&a, &b).unwrap(), tensor(json!([4, 12])));
        assert_eq!(scale(&a, 0.5), tensor(json!([2, 3])));
    }
}
