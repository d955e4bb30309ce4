use std::fmt::{self, Display};
use std::ops::{Add, Sub};

use resonance_shared::{PHI, PHI_INV, TAU};
use serde::{Deserialize, Serialize};

/// A four-component state vector `(pace, rate, state, spin)`.
///
/// Magnitude is a golden-ratio weighted Euclidean norm that privileges the
/// later components, and [`SpiralVector::rotate_by_phi`] mixes neighbouring
/// components before wrapping each one into `[0, 2π)`.
///
/// Serialized as an ordered 4-element array.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::SpiralVector;
///
/// let mut v = SpiralVector::new(1.0, 2.0, 3.0, 4.0);
/// assert!(v.magnitude() > 0.0);
///
/// v.rotate_by_phi();
/// assert!(v.to_array().iter().all(|c| (0.0..std::f64::consts::TAU).contains(c)));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct SpiralVector {
    pub pace: f64,
    pub rate: f64,
    pub state: f64,
    pub spin: f64,
}

impl SpiralVector {
    pub const fn new(pace: f64, rate: f64, state: f64, spin: f64) -> Self {
        Self {
            pace,
            rate,
            state,
            spin,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Descending powers of φ⁻¹, the register-A state written by INIT.
    pub fn seed() -> Self {
        Self::new(1.0, PHI_INV, PHI_INV * PHI_INV, PHI_INV * PHI_INV * PHI_INV)
    }

    pub const fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub const fn to_array(self) -> [f64; 4] {
        [self.pace, self.rate, self.state, self.spin]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|c| *c == 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }

    /// Largest absolute component.
    pub fn max_abs(&self) -> f64 {
        self.to_array().iter().fold(0.0, |acc, c| acc.max(c.abs()))
    }

    /// `sqrt(pace² + φ·rate² + φ²·state² + φ⁻¹·spin²)`
    ///
    /// Vectors whose squares leave the normal range are rescaled by their
    /// largest component first, so only a norm above `f64::MAX` overflows.
    pub fn magnitude(&self) -> f64 {
        let squared = self.weighted_square();
        if squared.is_normal() || self.is_zero() || !self.is_finite() {
            return squared.sqrt();
        }
        let largest = self.max_abs();
        largest * self.map(|c| c / largest).weighted_square().sqrt()
    }

    fn weighted_square(&self) -> f64 {
        self.pace * self.pace
            + PHI * self.rate * self.rate
            + PHI * PHI * self.state * self.state
            + PHI_INV * self.spin * self.spin
    }

    /// Plain component-wise dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.pace * other.pace
            + self.rate * other.rate
            + self.state * other.state
            + self.spin * other.spin
    }

    /// Advance the phase of every component in place.
    ///
    /// Repeated application stays inside `[0, 2π)` but does not return to the
    /// starting vector.
    ///
    /// Finite components of any size stay finite: sums that overflow are
    /// reduced term by term.
    pub fn rotate_by_phi(&mut self) {
        let pace = mix_phase(self.pace, self.spin);
        let rate = mix_phase(self.pace, self.rate);
        let state = mix_phase(self.state, self.rate);
        let spin = mix_phase(self.state, self.spin);

        self.pace = pace;
        self.rate = rate;
        self.state = state;
        self.spin = spin;
    }

    pub fn rotated(mut self) -> Self {
        self.rotate_by_phi();
        self
    }

    pub fn scaled(self, factor: f64) -> Self {
        self.map(|c| c * factor)
    }

    /// Every component wrapped into `[0, 2π)`.
    pub fn wrapped(self) -> Self {
        self.map(wrap_phase)
    }

    /// `(self · φ).wrapped()` without overflowing near `f64::MAX`.
    pub fn phi_wrapped(self) -> Self {
        self.map(phi_phase)
    }

    /// `(self + other).wrapped()` without overflowing near `f64::MAX`.
    pub fn wrapped_sum(self, other: &Self) -> Self {
        let (a, b) = (self.to_array(), other.to_array());
        Self::from_array(std::array::from_fn(|i| {
            let total = a[i] + b[i];
            if total.is_finite() {
                wrap_phase(total)
            } else {
                wrap_phase(wrap_phase(a[i]) + wrap_phase(b[i]))
            }
        }))
    }

    pub fn clamped(self, min: f64, max: f64) -> Self {
        self.map(|c| c.clamp(min, max))
    }

    /// Linear interpolation `self·(1 - t) + target·t`; stays finite for
    /// finite inputs and `t` in `[0, 1]`.
    pub fn blend(self, target: &Self, t: f64) -> Self {
        self.scaled(1.0 - t) + target.scaled(t)
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.pace), f(self.rate), f(self.state), f(self.spin))
    }
}

/// Wrap a finite phase into `[0, 2π)`.
///
/// `rem_euclid` can round up to exactly `TAU` for tiny negative inputs, which
/// is folded back to zero.
pub fn wrap_phase(value: f64) -> f64 {
    let wrapped = value.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// `x·φ` wrapped into `[0, 2π)`, splitting `x·φ = x + x·φ⁻¹` on overflow.
fn phi_phase(x: f64) -> f64 {
    let product = x * PHI;
    if product.is_finite() {
        wrap_phase(product)
    } else {
        wrap_phase(wrap_phase(x) + wrap_phase(x * PHI_INV))
    }
}

/// `a·φ⁻¹ + b·φ` wrapped into `[0, 2π)`.
fn mix_phase(a: f64, b: f64) -> f64 {
    let sum = a * PHI_INV + b * PHI;
    if sum.is_finite() {
        wrap_phase(sum)
    } else {
        wrap_phase(wrap_phase(a * PHI_INV) + phi_phase(b))
    }
}

impl From<[f64; 4]> for SpiralVector {
    fn from(values: [f64; 4]) -> Self {
        Self::from_array(values)
    }
}

impl From<SpiralVector> for [f64; 4] {
    fn from(vector: SpiralVector) -> Self {
        vector.to_array()
    }
}

impl Add for SpiralVector {
    type Output = SpiralVector;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.pace + rhs.pace,
            self.rate + rhs.rate,
            self.state + rhs.state,
            self.spin + rhs.spin,
        )
    }
}

impl Sub for SpiralVector {
    type Output = SpiralVector;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.pace - rhs.pace,
            self.rate - rhs.rate,
            self.state - rhs.state,
            self.spin - rhs.spin,
        )
    }
}

impl Display for SpiralVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "⟨pace {:.4}, rate {:.4}, state {:.4}, spin {:.4}⟩",
            self.pace, self.rate, self.state, self.spin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vector_has_zero_magnitude() {
        assert_eq!(SpiralVector::zero().magnitude(), 0.0);
        assert!(SpiralVector::zero().is_zero());
    }

    #[test]
    fn magnitude_weights_components_by_phi_powers() {
        let v = SpiralVector::new(1.0, 1.0, 1.0, 1.0);
        let expected = (1.0 + PHI + PHI * PHI + PHI_INV).sqrt();
        assert!((v.magnitude() - expected).abs() < 1e-12);

        let only_state = SpiralVector::new(0.0, 0.0, 2.0, 0.0);
        assert!((only_state.magnitude() - 2.0 * PHI).abs() < 1e-12);
    }

    #[test]
    fn rotation_mixes_neighbouring_components() {
        let mut v = SpiralVector::new(1.0, 0.0, 0.0, 0.0);
        v.rotate_by_phi();
        assert!((v.pace - PHI_INV).abs() < 1e-12);
        assert!((v.rate - PHI_INV).abs() < 1e-12);
        assert_eq!(v.state, 0.0);
        assert_eq!(v.spin, 0.0);
    }

    #[test]
    fn rotation_wraps_large_and_negative_components() {
        let mut v = SpiralVector::new(-50.0, 1.0e6, -1.0e-17, 12.0);
        for _ in 0..64 {
            v.rotate_by_phi();
            for c in v.to_array() {
                assert!((0.0..TAU).contains(&c), "component {c} escaped [0, 2π)");
            }
        }
    }

    #[test]
    fn wrap_phase_never_returns_tau() {
        assert_eq!(wrap_phase(-1.0e-17), 0.0);
        assert_eq!(wrap_phase(TAU), 0.0);
        assert!((wrap_phase(TAU + 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn serializes_as_ordered_array() {
        let v = SpiralVector::new(0.1, 0.2, 0.3, 0.4);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.1,0.2,0.3,0.4]");
        let back: SpiralVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn blend_half_way_is_midpoint() {
        let a = SpiralVector::new(0.0, 0.0, 0.0, 0.0);
        let b = SpiralVector::new(2.0, 4.0, 6.0, 8.0);
        assert_eq!(a.blend(&b, 0.5), SpiralVector::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn magnitude_survives_extreme_scales() {
        let unit = SpiralVector::new(1.0, 2.0, 3.0, 4.0);
        for scale in [1.0e200, 1.0e-200, 1.0e300, 1.0e-300] {
            let expected = unit.magnitude() * scale;
            let got = unit.scaled(scale).magnitude();
            assert!(
                ((got - expected) / expected).abs() < 1e-12,
                "scale {scale}: {got} vs {expected}"
            );
        }
        assert!(SpiralVector::new(5e-324, 0.0, 0.0, 0.0).magnitude() > 0.0);
    }

    #[test]
    fn rotation_stays_finite_near_f64_max() {
        let mut v = SpiralVector::new(1.0e308, 0.0, 0.0, 1.5e308);
        v.rotate_by_phi();
        for c in v.to_array() {
            assert!((0.0..TAU).contains(&c), "component {c} escaped [0, 2π)");
        }
        let mut v = SpiralVector::new(f64::MAX, -f64::MAX, f64::MAX, -f64::MAX);
        for _ in 0..8 {
            v.rotate_by_phi();
            assert!(v.to_array().iter().all(|c| (0.0..TAU).contains(c)));
        }
    }

    #[test]
    fn phi_and_sum_wrapping_stay_finite() {
        let huge = SpiralVector::new(1.5e308, -1.5e308, f64::MAX, 3.0);
        for v in [huge.phi_wrapped(), huge.wrapped_sum(&huge)] {
            assert!(v.to_array().iter().all(|c| (0.0..TAU).contains(c)), "{v:?}");
        }
        let small = SpiralVector::new(6.0, 1.0, 0.5, 0.0);
        assert_eq!(small.phi_wrapped(), small.scaled(PHI).wrapped());
        assert_eq!(small.wrapped_sum(&small), (small + small).wrapped());
    }

    #[test]
    fn blend_between_opposite_extremes_is_finite() {
        let a = SpiralVector::new(f64::MAX, -f64::MAX, 0.0, 1.0);
        let b = SpiralVector::new(-f64::MAX, f64::MAX, 0.0, 1.0);
        assert!(a.blend(&b, 0.5).is_finite());
    }
}
