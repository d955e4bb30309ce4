//! Pairwise and mesh-wide resonance scoring.
//!
//! Pairwise resonance is the cosine similarity of two vectors, snapped toward
//! the golden ratio when it lands near φ or φ⁻¹, and clamped to `[0, φ]`.
//! Mesh resonance is the mean pairwise score over every directed edge whose
//! target exists. A mesh without such edges scores exactly `1.0`.

use resonance_shared::{PHI, PHI_INV};

use super::Mesh;
use crate::vector::SpiralVector;

/// Distance from φ or φ⁻¹ inside which a raw score gets snapped.
pub const SNAP_WINDOW: f64 = 0.1;

/// Neutral score for meshes with nothing to compare.
pub const NEUTRAL_RESONANCE: f64 = 1.0;

/// Golden-ratio snapped cosine similarity in `[0, φ]`.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::{resonance, SpiralVector};
///
/// let a = SpiralVector::new(1.0, 2.0, 3.0, 4.0);
/// assert_eq!(resonance(&a, &a), 1.0);
/// assert_eq!(resonance(&a, &SpiralVector::zero()), 0.0);
/// ```
pub fn resonance(a: &SpiralVector, b: &SpiralVector) -> f64 {
    // Cosine similarity is scale-free; unit max components keep every square
    // in the normal range.
    let (Some(a), Some(b)) = (unit_max(a), unit_max(b)) else {
        return 0.0;
    };

    // sqrt(x·x) is exact for x = |a|², so a vector against itself scores 1.0.
    let denominator = (a.dot(&a) * b.dot(&b)).sqrt();
    let raw = a.dot(&b) / denominator;
    snap(raw).clamp(0.0, PHI)
}

/// `v` divided by its largest absolute component; `None` for zero or
/// non-finite vectors.
fn unit_max(v: &SpiralVector) -> Option<SpiralVector> {
    let largest = v.max_abs();
    if largest == 0.0 || !v.is_finite() {
        return None;
    }
    Some(SpiralVector::from_array(v.to_array().map(|c| c / largest)))
}

fn snap(raw: f64) -> f64 {
    if (raw - PHI).abs() < SNAP_WINDOW {
        raw * PHI
    } else if (raw - PHI_INV).abs() < SNAP_WINDOW {
        raw * PHI_INV
    } else {
        raw
    }
}

/// Mean pairwise resonance over every live edge in the mesh.
pub fn mesh_resonance(mesh: &Mesh) -> f64 {
    let mut total = 0.0;
    let mut edges = 0usize;
    for (source, target) in mesh.edges() {
        total += resonance(&source.vector, &target.vector);
        edges += 1;
    }

    if edges == 0 {
        NEUTRAL_RESONANCE
    } else {
        total / edges as f64
    }
}
