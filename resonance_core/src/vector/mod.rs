pub mod spiral_vector;

pub use spiral_vector::{wrap_phase, SpiralVector};
