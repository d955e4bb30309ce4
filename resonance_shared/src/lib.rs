//! Resonance Shared Library
//!
//! Shared types and constants for the resonance virtual machine.
//!
//! This library provides:
//! - The canonical 16-entry opcode table (code, name, glyph, description)
//! - Golden-ratio constants used by vector algebra and resonance scoring
//! - The spark-word lookup that maps everyday verbs to opcodes

pub mod opwords;
pub mod symbols;

pub use opwords::{op_from_word, OP_WORD_MAP};
pub use symbols::{Opcode, OpcodeError, PHI, PHI_INV, TAU};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
