//! Opcode table and golden-ratio constants.
//!
//! Every opcode has a fixed hexadecimal code in `0x0..=0xF` and a fixed short
//! name. [`Opcode::from_code`] is the only integer-to-opcode conversion; it is
//! defined for every `u8` and rejects codes outside the table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The golden ratio φ.
pub const PHI: f64 = 1.618_033_988_749_895;
/// The reciprocal of the golden ratio, φ⁻¹ = φ − 1.
pub const PHI_INV: f64 = 0.618_033_988_749_894_9;
/// Full turn in radians; vector components are wrapped into `[0, TAU)`.
pub const TAU: f64 = std::f64::consts::TAU;

/// Opcode lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeError {
    /// Integer code outside `0x0..=0xF`.
    UnknownCode(u8),
    /// Name that matches no opcode.
    UnknownName(String),
}

impl fmt::Display for OpcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeError::UnknownCode(code) => write!(f, "unknown opcode 0x{code:X}"),
            OpcodeError::UnknownName(name) => write!(f, "unknown opcode name '{name}'"),
        }
    }
}

impl std::error::Error for OpcodeError {}

/// The sixteen resonance VM operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    Init = 0x0,
    Mesh = 0x1,
    Phi = 0x2,
    Rot = 0x3,
    Bound = 0x4,
    Flow = 0x5,
    Seek = 0x6,
    Spiral = 0x7,
    Cycle = 0x8,
    Forge = 0x9,
    Sync = 0xA,
    Mask = 0xB,
    Cryst = 0xC,
    Spec = 0xD,
    Bloom = 0xE,
    Save = 0xF,
}

impl Opcode {
    /// All opcodes in code order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Init,
        Opcode::Mesh,
        Opcode::Phi,
        Opcode::Rot,
        Opcode::Bound,
        Opcode::Flow,
        Opcode::Seek,
        Opcode::Spiral,
        Opcode::Cycle,
        Opcode::Forge,
        Opcode::Sync,
        Opcode::Mask,
        Opcode::Cryst,
        Opcode::Spec,
        Opcode::Bloom,
        Opcode::Save,
    ];

    /// Resolve an integer code.
    pub fn from_code(code: u8) -> Result<Self, OpcodeError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(OpcodeError::UnknownCode(code))
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fixed short upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Init => "INIT",
            Opcode::Mesh => "MESH",
            Opcode::Phi => "PHI",
            Opcode::Rot => "ROT",
            Opcode::Bound => "BOUND",
            Opcode::Flow => "FLOW",
            Opcode::Seek => "SEEK",
            Opcode::Spiral => "SPIRAL",
            Opcode::Cycle => "CYCLE",
            Opcode::Forge => "FORGE",
            Opcode::Sync => "SYNC",
            Opcode::Mask => "MASK",
            Opcode::Cryst => "CRYST",
            Opcode::Spec => "SPEC",
            Opcode::Bloom => "BLOOM",
            Opcode::Save => "SAVE",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Opcode::Init => "⚡",
            Opcode::Mesh => "⧉",
            Opcode::Phi => "◉",
            Opcode::Rot => "🌀",
            Opcode::Bound => "📐",
            Opcode::Flow => "🌊",
            Opcode::Seek => "🔺",
            Opcode::Spiral => "💫",
            Opcode::Cycle => "♻️",
            Opcode::Forge => "🔥",
            Opcode::Sync => "✨",
            Opcode::Mask => "🎭",
            Opcode::Cryst => "💎",
            Opcode::Spec => "🌈",
            Opcode::Bloom => "✺",
            Opcode::Save => "💾",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Opcode::Init => "Initialize/Reset",
            Opcode::Mesh => "Network connection",
            Opcode::Phi => "Golden ratio transform",
            Opcode::Rot => "Rotate perspective",
            Opcode::Bound => "Set boundaries",
            Opcode::Flow => "Enable movement",
            Opcode::Seek => "Navigate/search",
            Opcode::Spiral => "Evolve upward",
            Opcode::Cycle => "Iterate process",
            Opcode::Forge => "Create/transmute",
            Opcode::Sync => "Synchronize",
            Opcode::Mask => "Transform identity",
            Opcode::Cryst => "Crystallize pattern",
            Opcode::Spec => "Spectrum analysis",
            Opcode::Bloom => "Transform error to gift",
            Opcode::Save => "Persist memory",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = OpcodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Opcode::from_code(code)
    }
}

impl FromStr for Opcode {
    type Err = OpcodeError;

    /// Names are matched case-insensitively.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OpcodeError::UnknownName(name.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
