use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vector::SpiralVector;

/// Named register slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Register {
    A,
    B,
    C,
    D,
}

impl Register {
    pub const ALL: [Register; 4] = [Register::A, Register::B, Register::C, Register::D];

    pub fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
        }
    }
}

impl FromStr for Register {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Register::A),
            "B" => Ok(Register::B),
            "C" => Ok(Register::C),
            "D" => Ok(Register::D),
            other => Err(format!("unknown register '{other}'")),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed register file; every slot always holds a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegisterFile {
    slots: [SpiralVector; 4],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, register: Register) -> SpiralVector {
        self.slots[register as usize]
    }

    pub fn get_mut(&mut self, register: Register) -> &mut SpiralVector {
        &mut self.slots[register as usize]
    }

    pub fn set(&mut self, register: Register, vector: SpiralVector) {
        self.slots[register as usize] = vector;
    }

    pub fn reset(&mut self) {
        self.slots = [SpiralVector::zero(); 4];
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, SpiralVector)> + '_ {
        Register::ALL.iter().map(move |r| (*r, self.get(*r)))
    }
}
