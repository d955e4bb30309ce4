//! Immutable instruction sequences.

use std::fmt;

use resonance_shared::{op_from_word, Opcode};
use serde_json::Value;

use super::error::{VmError, VmResult};
use super::instruction::{ArgMap, Instruction};

/// An opcode given either as its hex code or its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeRef {
    Code(u8),
    Name(String),
}

impl OpcodeRef {
    /// Names are tried as opcode names first, then as spark words.
    pub fn resolve(&self) -> VmResult<Opcode> {
        match self {
            OpcodeRef::Code(code) => Ok(Opcode::from_code(*code)?),
            OpcodeRef::Name(name) => match name.parse::<Opcode>() {
                Ok(op) => Ok(op),
                Err(err) => op_from_word(name).ok_or_else(|| VmError::from(err)),
            },
        }
    }
}

impl From<u8> for OpcodeRef {
    fn from(code: u8) -> Self {
        OpcodeRef::Code(code)
    }
}

impl From<&str> for OpcodeRef {
    fn from(name: &str) -> Self {
        OpcodeRef::Name(name.to_string())
    }
}

impl From<Opcode> for OpcodeRef {
    fn from(op: Opcode) -> Self {
        OpcodeRef::Code(op.code())
    }
}

impl fmt::Display for OpcodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeRef::Code(code) => write!(f, "0x{code:X}"),
            OpcodeRef::Name(name) => f.write_str(name),
        }
    }
}

/// Ordered, immutable list of instructions indexed by the instruction pointer.
///
/// Each step also carries the `fork` flag its argument map supplied.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::Program;
///
/// let program = Program::from_json(r#"[["INIT", {"mesh": true}], [1, {}], {"op": "CYCLE", "args": {"count": 2}}]"#).unwrap();
/// assert_eq!(program.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    forks: Vec<bool>,
}

impl Program {
    /// A program in which no step forks.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let forks = vec![false; instructions.len()];
        Self {
            instructions,
            forks,
        }
    }

    /// Build from `(instruction, fork)` steps.
    pub fn from_steps(steps: Vec<(Instruction, bool)>) -> Self {
        let (instructions, forks) = steps.into_iter().unzip();
        Self {
            instructions,
            forks,
        }
    }

    /// Build from `(opcode, argument-map)` pairs.
    pub fn from_pairs<I, O>(pairs: I) -> VmResult<Self>
    where
        I: IntoIterator<Item = (O, ArgMap)>,
        O: Into<OpcodeRef>,
    {
        pairs
            .into_iter()
            .map(|(op, args)| {
                let op: OpcodeRef = op.into();
                Instruction::parse_step(op.resolve()?, &args)
            })
            .collect::<VmResult<Vec<_>>>()
            .map(Self::from_steps)
    }

    /// One default-argument instruction per hex code.
    pub fn from_codes(codes: &[u8]) -> VmResult<Self> {
        codes
            .iter()
            .map(|code| Opcode::from_code(*code).map(Instruction::default_for))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
            .map_err(VmError::from)
    }

    /// Parse a JSON array of `[op, {args}]` pairs or `{"op": .., "args": {..}}`
    /// objects, where `op` is an integer code or a name.
    pub fn from_json(text: &str) -> VmResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| VmError::InvalidProgram(err.to_string()))?;
        let Value::Array(entries) = value else {
            return Err(VmError::InvalidProgram(
                "program must be a JSON array".into(),
            ));
        };

        entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| parse_entry(idx, entry))
            .collect::<VmResult<Vec<_>>>()
            .map(Self::from_steps)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<&Instruction> {
        self.instructions.get(ip)
    }

    /// Whether the step at `ip` asked for a fork.
    pub fn forks_at(&self, ip: usize) -> bool {
        self.forks.get(ip).copied().unwrap_or(false)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

fn parse_entry(idx: usize, entry: &Value) -> VmResult<(Instruction, bool)> {
    let (op, args) = match entry {
        Value::Array(items) if !items.is_empty() && items.len() <= 2 => {
            (&items[0], items.get(1))
        }
        Value::Object(obj) => match obj.get("op") {
            Some(op) => (op, obj.get("args")),
            None => {
                return Err(VmError::InvalidProgram(format!(
                    "entry {idx} is missing \"op\""
                )))
            }
        },
        _ => {
            return Err(VmError::InvalidProgram(format!(
                "entry {idx} must be [op, args] or {{\"op\": .., \"args\": ..}}"
            )))
        }
    };

    let opcode = match op {
        Value::String(name) => OpcodeRef::Name(name.clone()),
        Value::Number(n) => {
            let code = n
                .as_u64()
                .and_then(|c| u8::try_from(c).ok())
                .ok_or_else(|| VmError::InvalidProgram(format!("entry {idx} has bad code {n}")))?;
            OpcodeRef::Code(code)
        }
        other => {
            return Err(VmError::InvalidProgram(format!(
                "entry {idx} has unusable op {other}"
            )))
        }
    }
    .resolve()?;

    let empty = ArgMap::new();
    let args = match args {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(VmError::InvalidProgram(format!(
                "entry {idx} arguments must be an object"
            )))
        }
    };

    Instruction::parse_step(opcode, args)
}
