//! Typed instructions for the register-mesh executor.
//!
//! Programs arrive as `(opcode, argument-map)` pairs. Each pair is parsed
//! once into an [`Instruction`] variant carrying only the fields its opcode
//! uses; the dispatcher matches on the variant exhaustively.

use std::path::PathBuf;

use resonance_shared::{Opcode, TAU};
use serde_json::{Map, Value};

use super::error::{VmError, VmResult};
use super::registers::Register;

/// Raw argument map as supplied by collaborators.
pub type ArgMap = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Init {
        mesh: bool,
    },
    Mesh {
        id: Option<String>,
        connect: Option<Vec<String>>,
    },
    Phi {
        register: Register,
    },
    Rot {
        register: Register,
    },
    Bound {
        register: Register,
        min: f64,
        max: f64,
    },
    Flow {
        from: Option<String>,
        to: Option<String>,
    },
    Seek {
        node: Option<String>,
        register: Register,
    },
    Spiral {
        increment: u32,
        register: Register,
    },
    Cycle {
        count: u32,
        start: usize,
        end: usize,
    },
    Forge {
        id: Option<String>,
        connect: Vec<String>,
    },
    Sync {
        local: f64,
        remote: f64,
    },
    Mask {
        node: Option<String>,
        register: Register,
    },
    Cryst {
        node: Option<String>,
    },
    Spec,
    Bloom,
    Save {
        path: Option<PathBuf>,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Init { .. } => Opcode::Init,
            Instruction::Mesh { .. } => Opcode::Mesh,
            Instruction::Phi { .. } => Opcode::Phi,
            Instruction::Rot { .. } => Opcode::Rot,
            Instruction::Bound { .. } => Opcode::Bound,
            Instruction::Flow { .. } => Opcode::Flow,
            Instruction::Seek { .. } => Opcode::Seek,
            Instruction::Spiral { .. } => Opcode::Spiral,
            Instruction::Cycle { .. } => Opcode::Cycle,
            Instruction::Forge { .. } => Opcode::Forge,
            Instruction::Sync { .. } => Opcode::Sync,
            Instruction::Mask { .. } => Opcode::Mask,
            Instruction::Cryst { .. } => Opcode::Cryst,
            Instruction::Spec => Opcode::Spec,
            Instruction::Bloom => Opcode::Bloom,
            Instruction::Save { .. } => Opcode::Save,
        }
    }

    /// The instruction an empty argument map produces.
    pub fn default_for(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Init => Instruction::Init { mesh: false },
            Opcode::Mesh => Instruction::Mesh {
                id: None,
                connect: None,
            },
            Opcode::Phi => Instruction::Phi {
                register: Register::A,
            },
            Opcode::Rot => Instruction::Rot {
                register: Register::A,
            },
            Opcode::Bound => Instruction::Bound {
                register: Register::A,
                min: 0.0,
                max: TAU,
            },
            Opcode::Flow => Instruction::Flow {
                from: None,
                to: None,
            },
            Opcode::Seek => Instruction::Seek {
                node: None,
                register: Register::A,
            },
            Opcode::Spiral => Instruction::Spiral {
                increment: 1,
                register: Register::A,
            },
            Opcode::Cycle => Instruction::Cycle {
                count: 1,
                start: 0,
                end: 1,
            },
            Opcode::Forge => Instruction::Forge {
                id: None,
                connect: Vec::new(),
            },
            Opcode::Sync => Instruction::Sync {
                local: 0.0,
                remote: 0.0,
            },
            Opcode::Mask => Instruction::Mask {
                node: None,
                register: Register::A,
            },
            Opcode::Cryst => Instruction::Cryst { node: None },
            Opcode::Spec => Instruction::Spec,
            Opcode::Bloom => Instruction::Bloom,
            Opcode::Save => Instruction::Save { path: None },
        }
    }

    /// Parse an argument map; unknown keys are ignored.
    pub fn from_args(opcode: Opcode, args: &ArgMap) -> VmResult<Self> {
        let args = Args { opcode, map: args };
        let instruction = match opcode {
            Opcode::Init => Instruction::Init {
                mesh: args.bool("mesh")?.unwrap_or(false),
            },
            Opcode::Mesh => Instruction::Mesh {
                id: args.string("id")?,
                connect: args.strings("connect")?,
            },
            Opcode::Phi => Instruction::Phi {
                register: args.register()?,
            },
            Opcode::Rot => Instruction::Rot {
                register: args.register()?,
            },
            Opcode::Bound => Instruction::Bound {
                register: args.register()?,
                min: args.float("min")?.unwrap_or(0.0),
                max: args.float("max")?.unwrap_or(TAU),
            },
            Opcode::Flow => Instruction::Flow {
                from: args.string("from")?,
                to: args.string("to")?,
            },
            Opcode::Seek => Instruction::Seek {
                node: args.string("node")?,
                register: args.register()?,
            },
            Opcode::Spiral => Instruction::Spiral {
                increment: args.count("increment")?.unwrap_or(1),
                register: args.register()?,
            },
            Opcode::Cycle => Instruction::Cycle {
                count: args.count("count")?.unwrap_or(1),
                start: args.index("start")?.unwrap_or(0),
                end: args.index("end")?.unwrap_or(1),
            },
            Opcode::Forge => Instruction::Forge {
                id: args.string("id")?,
                connect: args.strings("connect")?.unwrap_or_default(),
            },
            Opcode::Sync => Instruction::Sync {
                local: args.float("local")?.unwrap_or(0.0),
                remote: args.float("remote")?.unwrap_or(0.0),
            },
            Opcode::Mask => Instruction::Mask {
                node: args.string("node")?,
                register: args.register()?,
            },
            Opcode::Cryst => Instruction::Cryst {
                node: args.string("node")?,
            },
            Opcode::Spec => Instruction::Spec,
            Opcode::Bloom => Instruction::Bloom,
            Opcode::Save => Instruction::Save {
                path: args.string("path")?.map(PathBuf::from),
            },
        };
        Ok(instruction)
    }

    /// Parse an argument map together with its `fork` flag, which every
    /// opcode accepts.
    pub fn parse_step(opcode: Opcode, args: &ArgMap) -> VmResult<(Self, bool)> {
        let fork = Args { opcode, map: args }.bool("fork")?.unwrap_or(false);
        Ok((Self::from_args(opcode, args)?, fork))
    }
}

struct Args<'a> {
    opcode: Opcode,
    map: &'a ArgMap,
}

impl Args<'_> {
    fn invalid(&self, key: &str, reason: impl Into<String>) -> VmError {
        VmError::InvalidArgument {
            opcode: self.opcode,
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn bool(&self, key: &str) -> VmResult<Option<bool>> {
        self.value(key)
            .map(|v| v.as_bool().ok_or_else(|| self.invalid(key, "expected a boolean")))
            .transpose()
    }

    fn float(&self, key: &str) -> VmResult<Option<f64>> {
        self.value(key)
            .map(|v| v.as_f64().ok_or_else(|| self.invalid(key, "expected a number")))
            .transpose()
    }

    fn unsigned(&self, key: &str) -> VmResult<Option<u64>> {
        self.value(key)
            .map(|v| {
                v.as_u64()
                    .ok_or_else(|| self.invalid(key, "expected a non-negative integer"))
            })
            .transpose()
    }

    fn count(&self, key: &str) -> VmResult<Option<u32>> {
        self.unsigned(key)?
            .map(|v| u32::try_from(v).map_err(|_| self.invalid(key, "count does not fit in 32 bits")))
            .transpose()
    }

    fn index(&self, key: &str) -> VmResult<Option<usize>> {
        self.unsigned(key)?
            .map(|v| usize::try_from(v).map_err(|_| self.invalid(key, "index out of range")))
            .transpose()
    }

    fn string(&self, key: &str) -> VmResult<Option<String>> {
        self.value(key)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(key, "expected a string"))
            })
            .transpose()
    }

    /// A list of strings; a bare string is accepted as a one-element list.
    fn strings(&self, key: &str) -> VmResult<Option<Vec<String>>> {
        let Some(value) = self.value(key) else {
            return Ok(None);
        };
        match value {
            Value::String(s) => Ok(Some(vec![s.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "expected a list of strings"))
                })
                .collect::<VmResult<Vec<_>>>()
                .map(Some),
            _ => Err(self.invalid(key, "expected a list of strings")),
        }
    }

    fn register(&self) -> VmResult<Register> {
        match self.string("register")? {
            Some(name) => name
                .parse()
                .map_err(|reason: String| self.invalid("register", reason)),
            None => Ok(Register::A),
        }
    }
}
