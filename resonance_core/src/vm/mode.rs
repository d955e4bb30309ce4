use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Side-effect visibility of a run.
///
/// SIMULATE and TRACE keep every change in memory; only EXECUTE lets the SAVE
/// opcode write. ARM is entered by self-audit after repeated faults with a
/// collapsed mesh, FORK by forking instructions when fork tracking is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    #[default]
    Simulate,
    Trace,
    Execute,
    Arm,
    Fork,
}

impl ExecutionMode {
    pub fn name(self) -> &'static str {
        match self {
            ExecutionMode::Simulate => "SIMULATE",
            ExecutionMode::Trace => "TRACE",
            ExecutionMode::Execute => "EXECUTE",
            ExecutionMode::Arm => "ARM",
            ExecutionMode::Fork => "FORK",
        }
    }

    pub fn allows_durable_writes(self) -> bool {
        matches!(self, ExecutionMode::Execute)
    }

    pub fn narrates(self) -> bool {
        matches!(self, ExecutionMode::Trace)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIMULATE" => Ok(ExecutionMode::Simulate),
            "TRACE" => Ok(ExecutionMode::Trace),
            "EXECUTE" => Ok(ExecutionMode::Execute),
            "ARM" => Ok(ExecutionMode::Arm),
            "FORK" => Ok(ExecutionMode::Fork),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_simulate() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Simulate);
    }

    #[test]
    fn only_execute_writes() {
        for mode in [
            ExecutionMode::Simulate,
            ExecutionMode::Trace,
            ExecutionMode::Arm,
            ExecutionMode::Fork,
        ] {
            assert!(!mode.allows_durable_writes());
        }
        assert!(ExecutionMode::Execute.allows_durable_writes());
    }

    #[test]
    fn parses_names() {
        assert_eq!("execute".parse::<ExecutionMode>(), Ok(ExecutionMode::Execute));
        assert!("turbo".parse::<ExecutionMode>().is_err());
    }
}
