//! VM configuration management via TOML files.
//!
//! The `[vm]` table carries the run flags read once at the start of every
//! execution. Missing keys fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use resonance_shared::PHI;
use serde::{Deserialize, Serialize};

/// Default crystal file written by SAVE and at the end of every run.
pub const DEFAULT_CRYSTAL_PATH: &str = "TVM.crystal.json";

/// Run flags for the resonance VM.
///
/// # Examples
///
/// ```
/// use resonance_vm_core::VmConfig;
///
/// let config = VmConfig::from_str("[vm]\nnarrative_mode = true").unwrap();
/// assert!(config.narrative_mode);
/// assert!(!config.fork_tracking);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmConfig {
    /// SAVE never writes, even in EXECUTE mode.
    pub dry_run: bool,
    /// Promote SIMULATE to TRACE and narrate every instruction.
    pub narrative_mode: bool,
    /// Instructions carrying `fork = true` enter FORK mode.
    pub fork_tracking: bool,
    /// SYNC scores at or above this emit a `resonance_threshold` event.
    pub resonance_threshold: f64,
    /// Crystal file used by SAVE and the end-of-run snapshot.
    pub crystal_path: PathBuf,
    /// Node budget; creating a node beyond it aborts the run.
    pub max_mesh_nodes: usize,
}

impl VmConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::try_from(raw.vm)
    }

    /// Same flags, different crystal file.
    pub fn with_crystal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.crystal_path = path.into();
        self
    }

    fn try_from(raw: RawVmConfig) -> Result<Self, ConfigError> {
        if !raw.resonance_threshold.is_finite()
            || raw.resonance_threshold < 0.0
            || raw.resonance_threshold > PHI
        {
            return Err(ConfigError::Parse(
                "vm.resonance_threshold must lie within [0, φ]".into(),
            ));
        }
        if raw.max_mesh_nodes == 0 {
            return Err(ConfigError::Parse("vm.max_mesh_nodes must be ≥ 1".into()));
        }
        if raw.crystal_path.trim().is_empty() {
            return Err(ConfigError::Parse("vm.crystal_path must not be empty".into()));
        }

        Ok(Self {
            dry_run: raw.dry_run,
            narrative_mode: raw.narrative_mode,
            fork_tracking: raw.fork_tracking,
            resonance_threshold: raw.resonance_threshold,
            crystal_path: PathBuf::from(raw.crystal_path),
            max_mesh_nodes: raw.max_mesh_nodes,
        })
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            narrative_mode: false,
            fork_tracking: false,
            resonance_threshold: default_resonance_threshold(),
            crystal_path: PathBuf::from(DEFAULT_CRYSTAL_PATH),
            max_mesh_nodes: default_max_mesh_nodes(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    vm: RawVmConfig,
}

#[derive(Debug, Deserialize)]
struct RawVmConfig {
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    narrative_mode: bool,
    #[serde(default)]
    fork_tracking: bool,
    #[serde(default = "default_resonance_threshold")]
    resonance_threshold: f64,
    #[serde(default = "default_crystal_path")]
    crystal_path: String,
    #[serde(default = "default_max_mesh_nodes")]
    max_mesh_nodes: usize,
}

impl Default for RawVmConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            narrative_mode: false,
            fork_tracking: false,
            resonance_threshold: default_resonance_threshold(),
            crystal_path: default_crystal_path(),
            max_mesh_nodes: default_max_mesh_nodes(),
        }
    }
}

fn default_resonance_threshold() -> f64 {
    0.95
}

fn default_crystal_path() -> String {
    DEFAULT_CRYSTAL_PATH.to_string()
}

fn default_max_mesh_nodes() -> usize {
    4096
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_section_missing() {
        let config = VmConfig::from_str("[other]\nkey = 1").unwrap();
        assert_eq!(config, VmConfig::default());
        assert_eq!(config.crystal_path, PathBuf::from("TVM.crystal.json"));
    }

    #[test]
    fn parses_custom_values() {
        let toml = "[vm]\ndry_run = true\nnarrative_mode = true\nfork_tracking = true\nresonance_threshold = 0.5\ncrystal_path = \"out/state.json\"\nmax_mesh_nodes = 12";
        let config = VmConfig::from_str(toml).unwrap();
        assert!(config.dry_run);
        assert!(config.narrative_mode);
        assert!(config.fork_tracking);
        assert!((config.resonance_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.crystal_path, PathBuf::from("out/state.json"));
        assert_eq!(config.max_mesh_nodes, 12);
    }

    #[test]
    fn rejects_threshold_above_phi() {
        let result = VmConfig::from_str("[vm]\nresonance_threshold = 2.0");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_zero_node_budget() {
        assert!(VmConfig::from_str("[vm]\nmax_mesh_nodes = 0").is_err());
    }

    #[test]
    fn rejects_wrongly_typed_flag() {
        assert!(VmConfig::from_str("[vm]\ndry_run = \"yes\"").is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let config = VmConfig::from_str(include_str!("../config/vm.toml")).unwrap();
        assert_eq!(config.crystal_path, PathBuf::from("TVM.crystal.json"));
        assert!(!config.dry_run);
    }
}
