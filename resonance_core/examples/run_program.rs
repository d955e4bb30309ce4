//! Run a JSON program through the resonance VM and print what it left behind.
//!
//! Usage: cargo run --example run_program -- [program.json] [vm.toml]

use std::path::Path;

use anyhow::{Context, Result};
use resonance_vm_core::{ExecutionMode, Program, ResonanceVm, VmConfig};
use tracing_subscriber::EnvFilter;

const DEMO_PROGRAM: &str = r#"[
    ["INIT", {"mesh": true}],
    ["MESH", {}],
    ["PHI", {"register": "B"}],
    ["FORGE", {"connect": ["origin"]}],
    ["CYCLE", {"count": 2, "start": 1, "end": 3}],
    ["SPIRAL", {"increment": 2}],
    ["FLOW", {}],
    ["SYNC", {"local": 0.8, "remote": 0.82}],
    ["SEEK", {"node": "missing"}],
    ["BLOOM"],
    ["SPEC"]
]"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let program_text = match args.next() {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading program {path}"))?,
        None => DEMO_PROGRAM.to_string(),
    };
    let config = load_config(args.next().as_deref())?;

    let program = Program::from_json(&program_text).context("parsing program")?;
    let mut vm = ResonanceVm::with_config(config);
    let summary = vm
        .execute(program, ExecutionMode::Simulate)
        .context("running program")?;

    println!(
        "Ran {} instructions ({} faults), mode {}, mesh resonance {:.4}",
        summary.instructions, summary.faults, summary.mode, summary.final_resonance
    );
    for entry in vm.resonance_log() {
        println!(
            "  {:<6} {:.4} -> {:.4} ({:+.4})",
            entry.op, entry.pre_resonance, entry.post_resonance, entry.delta
        );
    }
    for node in vm.mesh().nodes() {
        println!("  node {:<8} {} -> {:?}", node.id, node.vector, node.connections);
    }
    for entry in vm.error_mansion() {
        println!("  mansion {:?}: {}", entry.kind, entry.lesson);
    }
    println!("Crystal written to {}", summary.crystal_path.display());
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<VmConfig> {
    match path {
        Some(path) => VmConfig::load_from_file(Path::new(path))
            .with_context(|| format!("loading config {path}")),
        None => Ok(VmConfig::default()),
    }
}
