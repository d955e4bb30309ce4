use resonance_vm_core::{
    ExecutionMode, JsonlEventLog, MansionKind, MemoryEventLog, Program, Register, ResonanceVm,
    SpiralVector, VmConfig, VmError, PHI,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn temp_config() -> (TempDir, VmConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = VmConfig::default().with_crystal_path(dir.path().join("run.crystal.json"));
    (dir, config)
}

fn program(value: Value) -> Program {
    Program::from_json(&value.to_string()).expect("valid program")
}

fn count(events: &[String], kind: &str) -> usize {
    events.iter().filter(|e| e.as_str() == kind).count()
}

#[test]
fn narrative_mode_promotes_simulate_to_trace() {
    let (_dir, mut config) = temp_config();
    config.narrative_mode = true;
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());

    vm.run(program(json!([["INIT"], ["ROT"], ["SPEC"]])))
        .expect("run completes");

    assert_eq!(vm.mode(), ExecutionMode::Trace);
    assert_eq!(count(&log.event_types(), "op_narrative"), 3);
    let first = &log.entries()[0];
    assert_eq!(first.payload["op"], "INIT");
    assert_eq!(first.payload["ip"], 0);
}

#[test]
fn plain_simulate_is_silent() {
    let (_dir, config) = temp_config();
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());
    vm.run(program(json!([["INIT"], ["ROT"]]))).expect("run completes");
    assert!(log.is_empty());
    assert_eq!(vm.mode(), ExecutionMode::Simulate);
}

#[test]
fn save_writes_only_in_execute_without_dry_run() {
    let (dir, config) = temp_config();
    let target = dir.path().join("explicit/save.json");
    let save = json!([["INIT", {"mesh": true}], ["SAVE", {"path": target}]]);

    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config.clone()).with_event_sink(log.clone());
    vm.run(program(save.clone())).expect("simulate run");
    assert!(!target.exists());
    assert_eq!(count(&log.event_types(), "save_skipped"), 1);

    let mut dry = config.clone();
    dry.dry_run = true;
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(dry).with_event_sink(log.clone());
    vm.execute(program(save.clone()), ExecutionMode::Execute)
        .expect("dry run");
    assert!(!target.exists());
    let events = log.event_types();
    assert_eq!(count(&events, "save_skipped"), 1);
    assert_eq!(count(&events, "op_narrative"), 2);

    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());
    vm.execute(program(save), ExecutionMode::Execute)
        .expect("execute run");
    assert!(target.exists());
    assert_eq!(count(&log.event_types(), "crystal_saved"), 1);

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&target).expect("read")).expect("json");
    assert!(written["mesh"]["origin"]["vector"].is_array());
}

#[test]
fn failing_save_opcode_is_recovered() {
    let (dir, config) = temp_config();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");

    let mut vm = ResonanceVm::with_config(config);
    let summary = vm
        .execute(
            program(json!([["SAVE", {"path": blocker.join("crystal.json")}], ["INIT"]])),
            ExecutionMode::Execute,
        )
        .expect("opcode faults do not abort");

    assert_eq!(summary.faults, 1);
    assert_eq!(vm.error_mansion().len(), 1);
    assert!(vm.handler().errors()[0].error.contains("crystal write failed"));
    assert_eq!(vm.resonance_log().len(), 2);
}

#[test]
fn failing_end_of_run_save_reaches_the_caller() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").expect("write blocker");
    let config = VmConfig::default().with_crystal_path(blocker.join("run.json"));

    let mut vm = ResonanceVm::with_config(config);
    let err = vm.run(program(json!([["INIT"]]))).unwrap_err();
    assert!(matches!(err, VmError::Persistence(_)));
    assert_eq!(vm.resonance_log().len(), 1);
}

#[test]
fn fork_tracking_counts_forking_instructions() {
    let (_dir, mut config) = temp_config();
    let forks = json!([
        ["FORGE", {"fork": true}],
        ["FORGE"],
        ["FORGE", {"fork": true}]
    ]);

    let mut vm = ResonanceVm::with_config(config.clone());
    vm.run(program(forks.clone())).expect("untracked run");
    assert_eq!(vm.fork_count(), 0);
    assert_eq!(vm.mode(), ExecutionMode::Simulate);
    assert_eq!(vm.mesh().len(), 3);

    config.fork_tracking = true;
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());
    vm.run(program(forks)).expect("tracked run");
    assert_eq!(vm.fork_count(), 2);
    assert_eq!(vm.forks(), &[1, 2]);
    assert_eq!(vm.mode(), ExecutionMode::Fork);
    assert_eq!(count(&log.event_types(), "fork"), 2);
}

#[test]
fn fork_flag_is_honoured_on_any_opcode() {
    let (_dir, mut config) = temp_config();
    config.fork_tracking = true;
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["SYNC", {"local": 0.1, "remote": 0.2, "fork": true}],
        ["ROT"],
        ["CYCLE", {"count": 1, "fork": true}]
    ])))
    .expect("tracked run");

    assert_eq!(vm.fork_count(), 2);
    assert_eq!(vm.forks(), &[1, 2]);
    assert_eq!(vm.mode(), ExecutionMode::Fork);
}

#[test]
fn spark_words_run_like_opcode_names() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([["ignition", {"mesh": true}], ["arm", {"id": "armed"}], ["spin-up"]])))
        .expect("run completes");

    assert_eq!(vm.mesh().len(), 2);
    assert!(vm.mesh().get("armed").is_some());
    assert_eq!(vm.spiral_depth(), 1);
    let ops: Vec<_> = vm.resonance_log().iter().map(|e| e.op.as_str()).collect();
    assert_eq!(ops, ["INIT", "MESH", "SPIRAL"]);
}

#[test]
fn collapsed_mesh_with_many_errors_enters_arm() {
    let (_dir, config) = temp_config();
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());

    let mut steps = vec![
        json!(["INIT", {"mesh": true}]),
        json!(["BOUND", {"min": 0.0, "max": 0.0}]),
        json!(["MESH", {"id": "void", "connect": ["origin"]}]),
        json!(["SPIRAL", {"increment": 1}]),
    ];
    steps.extend((0..12).map(|_| json!(["SEEK", {"node": "ghost"}])));
    vm.run(program(Value::Array(steps))).expect("run completes");

    assert!(vm.mesh_resonance() < resonance_vm_core::PHI_INV);
    assert_eq!(vm.mode(), ExecutionMode::Arm);
    assert!(vm.error_mansion().len() > 10);
    let collapses = vm
        .error_mansion()
        .iter()
        .filter(|entry| entry.kind == MansionKind::ResonanceCollapse)
        .count();
    assert_eq!(collapses, 13);
    let events = log.event_types();
    assert_eq!(count(&events, "arm_entered"), 1);
    assert_eq!(count(&events, "resonance_collapse"), 13);
}

#[test]
fn healthy_mesh_never_collapses() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["MESH"],
        ["SPIRAL", {"increment": 1}],
        ["SPEC"],
        ["SPEC"]
    ])))
    .expect("run completes");
    assert!(vm.error_mansion().is_empty());
    assert_eq!(vm.mode(), ExecutionMode::Simulate);
}

#[test]
fn node_budget_aborts_the_run() {
    let (dir, mut config) = temp_config();
    config.max_mesh_nodes = 2;
    let mut vm = ResonanceVm::with_config(config);

    let err = vm
        .run(program(json!([
            ["INIT", {"mesh": true}],
            ["MESH"],
            ["MESH"],
            ["SPEC"]
        ])))
        .unwrap_err();

    assert!(matches!(err, VmError::CapacityExceeded { current: 2, max: 2 }));
    assert_eq!(vm.mesh().len(), 2);
    assert_eq!(vm.resonance_log().len(), 3);
    assert_eq!(vm.ip(), 3);
    assert!(!dir.path().join("run.crystal.json").exists());
}

#[test]
fn updating_an_existing_node_ignores_the_budget() {
    let (_dir, mut config) = temp_config();
    config.max_mesh_nodes = 1;
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["ROT"],
        ["MESH", {"id": "origin", "connect": ["elsewhere"]}]
    ])))
    .expect("update stays within budget");

    let origin = vm.mesh().get("origin").expect("origin");
    assert_eq!(origin.vector, vm.register(Register::A));
    assert!(origin.is_connected_to("elsewhere"));
}

#[test]
fn sync_rescores_nodes_and_reports_threshold() {
    let (_dir, config) = temp_config();
    let log = MemoryEventLog::new();
    let mut vm = ResonanceVm::with_config(config).with_event_sink(log.clone());
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["BOUND", {"min": 0.0, "max": 0.0}],
        ["SYNC", {"local": 0.5, "remote": 0.5}],
        ["SYNC", {"local": 0.0, "remote": 3.0}]
    ])))
    .expect("run completes");

    // Register A is zero, so every node rescored to zero.
    assert_eq!(vm.mesh().get("origin").expect("origin").resonance, 0.0);
    let events = log.entries();
    let hits: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == "resonance_threshold")
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload["score"], 1.0);
}

#[test]
fn flow_blends_target_toward_source() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["BOUND", {"min": 0.0, "max": 0.0}],
        ["MESH", {"id": "sink"}],
        ["FLOW"]
    ])))
    .expect("run completes");

    let origin = vm.mesh().get("origin").expect("origin");
    let sink = vm.mesh().get("sink").expect("sink");
    assert_eq!(sink.vector, SpiralVector::seed().scaled(0.5));
    assert!(origin.is_connected_to("sink"));
    assert!(sink.is_connected_to("origin"));
}

#[test]
fn mask_swaps_node_and_register() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["PHI"],
        ["MASK"]
    ])))
    .expect("run completes");

    let seed = SpiralVector::seed();
    assert_eq!(vm.register(Register::A), seed);
    assert_eq!(
        vm.mesh().get("origin").expect("origin").vector,
        seed.scaled(PHI).wrapped()
    );
}

#[test]
fn seek_copies_node_vectors() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["ROT"],
        ["MESH", {"id": "turned"}],
        ["INIT"],
        ["SEEK", {"node": "turned", "register": "C"}],
        ["ROT", {"register": "B"}],
        ["SEEK", {"register": "B"}]
    ])))
    .expect("run completes");

    let turned = vm.mesh().get("turned").expect("turned").vector;
    assert_eq!(vm.register(Register::C), turned);
    assert_eq!(vm.register(Register::A), SpiralVector::seed());
    let b = vm.register(Register::B);
    assert!(vm.mesh().nodes().any(|node| node.vector == b));
}

#[test]
fn seek_on_an_empty_mesh_faults() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([["SEEK"]]))).expect("run completes");
    assert!(vm.handler().errors()[0]
        .error
        .contains("requires a non-empty mesh"));
}

#[test]
fn cryst_spec_and_bloom() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([
        ["INIT", {"mesh": true}],
        ["SPIRAL", {"increment": 3}],
        ["CRYST"],
        ["SEEK", {"node": "ghost"}],
        ["BLOOM"],
        ["SPEC"]
    ])))
    .expect("run completes");

    let a = vm.register(Register::A);
    let memory = &vm.mesh().get("origin").expect("origin").memory;
    assert_eq!(memory["crystal"], json!(a.to_array()));
    assert_eq!(memory["crystal_depth"], json!(3));

    let mansion = vm.error_mansion();
    assert_eq!(mansion[0].kind, MansionKind::Exception);
    assert_eq!(mansion[0].vector, a);
    let c = vm.register(Register::C);
    assert_eq!(c, a.rotated());

    let d = vm.register(Register::D);
    assert_eq!(d.pace, a.magnitude());
    assert_eq!(d.rate, vm.register(Register::B).magnitude());
    assert_eq!(d.state, c.magnitude());
    assert_eq!(d.spin, vm.mesh_resonance());
}

#[test]
fn bloom_without_errors_is_a_no_op() {
    let (_dir, config) = temp_config();
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([["INIT"], ["BLOOM"]]))).expect("run completes");
    assert!(vm.register(Register::C).is_zero());
    assert!(!vm.handler().suggest_bloom_patch());
}

#[test]
fn jsonl_sink_writes_one_line_per_event() {
    let (dir, mut config) = temp_config();
    config.narrative_mode = true;
    let path = dir.path().join("logs/events.jsonl");
    let mut vm = ResonanceVm::with_config(config).with_event_sink(JsonlEventLog::new(&path));
    vm.run(program(json!([["INIT"], ["SPEC"]]))).expect("run completes");

    let text = std::fs::read_to_string(&path).expect("event log");
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line["event_type"] == "op_narrative"));
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let crystal = dir.path().join("from_config.json");
    let config_path = dir.path().join("vm.toml");
    std::fs::write(
        &config_path,
        format!(
            "[vm]\nfork_tracking = true\ncrystal_path = {:?}\n",
            crystal.display().to_string()
        ),
    )
    .expect("write config");

    let config = VmConfig::load_from_file(&config_path).expect("config");
    let mut vm = ResonanceVm::with_config(config);
    vm.run(program(json!([["FORGE", {"fork": true}]])))
        .expect("run completes");
    assert_eq!(vm.fork_count(), 1);
    assert!(crystal.exists());
}
