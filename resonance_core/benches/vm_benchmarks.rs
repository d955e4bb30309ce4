//! Executor throughput and mesh-wide resonance scoring.
//!
//! Run with: cargo bench --bench vm_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resonance_vm_core::{
    mesh_resonance, Instruction, Mesh, MeshNode, Program, Register, ResonanceVm, SpiralVector,
    StackInstruction, StackVm, VmConfig,
};
use serde_json::json;

fn random_mesh(nodes: usize, rng: &mut StdRng) -> Mesh {
    (0..nodes)
        .map(|i| {
            let vector = SpiralVector::new(rng.gen(), rng.gen(), rng.gen(), rng.gen());
            let mut node = MeshNode::new(format!("n{i}"), vector);
            if i > 0 {
                node.connect(format!("n{}", i - 1));
                node.connect(format!("n{}", rng.gen_range(0..i)));
            }
            node
        })
        .collect()
}

fn bench_mesh_resonance(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("mesh_resonance");
    for size in [16usize, 256, 4096] {
        let mesh = random_mesh(size, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(size), &mesh, |b, mesh| {
            b.iter(|| black_box(mesh_resonance(mesh)));
        });
    }
    group.finish();
}

fn bench_executor(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = VmConfig::default().with_crystal_path(dir.path().join("bench.json"));

    let mut instructions = vec![Instruction::Init { mesh: true }];
    for _ in 0..32 {
        instructions.push(Instruction::Mesh {
            id: None,
            connect: None,
        });
        instructions.push(Instruction::Rot {
            register: Register::A,
        });
        instructions.push(Instruction::Flow {
            from: None,
            to: None,
        });
    }
    instructions.push(Instruction::Spec);
    let program = Program::new(instructions);

    c.bench_function("execute_98_instructions", |b| {
        b.iter(|| {
            let mut vm = ResonanceVm::with_config(config.clone());
            black_box(vm.run(program.clone()).expect("run"));
        });
    });
}

fn bench_stack(c: &mut Criterion) {
    let row: Vec<f64> = (0..64).map(f64::from).collect();
    let grid = json!(vec![row; 64]);
    let push = StackInstruction::parse("PUSH", Some(&grid)).expect("tensor");
    let program = vec![
        push.clone(),
        push,
        StackInstruction::TAdd,
        StackInstruction::TSum,
    ];

    c.bench_function("stack_t_add_64x64", |b| {
        let mut vm = StackVm::new();
        b.iter(|| black_box(vm.execute(&program).expect("stack run")));
    });
}

criterion_group!(benches, bench_mesh_resonance, bench_executor, bench_stack);
criterion_main!(benches);
