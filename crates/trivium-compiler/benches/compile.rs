use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trivium_compiler::{compile, Limits, Machine};
use trivium_parser::ast::Expr;

/// `n` globals updated inside a loop, plus a function applied to them.
fn program(n: usize) -> String {
    let mut source = String::new();
    for i in 0..n {
        source.push_str(&format!("v{} := {}; ", i, i));
    }
    source.push_str("sq := x -> x * x; loop 10 do (");
    for i in 0..n {
        source.push_str(&format!("v{i} := sq(v{i}) / (v{i} + 1); "));
    }
    source.push_str("0); v0");
    source
}

fn parsed(n: usize) -> Expr {
    trivium_parser::parse(&program(n)).unwrap()
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for size in [10, 100] {
        let expr = parsed(size);
        for machine in Machine::ALL {
            group.bench_with_input(BenchmarkId::new(machine.name(), size), &expr, |b, expr| {
                b.iter(|| compile(black_box(expr), machine).unwrap());
            });
        }
    }
    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    let expr = parsed(100);
    for machine in Machine::ALL {
        let program = compile(&expr, machine).unwrap();
        group.bench_function(machine.name(), |b| {
            b.iter(|| black_box(&program).assemble());
        });
    }
    group.finish();
}

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    let expr = parsed(10);
    for machine in Machine::ALL {
        let program = compile(&expr, machine).unwrap();
        group.bench_function(machine.name(), |b| {
            b.iter(|| black_box(&program).simulate(Limits::default()).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_assemble, bench_simulate);
criterion_main!(benches);
