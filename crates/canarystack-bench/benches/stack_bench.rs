//! Push/pop throughput with every detector on versus every detector off.

use canarystack_membrane::{GuardedStack, LogSink, StackConfig};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn stack(config: StackConfig) -> GuardedStack<u64> {
    GuardedStack::constructed_in(config, Default::default(), LogSink::Null).expect("construct")
}

/// Both presets, plus whatever `CANARYSTACK_MODE` selects.
fn presets() -> [(&'static str, StackConfig); 3] {
    [
        ("full", StackConfig::full_debug()),
        ("release", StackConfig::release()),
        ("env", StackConfig::from_env()),
    ]
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");
    for (name, config) in presets() {
        for n in [16_u64, 256] {
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, &n| {
                let mut s = stack(config);
                b.iter(|| {
                    for i in 0..n {
                        s.push(i).expect("push");
                    }
                    for _ in 0..n {
                        criterion::black_box(s.pop().expect("pop"));
                    }
                });
            });
        }
    }
    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_from_empty");
    for (name, config) in presets() {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut s = stack(config);
                for i in 0..1_024 {
                    s.push(i).expect("push");
                }
                criterion::black_box(s.capacity())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_growth);
criterion_main!(benches);
