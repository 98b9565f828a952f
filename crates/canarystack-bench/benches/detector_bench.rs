//! Cost of a single health check per detector, on a 1024-element stack.

use canarystack_membrane::{ChecksumKind, GuardedStack, LogSink, StackConfig};
use criterion::{Criterion, criterion_group, criterion_main};

fn filled(config: StackConfig) -> GuardedStack<u64> {
    let mut s = GuardedStack::constructed_in(config, Default::default(), LogSink::Null)
        .expect("construct");
    for i in 0..1_024 {
        s.push(i).expect("push");
    }
    s
}

fn only(tweak: impl FnOnce(&mut StackConfig)) -> StackConfig {
    let mut config = StackConfig::release();
    tweak(&mut config);
    config
}

fn bench_health_check(c: &mut Criterion) {
    let cases = [
        ("none", StackConfig::release()),
        ("canaries", only(|c| c.canaries = true)),
        ("poison", only(|c| c.poison = true)),
        ("struct_crc32", only(|c| c.struct_checksum = true)),
        ("data_crc32", only(|c| c.data_checksum = true)),
        (
            "data_blake3",
            only(|c| {
                c.data_checksum = true;
                c.checksum_kind = ChecksumKind::Blake3;
            }),
        ),
        ("os_checks", only(|c| c.os_checks = true)),
        ("full", StackConfig::full_debug()),
    ];
    let mut group = c.benchmark_group("health_check");
    for (name, config) in cases {
        let mut s = filled(config);
        group.bench_function(name, |b| {
            b.iter(|| criterion::black_box(s.health_check()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_health_check);
criterion_main!(benches);
