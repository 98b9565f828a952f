use canarystack_membrane::{GuardedStack, LogSink, StackConfig, StackError, Status, SystemAllocator};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

fn stack_with(config: StackConfig) -> GuardedStack<i64> {
    GuardedStack::constructed_in(config, SystemAllocator, LogSink::Null).expect("construct")
}

fn configs() -> [(&'static str, StackConfig); 4] {
    [
        ("full", StackConfig::full_debug()),
        ("release", StackConfig::release()),
        (
            "full+shrink",
            StackConfig {
                auto_shrink: true,
                ..StackConfig::full_debug()
            },
        ),
        (
            "blake3",
            StackConfig {
                checksum_kind: canarystack_membrane::ChecksumKind::Blake3,
                growth_factor: 2.0,
                shrink_factor: 4.0,
                ..StackConfig::full_debug()
            },
        ),
    ]
}

#[test]
fn random_push_pop_sequences_match_reference_stack() {
    // Deterministic invariant pressure; the fuzz crate covers arbitrary input.
    const SEEDS: [u64; 4] = [1, 2, 3, 4];
    const STEPS: usize = 2_000;

    for (name, config) in configs() {
        for seed in SEEDS {
            let mut stack = stack_with(config);
            let mut reference: Vec<i64> = Vec::new();
            let mut rng = XorShift64::new(seed);

            for step in 0..STEPS {
                // Bias towards pushes so the buffer grows through several sizes.
                if rng.gen_range_usize(0, 9) < 6 {
                    let value = rng.next_u64() as i64;
                    stack.push(value).expect("push");
                    reference.push(value);
                } else {
                    match reference.pop() {
                        Some(expected) => assert_eq!(
                            stack.pop(),
                            Ok(expected),
                            "{name} seed={seed} step={step}"
                        ),
                        None => assert_eq!(
                            stack.pop(),
                            Err(StackError::EmptyPop),
                            "{name} seed={seed} step={step}"
                        ),
                    }
                }
                assert_eq!(stack.len(), reference.len(), "{name} seed={seed} step={step}");
                assert!(stack.len() <= stack.capacity());
            }

            assert_eq!(stack.status(), Status::OK, "{name} seed={seed}");
            assert_eq!(stack.elements(), Some(reference.clone()), "{name} seed={seed}");
            while let Some(expected) = reference.pop() {
                assert_eq!(stack.pop(), Ok(expected));
            }
            assert_eq!(stack.destroy(), Status::OK, "{name} seed={seed}");
        }
    }
}

#[test]
fn health_check_between_operations_never_changes_state() {
    let mut stack = stack_with(StackConfig::full_debug());
    let mut rng = XorShift64::new(0xC0FFEE);
    for _ in 0..300 {
        let value = rng.next_u64() as i64;
        stack.push(value).expect("push");
        let snapshot = (stack.len(), stack.capacity(), stack.checksums());
        assert_eq!(stack.health_check(), Status::OK);
        assert_eq!(stack.health_check(), Status::OK);
        assert_eq!((stack.len(), stack.capacity(), stack.checksums()), snapshot);
    }
}

#[test]
fn growth_never_loses_or_reorders() {
    let mut stack = stack_with(StackConfig::full_debug());
    assert_eq!(stack.capacity(), 2);
    let mut capacities = vec![stack.capacity()];
    for v in 0..5 {
        stack.push(v).expect("push");
        assert_eq!(stack.health_check(), Status::OK);
        capacities.push(stack.capacity());
    }
    assert!(capacities.windows(2).all(|w| w[0] <= w[1]));
    assert!(capacities.last() > capacities.first());
    assert_eq!(stack.elements(), Some(vec![0, 1, 2, 3, 4]));
}

#[test]
fn push_then_pop_restores_length_and_capacity() {
    let mut stack = stack_with(StackConfig::full_debug());
    let mut rng = XorShift64::new(7);
    for _ in 0..50 {
        stack.push(rng.next_u64() as i64).expect("push");
        let before = (stack.len(), stack.capacity());
        let x = rng.next_u64() as i64;
        stack.push(x).expect("push");
        assert_eq!(stack.pop(), Ok(x));
        let after = (stack.len(), stack.capacity());
        assert_eq!(after.0, before.0);
        // Growth may have happened on the push; without auto-shrink it stays.
        assert!(after.1 >= before.1);
    }
}
