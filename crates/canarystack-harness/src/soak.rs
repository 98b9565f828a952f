//! Seeded random operation soak against a `Vec` reference model.
//!
//! Every step applies one random operation to both the guarded stack and a
//! plain `Vec`, then checks that lengths, popped values and the status agree.
//! An optional byte limit on the allocator turns growth into a recoverable
//! failure path.

use canarystack_membrane::{GuardedStack, LimitedAllocator, LogSink, StackConfig, StackError};
use serde::Serialize;

use crate::error::HarnessError;

/// Deterministic xorshift generator; the same seed replays the same run.
#[derive(Debug, Clone)]
pub struct XorShift64(u64);

impl XorShift64 {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn gen_range_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        lo + (self.next_u64() as usize) % (hi - lo)
    }
}

/// Soak parameters.
#[derive(Debug, Clone, Copy)]
pub struct SoakPlan {
    pub seed: u64,
    pub steps: usize,
    /// Byte budget for the allocator; `None` means unlimited.
    pub alloc_limit: Option<usize>,
}

/// What a finished soak did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoakReport {
    pub seed: u64,
    pub steps: usize,
    pub pushes: usize,
    pub pops: usize,
    pub empty_pops: usize,
    pub reallocations: usize,
    pub allocation_failures: usize,
    pub max_len: usize,
    pub final_len: usize,
    pub final_capacity: usize,
}

/// Run `plan` against a fresh `u64` stack.
pub fn run_soak(config: StackConfig, plan: SoakPlan) -> Result<SoakReport, HarnessError> {
    let allocator = LimitedAllocator::new(plan.alloc_limit.unwrap_or(usize::MAX));
    let mut stack: GuardedStack<u64, _> =
        GuardedStack::constructed_in(config, allocator, LogSink::Null)?;
    let mut model: Vec<u64> = Vec::new();
    let mut rng = XorShift64::new(plan.seed);
    let mut report = SoakReport {
        seed: plan.seed,
        steps: plan.steps,
        ..SoakReport::default()
    };

    for step in 0..plan.steps {
        let diverged = |detail: String| HarnessError::SoakDiverged { step, detail };
        match rng.gen_range_usize(0, 100) {
            0..=54 => {
                let value = rng.next_u64();
                match stack.push(value) {
                    Ok(()) => {
                        model.push(value);
                        report.pushes += 1;
                    }
                    Err(StackError::AllocationFailed { .. }) => report.allocation_failures += 1,
                    Err(err) => return Err(err.into()),
                }
            }
            55..=89 => match (stack.pop(), model.pop()) {
                (Ok(got), Some(want)) if got == want => report.pops += 1,
                (Err(StackError::EmptyPop), None) => report.empty_pops += 1,
                (Err(err), _) if !err.is_misuse() => return Err(err.into()),
                (got, want) => {
                    return Err(diverged(format!("pop returned {got:?}, model had {want:?}")));
                }
            },
            90..=94 => {
                let capacity = model.len() + rng.gen_range_usize(0, 16);
                match stack.reallocate(capacity) {
                    Ok(()) => report.reallocations += 1,
                    Err(StackError::AllocationFailed { .. }) => report.allocation_failures += 1,
                    Err(err) => return Err(err.into()),
                }
            }
            95..=97 => {
                if let Some(&top) = model.last() {
                    let got = stack.peek()?;
                    if got != top {
                        return Err(diverged(format!("peek returned {got}, model had {top}")));
                    }
                }
            }
            _ => {
                if !model.is_empty() {
                    let index = rng.gen_range_usize(0, model.len());
                    let got = stack.get(index)?;
                    if got != model[index] {
                        return Err(diverged(format!(
                            "get({index}) returned {got}, model had {}",
                            model[index]
                        )));
                    }
                }
            }
        }

        if stack.len() != model.len() {
            return Err(diverged(format!(
                "length {} but model has {}",
                stack.len(),
                model.len()
            )));
        }
        let status = stack.health_check();
        if !status.is_ok() {
            return Err(diverged(format!("status became {status}")));
        }
        report.max_len = report.max_len.max(model.len());
    }

    if stack.elements().as_deref() != Some(model.as_slice()) {
        return Err(HarnessError::SoakDiverged {
            step: plan.steps,
            detail: "final contents differ from the model".to_string(),
        });
    }
    report.final_len = stack.len();
    report.final_capacity = stack.capacity();
    tracing::info!(seed = plan.seed, steps = plan.steps, max_len = report.max_len, "soak finished");
    Ok(report)
}
