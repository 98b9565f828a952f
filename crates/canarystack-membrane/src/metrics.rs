//! Atomic counters for stack observability.
//!
//! All counters use relaxed ordering; they are diagnostic, not
//! synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide stack counters.
pub struct StackMetrics {
    /// Health checks run.
    pub health_checks: AtomicU64,
    /// Health checks that added at least one new flag.
    pub faults_detected: AtomicU64,
    /// Pointer validations.
    pub validations: AtomicU64,
    /// Canary envelope failures.
    pub canary_failures: AtomicU64,
    /// Structural or data checksum mismatches.
    pub checksum_failures: AtomicU64,
    /// Unused slots found not poisoned.
    pub poison_violations: AtomicU64,
    /// Pops that returned a still-poisoned element.
    pub uninitialized_reads: AtomicU64,
    /// Successful pushes.
    pub pushes: AtomicU64,
    /// Successful pops.
    pub pops: AtomicU64,
    /// Pops refused on an empty stack.
    pub empty_pops: AtomicU64,
    /// Buffer growths.
    pub grows: AtomicU64,
    /// Buffer shrinks.
    pub shrinks: AtomicU64,
    /// Allocation requests refused by the allocator.
    pub allocation_failures: AtomicU64,
    /// Operations refused because the stack was already faulted.
    pub gated_operations: AtomicU64,
    /// Dumps rendered.
    pub dumps: AtomicU64,
}

impl StackMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            health_checks: AtomicU64::new(0),
            faults_detected: AtomicU64::new(0),
            validations: AtomicU64::new(0),
            canary_failures: AtomicU64::new(0),
            checksum_failures: AtomicU64::new(0),
            poison_violations: AtomicU64::new(0),
            uninitialized_reads: AtomicU64::new(0),
            pushes: AtomicU64::new(0),
            pops: AtomicU64::new(0),
            empty_pops: AtomicU64::new(0),
            grows: AtomicU64::new(0),
            shrinks: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            gated_operations: AtomicU64::new(0),
            dumps: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            health_checks: Self::get(&self.health_checks),
            faults_detected: Self::get(&self.faults_detected),
            validations: Self::get(&self.validations),
            canary_failures: Self::get(&self.canary_failures),
            checksum_failures: Self::get(&self.checksum_failures),
            poison_violations: Self::get(&self.poison_violations),
            uninitialized_reads: Self::get(&self.uninitialized_reads),
            pushes: Self::get(&self.pushes),
            pops: Self::get(&self.pops),
            empty_pops: Self::get(&self.empty_pops),
            grows: Self::get(&self.grows),
            shrinks: Self::get(&self.shrinks),
            allocation_failures: Self::get(&self.allocation_failures),
            gated_operations: Self::get(&self.gated_operations),
            dumps: Self::get(&self.dumps),
        }
    }
}

impl Default for StackMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub health_checks: u64,
    pub faults_detected: u64,
    pub validations: u64,
    pub canary_failures: u64,
    pub checksum_failures: u64,
    pub poison_violations: u64,
    pub uninitialized_reads: u64,
    pub pushes: u64,
    pub pops: u64,
    pub empty_pops: u64,
    pub grows: u64,
    pub shrinks: u64,
    pub allocation_failures: u64,
    pub gated_operations: u64,
    pub dumps: u64,
}

static GLOBAL_METRICS: StackMetrics = StackMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static StackMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let snap = StackMetrics::new().snapshot();
        assert_eq!(snap, MetricsSnapshot::default());
    }

    #[test]
    fn increment_works() {
        let m = StackMetrics::new();
        StackMetrics::inc(&m.grows);
        StackMetrics::inc(&m.grows);
        StackMetrics::inc(&m.dumps);
        let snap = m.snapshot();
        assert_eq!(snap.grows, 2);
        assert_eq!(snap.dumps, 1);
        assert_eq!(snap.shrinks, 0);
    }
}
