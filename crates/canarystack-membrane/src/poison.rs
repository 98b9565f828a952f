//! Byte-level poisoning of unused and freed slots.
//!
//! Detection only: a slot found unpoisoned raises a flag and a log line, the
//! operation that found it still runs to completion.

/// Pattern for allocated slots that hold no live element.
pub const ELEM_POISON: u8 = 0xFA;

/// Pattern for memory being released or shrunk away.
pub const FREED_POISON: u8 = 0xFC;

/// Number of unused slots above which a uniformly poisoned tail is elided in dumps.
pub const DUMP_ELIDE_THRESHOLD: usize = 10;

/// Poison-pattern strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoisonPolicy {
    unused: u8,
    freed: u8,
}

impl PoisonPolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            unused: ELEM_POISON,
            freed: FREED_POISON,
        }
    }

    /// Mark a region as allocated but unused.
    pub fn poison_unused(&self, region: &mut [u8]) {
        region.fill(self.unused);
    }

    /// Mark a region as released.
    pub fn poison_freed(&self, region: &mut [u8]) {
        region.fill(self.freed);
    }

    /// True when every byte of the slot carries the unused pattern.
    #[must_use]
    pub fn is_poisoned(&self, slot: &[u8]) -> bool {
        !slot.is_empty() && slot.iter().all(|&b| b == self.unused)
    }

    /// Index of the first slot in `region` (split into `slot_size` chunks)
    /// that is not poisoned.
    #[must_use]
    pub fn first_unpoisoned(&self, region: &[u8], slot_size: usize) -> Option<usize> {
        region
            .chunks_exact(slot_size)
            .position(|slot| !self.is_poisoned(slot))
    }
}

impl Default for PoisonPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_element_is_compared() {
        let policy = PoisonPolicy::new();
        let mut slot = [ELEM_POISON; 8];
        assert!(policy.is_poisoned(&slot));
        // Only the last byte differs: a first-byte check would miss this.
        slot[7] = 0x00;
        assert!(!policy.is_poisoned(&slot));
    }

    #[test]
    fn freed_and_unused_patterns_differ() {
        let policy = PoisonPolicy::new();
        let mut region = [0_u8; 16];
        policy.poison_freed(&mut region);
        assert_eq!(region, [FREED_POISON; 16]);
        assert!(!policy.is_poisoned(&region));
        policy.poison_unused(&mut region);
        assert!(policy.is_poisoned(&region));
    }

    #[test]
    fn first_unpoisoned_slot_is_located() {
        let policy = PoisonPolicy::new();
        let mut region = [ELEM_POISON; 32];
        assert_eq!(policy.first_unpoisoned(&region, 4), None);
        region[13] = 1;
        assert_eq!(policy.first_unpoisoned(&region, 4), Some(3));
    }

    #[test]
    fn empty_slot_is_never_poisoned() {
        assert!(!PoisonPolicy::new().is_poisoned(&[]));
    }
}
