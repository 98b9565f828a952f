//! Growth and shrink targets, allocation sizing.
//!
//! Growth is multiplicative so that push stays amortized O(1). The shrink
//! divisor is larger than the growth factor, so an alternating push/pop at a
//! boundary never reallocates on every call.

/// Pure sizing policy for one element type and envelope width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityPolicy {
    growth_factor: f64,
    shrink_factor: f64,
    alignment: usize,
    elem_size: usize,
    envelope_bytes: usize,
}

impl CapacityPolicy {
    /// `alignment` is counted in element slots; 1 disables rounding.
    #[must_use]
    pub fn new(
        growth_factor: f64,
        shrink_factor: f64,
        alignment: usize,
        elem_size: usize,
        envelope_bytes: usize,
    ) -> Self {
        Self {
            growth_factor,
            shrink_factor,
            alignment: alignment.max(1),
            elem_size,
            envelope_bytes,
        }
    }

    #[must_use]
    pub const fn envelope_bytes(&self) -> usize {
        self.envelope_bytes
    }

    /// Next capacity when the buffer is full. Always greater than `capacity`.
    #[must_use]
    pub fn grow(&self, capacity: usize) -> usize {
        if capacity <= 1 {
            return 2 * self.alignment;
        }
        let scaled = scale(capacity, self.growth_factor);
        let target = round_up(scaled, self.alignment);
        if target <= capacity {
            capacity.saturating_add(1)
        } else {
            target
        }
    }

    /// Shrunk capacity. Less than `capacity` for every `capacity > 1`.
    #[must_use]
    pub fn shrink(&self, capacity: usize) -> usize {
        if capacity <= 1 {
            return 2 * self.alignment;
        }
        let scaled = (capacity as f64 / self.shrink_factor) as usize;
        let target = round_down(scaled, self.alignment);
        if target >= capacity {
            capacity - 1
        } else {
            target
        }
    }

    /// Shrink target for a pop that left `len` elements, if one applies.
    #[must_use]
    pub fn shrink_target(&self, len: usize, capacity: usize) -> Option<usize> {
        let target = self.shrink(capacity);
        (len < target && target < capacity).then_some(target)
    }

    /// Bytes needed for `capacity` slots plus both buffer envelopes.
    #[must_use]
    pub fn allocated_size(&self, capacity: usize) -> Option<usize> {
        capacity
            .checked_mul(self.elem_size)?
            .checked_add(2 * self.envelope_bytes)
    }

    /// Slots that fit in an allocation of `usable_bytes`.
    #[must_use]
    pub fn real_capacity(&self, usable_bytes: usize) -> Option<usize> {
        if self.elem_size == 0 {
            return None;
        }
        usable_bytes
            .checked_sub(2 * self.envelope_bytes)
            .map(|data| data / self.elem_size)
    }
}

fn scale(capacity: usize, factor: f64) -> usize {
    let scaled = capacity as f64 * factor;
    if scaled >= usize::MAX as f64 {
        usize::MAX
    } else {
        scaled as usize
    }
}

fn round_up(value: usize, alignment: usize) -> usize {
    if value == 0 {
        return 0;
    }
    ((value - 1) / alignment).saturating_add(1).saturating_mul(alignment)
}

fn round_down(value: usize, alignment: usize) -> usize {
    value / alignment * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligned() -> CapacityPolicy {
        CapacityPolicy::new(1.5, 3.0, 8, 4, 24)
    }

    fn unaligned() -> CapacityPolicy {
        CapacityPolicy::new(1.5, 3.0, 1, 4, 0)
    }

    #[test]
    fn grow_special_cases_tiny_capacity() {
        assert_eq!(aligned().grow(0), 16);
        assert_eq!(aligned().grow(1), 16);
        assert_eq!(unaligned().grow(1), 2);
    }

    #[test]
    fn grow_rounds_to_alignment() {
        let p = aligned();
        assert_eq!(p.grow(2), 8);
        assert_eq!(p.grow(8), 16);
        assert_eq!(p.grow(16), 24);
        assert_eq!(p.grow(24), 40);
    }

    #[test]
    fn grow_always_makes_progress() {
        let p = unaligned();
        assert_eq!(p.grow(2), 3);
        for cap in 0..10_000 {
            assert!(p.grow(cap) > cap, "cap={cap}");
            assert!(aligned().grow(cap) > cap, "cap={cap}");
        }
    }

    #[test]
    fn shrink_always_makes_progress() {
        for cap in 2..10_000 {
            assert!(aligned().shrink(cap) < cap, "cap={cap}");
            assert!(unaligned().shrink(cap) < cap, "cap={cap}");
        }
        assert_eq!(aligned().shrink(24), 8);
        assert_eq!(unaligned().shrink(30), 10);
    }

    #[test]
    fn grow_and_shrink_thresholds_never_coincide() {
        let p = unaligned();
        for cap in 2..5_000 {
            let grown = p.grow(cap);
            // Popping one element right after a growth must not shrink.
            assert_eq!(p.shrink_target(cap, grown), None, "cap={cap}");
        }
    }

    #[test]
    fn shrink_target_requires_len_below_target() {
        let p = unaligned();
        assert_eq!(p.shrink_target(9, 30), Some(10));
        assert_eq!(p.shrink_target(10, 30), None);
    }

    #[test]
    fn allocated_size_includes_both_envelopes() {
        assert_eq!(aligned().allocated_size(8), Some(8 * 4 + 48));
        assert_eq!(aligned().allocated_size(usize::MAX), None);
    }

    #[test]
    fn real_capacity_inverts_allocated_size() {
        let p = aligned();
        assert_eq!(p.real_capacity(p.allocated_size(16).unwrap()), Some(16));
        assert_eq!(p.real_capacity(10), None);
    }
}
