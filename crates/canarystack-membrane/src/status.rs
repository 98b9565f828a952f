//! Cumulative fault bitset.
//!
//! Flags are only ever added during an operation sequence. The one way back
//! to [`Status::OK`] is construction, or the health check recognizing a
//! properly destroyed stack.

use std::fmt;

bitflags::bitflags! {
    /// Independently named fault classes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u32 {
        /// The control structure itself failed pointer validation.
        const BAD_STRUCT_PTR          = 1 << 0;
        /// An allocation failed, or a slot aliased the envelope.
        const BAD_MEM_ALLOC           = 1 << 1;
        /// `length > capacity`, or capacity is outside the allocation.
        const INTEGRITY_VIOLATED      = 1 << 2;
        /// An unused slot lost its poison.
        const DATA_INTEGRITY_VIOLATED = 1 << 3;
        /// The data buffer handle is not live.
        const BAD_DATA_PTR            = 1 << 4;
        /// Left canary of the control structure overwritten.
        const LEFT_STRUCT_CANARY      = 1 << 6;
        /// Right canary of the control structure overwritten.
        const RIGHT_STRUCT_CANARY     = 1 << 7;
        /// Left envelope of the data buffer overwritten.
        const LEFT_DATA_CANARY        = 1 << 8;
        /// Right envelope of the data buffer overwritten.
        const RIGHT_DATA_CANARY       = 1 << 9;
        /// Structural checksum mismatch.
        const BAD_STRUCT_HASH         = 1 << 10;
        /// Data checksum mismatch.
        const BAD_DATA_HASH           = 1 << 11;
        /// Recorded capacity exceeds what the allocator reports.
        const BAD_CAPACITY            = 1 << 12;
    }
}

impl Status {
    /// The fully clear state.
    pub const OK: Self = Self::empty();

    /// Any of the four canary flags.
    pub const ANY_CANARY: Self = Self::LEFT_STRUCT_CANARY
        .union(Self::RIGHT_STRUCT_CANARY)
        .union(Self::LEFT_DATA_CANARY)
        .union(Self::RIGHT_DATA_CANARY);

    /// Flags after which reading the data region is not safe.
    pub const STRUCTURAL: Self = Self::BAD_STRUCT_PTR
        .union(Self::BAD_DATA_PTR)
        .union(Self::INTEGRITY_VIOLATED)
        .union(Self::BAD_CAPACITY);

    /// True when no flag is set.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.is_empty()
    }

    /// True when the data region must not be read.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        self.intersects(Self::STRUCTURAL)
    }

    /// Human-readable label of every active flag, in bit order.
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        self.iter().map(label).collect()
    }
}

fn label(flag: Status) -> &'static str {
    match flag {
        Status::BAD_STRUCT_PTR => "Bad self ptr",
        Status::BAD_MEM_ALLOC => "Bad memory allocation",
        Status::INTEGRITY_VIOLATED => "Stack integrity violated",
        Status::DATA_INTEGRITY_VIOLATED => "Data integrity violated",
        Status::BAD_DATA_PTR => "Bad data ptr",
        Status::LEFT_STRUCT_CANARY => "Left structure canary corrupted",
        Status::RIGHT_STRUCT_CANARY => "Right structure canary corrupted",
        Status::LEFT_DATA_CANARY => "Left data canary corrupted",
        Status::RIGHT_DATA_CANARY => "Right data canary corrupted",
        Status::BAD_STRUCT_HASH => "Bad structure hash, stack may be corrupted",
        Status::BAD_DATA_HASH => "Bad data hash, stack data may be corrupted",
        Status::BAD_CAPACITY => "Bad capacity, capacity value differs from the allocated one",
        _ => "Unknown flag",
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        f.write_str(&self.labels().join("; "))
    }
}
