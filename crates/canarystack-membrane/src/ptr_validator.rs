//! Pointer validity checks.
//!
//! Stages, cheapest first:
//! 1. Null check
//! 2. Lifecycle tag (freed / never allocated)
//! 3. Residency probe (optional, asks the kernel)
//!
//! A pointer that fails any stage is never dereferenced.

use crate::alloc::{BufferState, RawBuffer};
use crate::metrics::{StackMetrics, global_metrics};
use crate::residency::ResidencyProbe;

/// Result of running a pointer through the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Pointer is null.
    Null,
    /// Lifecycle tag says nothing is owned.
    NotLive(BufferState),
    /// The kernel reports the page unmapped.
    Unmapped,
    /// Passed every enabled stage.
    Valid,
}

impl ValidationOutcome {
    #[must_use]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Stateless validator configured per stack.
#[derive(Debug, Clone, Copy)]
pub struct PointerValidator {
    lifecycle_checks: bool,
    probe: Option<ResidencyProbe>,
}

impl PointerValidator {
    #[must_use]
    pub fn new(lifecycle_checks: bool, os_checks: bool) -> Self {
        Self {
            lifecycle_checks,
            probe: os_checks.then(ResidencyProbe::new),
        }
    }

    /// Whether freed/uninitialized lifecycle tags are reported as faults.
    #[must_use]
    pub const fn lifecycle_checks(&self) -> bool {
        self.lifecycle_checks
    }

    /// Validate a raw address.
    #[must_use]
    pub fn validate_addr(&self, addr: usize) -> ValidationOutcome {
        StackMetrics::inc(&global_metrics().validations);
        if addr == 0 {
            return ValidationOutcome::Null;
        }
        match self.probe {
            Some(probe) if !probe.is_mapped(addr) => ValidationOutcome::Unmapped,
            _ => ValidationOutcome::Valid,
        }
    }

    /// Validate an owned buffer: the lifecycle tag first, then its address.
    ///
    /// The tag is always consulted before the address is used, even with
    /// lifecycle checks off; that switch only controls whether a non-live
    /// buffer counts as a fault (see [`Self::lifecycle_checks`]).
    #[must_use]
    pub fn validate_buffer(&self, buffer: &RawBuffer) -> ValidationOutcome {
        let state = buffer.state();
        if !state.is_live() {
            StackMetrics::inc(&global_metrics().validations);
            return ValidationOutcome::NotLive(state);
        }
        self.validate_addr(buffer.addr())
    }
}
