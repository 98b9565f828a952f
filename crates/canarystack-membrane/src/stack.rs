//! The self-verifying stack.
//!
//! Every public operation follows the same protocol:
//! 1. precondition gate: refuse to run on a faulted, destroyed, or
//!    never-constructed stack;
//! 2. mutation, refreshing the canaries, poison, and checksums it disturbs;
//! 3. postcondition audit: a full health check folding any new fault into
//!    the sticky [`Status`].
//!
//! Buffer layout: `[left envelope][capacity x element][right envelope]`.

use std::marker::PhantomData;
use std::ops::Range;

use crate::alloc::{BufferState, RawAllocator, RawBuffer, SystemAllocator};
use crate::canary::{CANARY_WORD_SIZE, CanaryEnvelope, ENVELOPE_BYTES, StructEnvelope};
use crate::capacity::CapacityPolicy;
use crate::checksum::{ChecksumPolicy, Checksums, StructFields};
use crate::config::StackConfig;
use crate::dump::{self, DumpContents, DumpView};
use crate::element::Element;
use crate::error::StackError;
use crate::metrics::{StackMetrics, global_metrics};
use crate::poison::PoisonPolicy;
use crate::ptr_validator::{PointerValidator, ValidationOutcome};
use crate::sink::LogSink;
use crate::status::Status;

/// Capacity and length of a destroyed stack.
pub const SIZE_POISON: usize = usize::MAX - 12;

const HEALTH_CHECK_FAILED: &str = "Problems found during healthcheck!";
const EMPTY_POP: &str = "WARNING: trying to pop from empty stack!";
const UNINITIALIZED_READ: &str = "WARNING: accessed uninitialized element!";

/// Dynamic-array stack with redundant corruption detectors.
///
/// Not `Send` or `Sync`: it exclusively owns a raw allocation and has no
/// concurrent-access contract.
#[repr(C)]
pub struct GuardedStack<T: Element, A: RawAllocator = SystemAllocator> {
    left_canary: StructEnvelope,
    buffer: RawBuffer,
    capacity: usize,
    len: usize,
    status: Status,
    checksums: Checksums,
    sink: LogSink,
    config: StackConfig,
    allocator: A,
    validator: PointerValidator,
    sizing: CapacityPolicy,
    poison: PoisonPolicy,
    canary: CanaryEnvelope,
    checksum: ChecksumPolicy,
    _elem: PhantomData<*const T>,
    right_canary: StructEnvelope,
}

impl<T: Element> GuardedStack<T, SystemAllocator> {
    /// Unconstructed stack on the C heap, logging to stdout.
    #[must_use]
    pub fn new(config: StackConfig) -> Self {
        Self::with_allocator(config, SystemAllocator)
    }

    /// Validate `config`, then create and construct a stack.
    pub fn constructed(config: StackConfig) -> Result<Self, StackError> {
        Self::constructed_in(config, SystemAllocator, LogSink::default())
    }
}

impl<T: Element, A: RawAllocator> GuardedStack<T, A> {
    /// Unconstructed stack using `allocator`.
    #[must_use]
    pub fn with_allocator(config: StackConfig, allocator: A) -> Self {
        let canary = CanaryEnvelope::new();
        let envelope = if config.canaries { ENVELOPE_BYTES } else { 0 };
        let alignment = if config.canaries { CANARY_WORD_SIZE } else { 1 };
        let (left_canary, right_canary) = canary.struct_envelopes();
        let mut stack = Self {
            left_canary,
            buffer: RawBuffer::uninitialized(),
            capacity: 0,
            len: 0,
            status: Status::OK,
            checksums: Checksums::default(),
            sink: LogSink::default(),
            config,
            allocator,
            validator: PointerValidator::new(config.pointer_checks, config.os_checks),
            sizing: CapacityPolicy::new(
                config.growth_factor,
                config.shrink_factor,
                alignment,
                T::SIZE,
                envelope,
            ),
            poison: PoisonPolicy::new(),
            canary,
            checksum: ChecksumPolicy::new(
                config.checksum_kind,
                config.struct_checksum,
                config.data_checksum,
            ),
            _elem: PhantomData,
            right_canary,
        };
        stack.seal_struct();
        stack
    }

    /// Validate `config`, then create and construct a stack with the given
    /// allocator and sink.
    pub fn constructed_in(
        config: StackConfig,
        allocator: A,
        sink: LogSink,
    ) -> Result<Self, StackError> {
        config.validate()?;
        let mut stack = Self::with_allocator(config, allocator).with_sink(sink);
        let status = stack.construct();
        if status.is_ok() {
            Ok(stack)
        } else {
            Err(StackError::Faulted(status))
        }
    }

    /// Replace the diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.set_sink(sink);
        self
    }

    /// Replace the diagnostic sink. The structural checksum is resealed,
    /// since the sink identity is part of it.
    pub fn set_sink(&mut self, sink: LogSink) {
        self.sink = sink;
        self.seal_struct();
    }

    /// (Re)build the stack: allocate `starting_capacity` slots, arm the
    /// canaries, poison every slot, and seal both checksums.
    ///
    /// Any previous buffer is released first and the status is cleared.
    pub fn construct(&mut self) -> Status {
        if self.buffer.state().is_live() {
            self.buffer.release(&self.allocator);
        }
        let (left, right) = self.canary.struct_envelopes();
        self.left_canary = left;
        self.right_canary = right;
        self.status = Status::OK;
        self.len = 0;
        self.capacity = 0;
        self.checksums = Checksums::default();

        let capacity = self.config.starting_capacity;
        let requested = self.sizing.allocated_size(capacity);
        self.buffer = match requested {
            Some(bytes) => RawBuffer::allocate(&self.allocator, bytes),
            None => RawBuffer::uninitialized(),
        };
        if !self.buffer.state().is_live() {
            self.buffer = RawBuffer::allocate_failed();
            self.status |= Status::BAD_MEM_ALLOC;
            StackMetrics::inc(&global_metrics().allocation_failures);
            tracing::warn!(
                capacity,
                requested_bytes = requested.unwrap_or(usize::MAX),
                "stack construction failed to allocate"
            );
            self.seal_struct();
            self.report("ERROR: failed to allocate the stack buffer!");
            return self.status;
        }

        self.capacity = capacity;
        let envelope = self.sizing.envelope_bytes();
        let data_end = envelope + capacity * T::SIZE;
        let bytes = self.buffer.bytes_mut();
        if self.config.poison {
            self.poison.poison_unused(&mut bytes[envelope..data_end]);
        }
        if self.config.canaries {
            self.canary.arm_left(&mut bytes[..envelope]);
            self.canary.arm_right(&mut bytes[data_end..data_end + envelope]);
        }
        self.refresh_checksums();
        tracing::debug!(capacity, elem_size = T::SIZE, "stack constructed");
        self.health_check()
    }

    /// Push `item`, growing the buffer when full.
    ///
    /// A destination slot that lost its poison is flagged but still written.
    pub fn push(&mut self, item: T) -> Result<(), StackError> {
        self.gate("push")?;
        if self.len == self.capacity {
            let target = self.sizing.grow(self.capacity);
            self.resize(target)?;
            StackMetrics::inc(&global_metrics().grows);
        }

        let slot = self.checked_slot(self.len)?;
        let poison_on = self.config.poison;
        let dest = &mut self.buffer.bytes_mut()[slot];
        if poison_on && !self.poison.is_poisoned(dest) {
            self.status |= Status::DATA_INTEGRITY_VIOLATED;
            StackMetrics::inc(&global_metrics().poison_violations);
            tracing::warn!(index = self.len, "push destination slot was not poisoned");
        }
        item.write_slot_bytes(dest);
        self.len += 1;
        self.refresh_checksums();
        StackMetrics::inc(&global_metrics().pushes);
        self.audit()
    }

    /// Pop the top element.
    ///
    /// On an empty stack this logs a warning and returns
    /// [`StackError::EmptyPop`] without touching length or status.
    pub fn pop(&mut self) -> Result<T, StackError> {
        self.gate("pop")?;
        if self.len == 0 {
            StackMetrics::inc(&global_metrics().empty_pops);
            tracing::warn!("pop from an empty stack");
            self.report(EMPTY_POP);
            return Err(StackError::EmptyPop);
        }

        let slot = self.checked_slot(self.len - 1)?;
        self.len -= 1;
        let item = T::from_slot_bytes(&self.buffer.bytes()[slot.clone()]);
        if self.config.poison {
            if self.poison.is_poisoned(&self.buffer.bytes()[slot.clone()]) {
                StackMetrics::inc(&global_metrics().uninitialized_reads);
                tracing::warn!(index = self.len, "popped element was never written");
                self.report(UNINITIALIZED_READ);
            }
            self.poison.poison_unused(&mut self.buffer.bytes_mut()[slot]);
        }

        if self.config.auto_shrink {
            if let Some(target) = self.sizing.shrink_target(self.len, self.capacity) {
                // A refused shrink keeps the larger buffer; the pop still succeeds.
                match self.resize(target) {
                    Ok(()) => StackMetrics::inc(&global_metrics().shrinks),
                    Err(err) => tracing::debug!(%err, "shrink on pop skipped"),
                }
            }
        }

        self.refresh_checksums();
        StackMetrics::inc(&global_metrics().pops);
        self.audit().map(|()| item)
    }

    /// Resize to exactly `new_capacity` slots.
    ///
    /// On allocation failure the old buffer stays in place and
    /// [`StackError::AllocationFailed`] is returned; the status is untouched.
    pub fn reallocate(&mut self, new_capacity: usize) -> Result<(), StackError> {
        self.gate("reallocate")?;
        if new_capacity < self.len {
            return Err(StackError::CapacityBelowLength {
                requested: new_capacity,
                len: self.len,
            });
        }
        self.resize(new_capacity)?;
        self.audit()
    }

    /// Element at `index` (0 is the bottom).
    pub fn get(&mut self, index: usize) -> Result<T, StackError> {
        self.gate("get")?;
        if index >= self.len {
            return Err(StackError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        let slot = self.checked_slot(index)?;
        let bytes = &self.buffer.bytes()[slot];
        let item = T::from_slot_bytes(bytes);
        if self.config.poison && self.poison.is_poisoned(bytes) {
            StackMetrics::inc(&global_metrics().uninitialized_reads);
            tracing::warn!(index, "read of an element that was never written");
            self.report(UNINITIALIZED_READ);
        }
        Ok(item)
    }

    /// Top element without removing it.
    pub fn peek(&mut self) -> Result<T, StackError> {
        match self.len {
            0 => {
                self.gate("peek")?;
                Err(StackError::EmptyPop)
            }
            len => self.get(len - 1),
        }
    }

    /// Drop every element, re-poisoning each vacated slot.
    pub fn clear(&mut self) -> Result<(), StackError> {
        self.gate("clear")?;
        if self.config.poison {
            let live = self.slot_range(0).start..self.slot_range(self.len).start;
            self.poison.poison_unused(&mut self.buffer.bytes_mut()[live]);
        }
        self.len = 0;
        self.refresh_checksums();
        self.audit()
    }

    /// Poison the whole buffer with the freed pattern, release it, and enter
    /// the recognized destroyed state (status `OK`).
    pub fn destroy(&mut self) -> Status {
        if !self.buffer.state().is_live() {
            self.status |= Status::BAD_DATA_PTR;
            self.seal_struct();
            tracing::warn!(state = self.buffer.state().label(), "destroy of a stack without a live buffer");
            self.report("ERROR: pointer to the data is invalid!");
            return self.status;
        }
        self.health_check();
        if self.config.poison {
            self.poison.poison_freed(self.buffer.bytes_mut());
        }
        self.buffer.release(&self.allocator);
        self.capacity = SIZE_POISON;
        self.len = SIZE_POISON;
        self.checksums = Checksums::default();
        self.seal_struct();
        tracing::debug!("stack destroyed");
        self.health_check()
    }

    /// Run every enabled detector and fold new faults into the status.
    ///
    /// Structural checks run before data-region checks; the data region is
    /// only read when the recorded layout fits inside the live allocation.
    /// Calling this twice without mutation returns the same status.
    pub fn health_check(&mut self) -> Status {
        let metrics = global_metrics();
        StackMetrics::inc(&metrics.health_checks);
        if self.is_destroyed() {
            if !self.status.is_ok() {
                self.status = Status::OK;
                self.seal_struct();
            }
            return self.status;
        }

        let mut found = Status::OK;
        let self_addr = std::ptr::from_ref(self) as usize;
        if self.validator.validate_addr(self_addr) != ValidationOutcome::Valid {
            found |= Status::BAD_STRUCT_PTR;
        }
        if self.checksum.covers_struct() && self.checksums.structural != self.struct_hash() {
            found |= Status::BAD_STRUCT_HASH;
        }
        if self.len > self.capacity {
            found |= Status::INTEGRITY_VIOLATED;
        }
        if self.config.canaries {
            found |= self
                .canary
                .verify_struct(&self.left_canary, &self.right_canary)
                .status();
        }

        match self.validator.validate_buffer(&self.buffer) {
            ValidationOutcome::Valid => {
                if self.config.os_checks
                    && self.real_capacity().is_some_and(|real| real < self.capacity)
                {
                    found |= Status::BAD_CAPACITY;
                }
                found |= self.check_data_region(found);
            }
            ValidationOutcome::NotLive(_) if !self.validator.lifecycle_checks() => {}
            _ => found |= Status::BAD_DATA_PTR,
        }

        let new = found.difference(self.status);
        if !new.is_empty() {
            self.status |= found;
            self.seal_struct();
            StackMetrics::inc(&metrics.faults_detected);
            if new.intersects(Status::ANY_CANARY) {
                StackMetrics::inc(&metrics.canary_failures);
            }
            if new.intersects(Status::BAD_STRUCT_HASH | Status::BAD_DATA_HASH) {
                StackMetrics::inc(&metrics.checksum_failures);
            }
            if new.contains(Status::DATA_INTEGRITY_VIOLATED) {
                StackMetrics::inc(&metrics.poison_violations);
            }
            tracing::warn!(status = %self.status, new = %new, "health check found problems");
            self.report(HEALTH_CHECK_FAILED);
        }
        self.status
    }

    fn check_data_region(&self, prior: Status) -> Status {
        let Some(data) = self.data_region() else {
            return Status::INTEGRITY_VIOLATED;
        };
        // Contents are not judged once the bookkeeping is known bad.
        if prior.is_structural() {
            return Status::OK;
        }
        let mut found = Status::OK;
        if self.checksum.covers_data() && self.checksums.data != self.checksum.data_hash(data) {
            found |= Status::BAD_DATA_HASH;
        }
        if self.config.canaries {
            let envelope = self.sizing.envelope_bytes();
            let bytes = self.buffer.bytes();
            let right = self.slot_range(self.capacity).start;
            found |= self
                .canary
                .verify(
                    &bytes[..envelope],
                    &bytes[right..right + envelope],
                    &self.left_canary,
                    &self.right_canary,
                )
                .status();
        }
        if self.config.poison && self.len <= self.capacity {
            let unused = &data[self.len * T::SIZE..];
            if let Some(offset) = self.poison.first_unpoisoned(unused, T::SIZE) {
                tracing::debug!(index = self.len + offset, "unused slot lost its poison");
                found |= Status::DATA_INTEGRITY_VIOLATED;
            }
        }
        found
    }

    /// Write a dump to the stack's own sink.
    pub fn dump(&self) -> Status {
        self.dump_to(&self.sink)
    }

    /// Write a dump to `sink`. Never changes the status.
    pub fn dump_to(&self, sink: &LogSink) -> Status {
        sink.write_block(&self.render_dump());
        self.status
    }

    /// The dump text.
    #[must_use]
    pub fn render_dump(&self) -> String {
        StackMetrics::inc(&global_metrics().dumps);
        dump::render(&self.dump_view())
    }

    /// Snapshot of everything a dump shows.
    #[must_use]
    pub fn dump_view(&self) -> DumpView {
        let envelope = self.sizing.envelope_bytes();
        DumpView {
            stack_addr: std::ptr::from_ref(self) as usize,
            state: self.buffer.state(),
            status: self.status,
            verbosity: self.config.verbosity,
            capacity: self.capacity,
            real_capacity: if self.config.os_checks {
                self.real_capacity()
            } else {
                None
            },
            len: self.len,
            buffer_addr: self.buffer.addr(),
            data_addr: if self.buffer.state().is_live() {
                self.buffer.addr() + envelope
            } else {
                0
            },
            elem_size: T::SIZE,
            struct_checksum: self
                .checksum
                .covers_struct()
                .then_some(self.checksums.structural),
            data_checksum: self.checksum.covers_data().then_some(self.checksums.data),
            contents: self.dump_contents(),
        }
    }

    fn dump_contents(&self) -> Option<DumpContents> {
        let data = self.data_region()?;
        let bytes = self.buffer.bytes();
        let envelope = self.sizing.envelope_bytes();
        let right = self.slot_range(self.capacity).start;
        let mut slots = data.chunks_exact(T::SIZE);
        let live = slots
            .by_ref()
            .take(self.len.min(self.capacity))
            .map(|slot| format!("{:?}", T::from_slot_bytes(slot)))
            .collect();
        let unused: Vec<&[u8]> = slots.collect();
        Some(DumpContents {
            left_canary: CanaryEnvelope::read_words(&bytes[..envelope]),
            live,
            tail_poisoned: self.config.poison
                && unused.iter().all(|slot| self.poison.is_poisoned(slot)),
            unused: unused.into_iter().map(dump::hex_slot).collect(),
            right_canary: CanaryEnvelope::read_words(&bytes[right..right + envelope]),
        })
    }

    /// Live elements, bottom first; `None` when the data region is unreadable.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<T>> {
        let data = self.data_region()?;
        Some(
            data.chunks_exact(T::SIZE)
                .take(self.len.min(self.capacity))
                .map(T::from_slot_bytes)
                .collect(),
        )
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accumulated fault flags.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Lifecycle of the owned buffer.
    #[must_use]
    pub const fn state(&self) -> BufferState {
        self.buffer.state()
    }

    #[must_use]
    pub const fn checksums(&self) -> Checksums {
        self.checksums
    }

    #[must_use]
    pub const fn config(&self) -> &StackConfig {
        &self.config
    }

    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }

    #[must_use]
    pub const fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Slots the allocation really holds: the allocator's usable size when it
    /// reports one, else the size that was requested.
    #[must_use]
    pub fn real_capacity(&self) -> Option<usize> {
        if !self.buffer.state().is_live() {
            return None;
        }
        let usable = self
            .buffer
            .usable_size(&self.allocator)
            .unwrap_or(self.buffer.len_bytes());
        self.sizing.real_capacity(usable)
    }

    fn gate(&mut self, op: &'static str) -> Result<(), StackError> {
        let refused = match self.buffer.state() {
            BufferState::Uninitialized => Some(StackError::NotConstructed),
            BufferState::Freed => Some(StackError::Destroyed),
            BufferState::AllocationFailed | BufferState::Live => {
                let status = self.health_check();
                (!status.is_ok()).then_some(StackError::Faulted(status))
            }
        };
        let Some(err) = refused else {
            return Ok(());
        };
        StackMetrics::inc(&global_metrics().gated_operations);
        if !self.config.quiet_gate {
            tracing::warn!(op, %err, "operation refused");
            if self.config.verbosity >= 2 {
                self.report(&format!("ERROR: {op} refused: {err}"));
            }
        }
        Err(err)
    }

    fn audit(&mut self) -> Result<(), StackError> {
        let status = self.health_check();
        if status.is_ok() {
            Ok(())
        } else {
            Err(StackError::Faulted(status))
        }
    }

    /// Resize the allocation; poison and canaries follow the new capacity.
    fn resize(&mut self, new_capacity: usize) -> Result<(), StackError> {
        let old_capacity = self.capacity;
        let Some(new_bytes) = self.sizing.allocated_size(new_capacity) else {
            return Err(self.allocation_failed(usize::MAX));
        };
        let poison_on = self.config.poison;
        let dropped = self.slot_range(new_capacity).start..self.slot_range(old_capacity).start;
        if poison_on && new_capacity < old_capacity {
            self.poison.poison_freed(&mut self.buffer.bytes_mut()[dropped.clone()]);
        }
        if let Err(failure) = self.buffer.resize(&self.allocator, new_bytes) {
            if poison_on && new_capacity < old_capacity {
                // Slots above the length were unused; restore their poison.
                self.poison.poison_unused(&mut self.buffer.bytes_mut()[dropped]);
            }
            return Err(self.allocation_failed(failure.requested_bytes));
        }

        self.capacity = new_capacity;
        let envelope = self.sizing.envelope_bytes();
        let bytes = self.buffer.bytes_mut();
        if poison_on && new_capacity > old_capacity {
            let grown = envelope + old_capacity * T::SIZE..envelope + new_capacity * T::SIZE;
            self.poison.poison_unused(&mut bytes[grown]);
        }
        if self.config.canaries {
            let right = envelope + new_capacity * T::SIZE;
            self.canary.arm_right(&mut bytes[right..right + envelope]);
        }
        tracing::debug!(old_capacity, new_capacity, "buffer resized");
        self.refresh_checksums();
        Ok(())
    }

    fn allocation_failed(&self, requested_bytes: usize) -> StackError {
        StackMetrics::inc(&global_metrics().allocation_failures);
        tracing::warn!(requested_bytes, capacity = self.capacity, "buffer resize failed");
        self.report("ERROR: failed to reallocate the stack buffer!");
        StackError::AllocationFailed { requested_bytes }
    }

    fn report(&self, message: &str) {
        self.sink
            .write_block(&dump::render_report(message, &self.dump_view()));
    }

    /// Both sizes poisoned and the buffer tagged freed. The tag is always
    /// maintained, so a live buffer never passes for a destroyed one.
    fn is_destroyed(&self) -> bool {
        self.capacity == SIZE_POISON
            && self.len == SIZE_POISON
            && self.buffer.state() == BufferState::Freed
    }

    /// Byte range of slot `index` within the allocation. Saturates instead
    /// of overflowing on tampered indices.
    fn slot_range(&self, index: usize) -> Range<usize> {
        let start = self
            .sizing
            .envelope_bytes()
            .saturating_add(index.saturating_mul(T::SIZE));
        start..start.saturating_add(T::SIZE)
    }

    /// Slot `index`, refused unless it lies inside the readable data region.
    fn checked_slot(&mut self, index: usize) -> Result<Range<usize>, StackError> {
        if index < self.capacity && self.data_region().is_some() {
            return Ok(self.slot_range(index));
        }
        self.status |= Status::INTEGRITY_VIOLATED;
        self.seal_struct();
        tracing::warn!(index, capacity = self.capacity, "slot outside the data region");
        Err(StackError::Faulted(self.status))
    }

    /// Data region, when the recorded capacity fits the live allocation.
    fn data_region(&self) -> Option<&[u8]> {
        let needed = self.sizing.allocated_size(self.capacity)?;
        if !self.buffer.state().is_live() || needed > self.buffer.len_bytes() {
            return None;
        }
        let envelope = self.sizing.envelope_bytes();
        Some(&self.buffer.bytes()[envelope..needed - envelope])
    }

    fn struct_hash(&self) -> u64 {
        self.checksum.struct_hash(StructFields {
            buffer_addr: self.buffer.addr(),
            data_offset: self.sizing.envelope_bytes(),
            capacity: self.capacity,
            len: self.len,
            status: self.status.bits(),
            sink_identity: self.sink.identity(),
            data_checksum: self.checksums.data,
        })
    }

    fn seal_struct(&mut self) {
        self.checksums.structural = self.struct_hash();
    }

    fn refresh_checksums(&mut self) {
        self.checksums.data = match self.data_region() {
            Some(data) => self.checksum.data_hash(data),
            None => 0,
        };
        self.seal_struct();
    }
}

/// Corruption injection for tests and demos. None of these reseal the
/// checksums, so the next health check sees the damage.
#[cfg(any(test, feature = "fault-injection"))]
impl<T: Element, A: RawAllocator> GuardedStack<T, A> {
    /// Overwrite the left buffer envelope with `byte`.
    pub fn inject_left_data_canary(&mut self, byte: u8) {
        let envelope = self.sizing.envelope_bytes();
        if let Some(region) = self.buffer.bytes_mut().get_mut(..envelope) {
            region.fill(byte);
        }
    }

    /// Overwrite the right buffer envelope with `byte`.
    pub fn inject_right_data_canary(&mut self, byte: u8) {
        let envelope = self.sizing.envelope_bytes();
        let start = self.slot_range(self.capacity).start;
        if let Some(region) = self.buffer.bytes_mut().get_mut(start..start + envelope) {
            region.fill(byte);
        }
    }

    pub fn inject_left_struct_canary(&mut self, word: u64) {
        self.left_canary[0] = word;
    }

    pub fn inject_right_struct_canary(&mut self, word: u64) {
        self.right_canary[crate::canary::ENVELOPE_WIDTH - 1] = word;
    }

    pub fn inject_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn inject_len(&mut self, len: usize) {
        self.len = len;
    }

    /// Overwrite every byte of slot `index` with `byte` (no-op outside the allocation).
    pub fn inject_slot(&mut self, index: usize, byte: u8) {
        let range = self.slot_range(index);
        if let Some(slot) = self.buffer.bytes_mut().get_mut(range) {
            slot.fill(byte);
        }
    }
}

impl<T: Element, A: RawAllocator> Drop for GuardedStack<T, A> {
    fn drop(&mut self) {
        if self.buffer.state().is_live() {
            self.buffer.release(&self.allocator);
        }
    }
}

impl<T: Element, A: RawAllocator> std::fmt::Debug for GuardedStack<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedStack")
            .field("state", &self.buffer.state())
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
