//! Buffer allocation behind a swappable allocator.
//!
//! The stack owns exactly one allocation at a time. Its lifecycle is carried
//! as an explicit [`BufferState`] tag next to the handle, so a freed or
//! never-allocated buffer is recognized without storing magic addresses.

#![allow(unsafe_code)]

use std::cell::Cell;
use std::ptr::NonNull;

use thiserror::Error;

/// Lifecycle of the owned allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferState {
    /// Never allocated.
    Uninitialized,
    /// Allocated and owned.
    Live,
    /// Released by an explicit destroy.
    Freed,
    /// Initial allocation failed; nothing is owned.
    AllocationFailed,
}

impl BufferState {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Live => "live",
            Self::Freed => "freed",
            Self::AllocationFailed => "allocation-failed",
        }
    }
}

/// The allocator could not provide the requested block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {requested_bytes} bytes failed")]
pub struct AllocFailure {
    pub requested_bytes: usize,
}

/// Raw byte allocator used for the stack buffer.
///
/// Returned blocks must be aligned to at least 8 bytes.
pub trait RawAllocator {
    /// Allocate `bytes` zeroed bytes.
    fn alloc_zeroed(&self, bytes: usize) -> Option<NonNull<u8>>;

    /// Resize a block, moving it if needed. On `None` the old block is untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with size `old_bytes` and not be freed.
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> Option<NonNull<u8>>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with size `bytes` and not be freed.
    unsafe fn free(&self, ptr: NonNull<u8>, bytes: usize);

    /// Bytes the allocator really reserved for `ptr`, when it can tell.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from this allocator.
    unsafe fn usable_size(&self, _ptr: NonNull<u8>) -> Option<usize> {
        None
    }
}

/// The C heap (`calloc`/`realloc`/`free`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl RawAllocator for SystemAllocator {
    fn alloc_zeroed(&self, bytes: usize) -> Option<NonNull<u8>> {
        // SAFETY: calloc has no preconditions; a null return is handled.
        let ptr = unsafe { libc::calloc(1, bytes.max(1)) };
        NonNull::new(ptr.cast::<u8>())
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        _old_bytes: usize,
        new_bytes: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: caller guarantees `ptr` is a live block from calloc/realloc.
        // On failure realloc leaves the original block allocated.
        let moved = unsafe { libc::realloc(ptr.as_ptr().cast(), new_bytes.max(1)) };
        NonNull::new(moved.cast::<u8>())
    }

    unsafe fn free(&self, ptr: NonNull<u8>, _bytes: usize) {
        // SAFETY: caller guarantees `ptr` is a live block from calloc/realloc.
        unsafe { libc::free(ptr.as_ptr().cast()) };
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        // SAFETY: caller guarantees `ptr` is a live block from this heap.
        Some(unsafe { libc::malloc_usable_size(ptr.as_ptr().cast()) })
    }
}

/// Wraps an allocator with a byte budget; requests beyond it fail.
///
/// Makes allocation failure reproducible in tests and demos.
#[derive(Debug)]
pub struct LimitedAllocator<A = SystemAllocator> {
    inner: A,
    limit: Cell<usize>,
    in_use: Cell<usize>,
}

impl LimitedAllocator<SystemAllocator> {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::wrap(SystemAllocator, limit)
    }
}

impl<A: RawAllocator> LimitedAllocator<A> {
    #[must_use]
    pub fn wrap(inner: A, limit: usize) -> Self {
        Self {
            inner,
            limit: Cell::new(limit),
            in_use: Cell::new(0),
        }
    }

    /// Change the budget; existing blocks are unaffected.
    pub fn set_limit(&self, limit: usize) {
        self.limit.set(limit);
    }

    /// Bytes currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use.get()
    }
}

impl<A: RawAllocator> RawAllocator for LimitedAllocator<A> {
    fn alloc_zeroed(&self, bytes: usize) -> Option<NonNull<u8>> {
        let total = self.in_use.get().checked_add(bytes)?;
        if total > self.limit.get() {
            return None;
        }
        let ptr = self.inner.alloc_zeroed(bytes)?;
        self.in_use.set(total);
        Some(ptr)
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_bytes: usize,
        new_bytes: usize,
    ) -> Option<NonNull<u8>> {
        let total = self
            .in_use
            .get()
            .saturating_sub(old_bytes)
            .checked_add(new_bytes)?;
        if total > self.limit.get() {
            return None;
        }
        // SAFETY: forwarded caller contract.
        let moved = unsafe { self.inner.realloc(ptr, old_bytes, new_bytes) }?;
        self.in_use.set(total);
        Some(moved)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, bytes: usize) {
        self.in_use.set(self.in_use.get().saturating_sub(bytes));
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.free(ptr, bytes) };
    }

    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.usable_size(ptr) }
    }
}

/// One exclusively owned allocation plus its lifecycle tag.
///
/// Every byte of a live buffer is initialized: fresh blocks are zeroed and
/// grown tails are zero-filled before they become visible.
#[derive(Debug)]
pub struct RawBuffer {
    ptr: Option<NonNull<u8>>,
    bytes: usize,
    state: BufferState,
}

impl RawBuffer {
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self {
            ptr: None,
            bytes: 0,
            state: BufferState::Uninitialized,
        }
    }

    /// Allocate a zeroed buffer. A failure yields an `AllocationFailed` handle.
    #[must_use]
    pub fn allocate<A: RawAllocator>(alloc: &A, bytes: usize) -> Self {
        match alloc.alloc_zeroed(bytes) {
            Some(ptr) => Self {
                ptr: Some(ptr),
                bytes,
                state: BufferState::Live,
            },
            None => Self::allocate_failed(),
        }
    }

    /// Handle recording a failed allocation.
    #[must_use]
    pub const fn allocate_failed() -> Self {
        Self {
            ptr: None,
            bytes: 0,
            state: BufferState::AllocationFailed,
        }
    }

    #[must_use]
    pub const fn state(&self) -> BufferState {
        self.state
    }

    /// Allocation size in bytes (0 unless live).
    #[must_use]
    pub const fn len_bytes(&self) -> usize {
        self.bytes
    }

    /// Base address, or null when nothing is owned.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.map_or(std::ptr::null(), |p| p.as_ptr().cast_const())
    }

    #[must_use]
    pub fn addr(&self) -> usize {
        self.as_ptr() as usize
    }

    /// Whole allocation as bytes; empty unless live.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self.ptr {
            // SAFETY: a live buffer owns `bytes` initialized bytes and is never
            // aliased outside `&self`/`&mut self` borrows of this handle.
            Some(ptr) if self.state.is_live() => unsafe {
                std::slice::from_raw_parts(ptr.as_ptr(), self.bytes)
            },
            _ => &[],
        }
    }

    /// Whole allocation as mutable bytes; empty unless live.
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self.ptr {
            // SAFETY: as in `bytes`, and `&mut self` guarantees uniqueness.
            Some(ptr) if self.state.is_live() => unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr(), self.bytes)
            },
            _ => &mut [],
        }
    }

    /// Resize in place or by moving. On failure nothing changes.
    pub fn resize<A: RawAllocator>(
        &mut self,
        alloc: &A,
        new_bytes: usize,
    ) -> Result<(), AllocFailure> {
        let failure = AllocFailure {
            requested_bytes: new_bytes,
        };
        let Some(ptr) = self.ptr.filter(|_| self.state.is_live()) else {
            return Err(failure);
        };
        // SAFETY: `ptr` is the live block of size `self.bytes` from `alloc`.
        let moved = unsafe { alloc.realloc(ptr, self.bytes, new_bytes) }.ok_or(failure)?;
        if new_bytes > self.bytes {
            // SAFETY: the block now spans `new_bytes`; the tail past the old
            // size is uninitialized and is zeroed before any slice covers it.
            unsafe {
                moved
                    .as_ptr()
                    .add(self.bytes)
                    .write_bytes(0, new_bytes - self.bytes);
            }
        }
        self.ptr = Some(moved);
        self.bytes = new_bytes;
        Ok(())
    }

    /// Allocator-reported usable size of the live block.
    #[must_use]
    pub fn usable_size<A: RawAllocator>(&self, alloc: &A) -> Option<usize> {
        let ptr = self.ptr.filter(|_| self.state.is_live())?;
        // SAFETY: `ptr` is the live block from `alloc`.
        unsafe { alloc.usable_size(ptr) }
    }

    /// Free the block and mark the handle freed.
    pub fn release<A: RawAllocator>(&mut self, alloc: &A) {
        if let Some(ptr) = self.ptr.take().filter(|_| self.state.is_live()) {
            // SAFETY: `ptr` is the live block of size `self.bytes` from `alloc`,
            // and the handle no longer refers to it.
            unsafe { alloc.free(ptr, self.bytes) };
        }
        self.bytes = 0;
        self.state = BufferState::Freed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_zeroed_and_live() {
        let alloc = SystemAllocator;
        let mut buf = RawBuffer::allocate(&alloc, 64);
        assert_eq!(buf.state(), BufferState::Live);
        assert!(buf.bytes().iter().all(|&b| b == 0));
        buf.release(&alloc);
        assert_eq!(buf.state(), BufferState::Freed);
        assert!(buf.bytes().is_empty());
        assert!(buf.as_ptr().is_null());
    }

    #[test]
    fn resize_preserves_prefix_and_zeroes_tail() {
        let alloc = SystemAllocator;
        let mut buf = RawBuffer::allocate(&alloc, 16);
        buf.bytes_mut().fill(0xAB);
        buf.resize(&alloc, 4096).expect("grow");
        assert_eq!(buf.len_bytes(), 4096);
        assert!(buf.bytes()[..16].iter().all(|&b| b == 0xAB));
        assert!(buf.bytes()[16..].iter().all(|&b| b == 0));
        buf.release(&alloc);
    }

    #[test]
    fn limited_allocator_refuses_over_budget() {
        let alloc = LimitedAllocator::new(100);
        let mut buf = RawBuffer::allocate(&alloc, 64);
        assert_eq!(alloc.in_use(), 64);
        let before = buf.addr();
        let err = buf.resize(&alloc, 128).unwrap_err();
        assert_eq!(err.requested_bytes, 128);
        assert_eq!(buf.addr(), before);
        assert_eq!(buf.len_bytes(), 64);
        buf.release(&alloc);
        assert_eq!(alloc.in_use(), 0);
    }

    #[test]
    fn failed_allocation_is_tagged() {
        let alloc = LimitedAllocator::new(8);
        let buf = RawBuffer::allocate(&alloc, 64);
        assert_eq!(buf.state(), BufferState::AllocationFailed);
        assert!(buf.bytes().is_empty());
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn usable_size_covers_request() {
        let alloc = SystemAllocator;
        let mut buf = RawBuffer::allocate(&alloc, 100);
        assert!(buf.usable_size(&alloc).expect("glibc reports") >= 100);
        buf.release(&alloc);
    }
}
