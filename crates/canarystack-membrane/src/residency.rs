//! OS-level residency probe.
//!
//! Asks the kernel whether the page containing an address is mapped, without
//! touching the address itself. On unix this is `msync(MS_ASYNC)` on the page
//! base: unmapped ranges fail with `ENOMEM`, mapped ones are a no-op.

#![allow(unsafe_code)]

use std::sync::OnceLock;

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Page-granular mapping probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidencyProbe {
    page_size: usize,
}

impl ResidencyProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: page_size(),
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether the page holding `addr` is mapped. Null is never mapped.
    #[must_use]
    pub fn is_mapped(&self, addr: usize) -> bool {
        if addr == 0 {
            return false;
        }
        let base = addr & !(self.page_size - 1);
        probe_page(base, self.page_size)
    }
}

impl Default for ResidencyProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn page_size() -> usize {
    static PAGE: OnceLock<usize> = OnceLock::new();
    *PAGE.get_or_init(query_page_size)
}

#[cfg(unix)]
fn query_page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(raw)
        .ok()
        .filter(|p| p.is_power_of_two())
        .unwrap_or(FALLBACK_PAGE_SIZE)
}

#[cfg(not(unix))]
fn query_page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

#[cfg(unix)]
fn probe_page(base: usize, len: usize) -> bool {
    // SAFETY: msync only inspects the mapping table for [base, base+len);
    // MS_ASYNC schedules nothing for anonymous memory and never faults.
    unsafe { libc::msync(base as *mut libc::c_void, len, libc::MS_ASYNC) == 0 }
}

#[cfg(not(unix))]
fn probe_page(_base: usize, _len: usize) -> bool {
    static WARNED: OnceLock<()> = OnceLock::new();
    WARNED.get_or_init(|| {
        tracing::warn!("residency probe unsupported on this platform; treating pages as mapped");
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(ResidencyProbe::new().page_size().is_power_of_two());
    }

    #[test]
    fn heap_and_stack_addresses_are_mapped() {
        let probe = ResidencyProbe::new();
        let heap = vec![0_u8; 64];
        let local = 7_u64;
        assert!(probe.is_mapped(heap.as_ptr() as usize));
        assert!(probe.is_mapped(std::ptr::addr_of!(local) as usize));
    }

    #[test]
    fn null_is_not_mapped() {
        assert!(!ResidencyProbe::new().is_mapped(0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn low_page_is_not_mapped() {
        // Below mmap_min_addr; the kernel never maps it.
        assert!(!ResidencyProbe::new().is_mapped(0x1000));
    }
}
