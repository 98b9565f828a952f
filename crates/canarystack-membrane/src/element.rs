//! Element types storable in a [`GuardedStack`](crate::GuardedStack).
//!
//! The stack poisons unused slots with a byte pattern and may read such a
//! slot back (a pop past the written region, a dump of the unused tail).
//! That is only sound when every bit pattern is a valid value of the element
//! type, which is what [`Element`] promises.

#![allow(unsafe_code)]

use std::fmt::Debug;
use std::mem::{align_of, size_of};

use crate::canary::CanaryWord;

/// A fixed-size, trivially-copyable value with no invalid bit patterns.
///
/// # Safety
///
/// Implementors must guarantee that any `size_of::<Self>()` bytes form a
/// valid `Self`, that the type has no padding and no drop glue, and that
/// `align_of::<Self>() <= align_of::<CanaryWord>()`.
pub unsafe trait Element: Copy + Debug + 'static {
    /// Compile-time guard for the alignment requirement.
    const ALIGN_OK: () = assert!(
        align_of::<Self>() <= align_of::<CanaryWord>(),
        "element alignment must not exceed the canary word alignment"
    );

    /// Size of one slot in bytes.
    const SIZE: usize = size_of::<Self>();

    /// Reinterpret a slot's raw bytes as an element.
    #[must_use]
    fn from_slot_bytes(bytes: &[u8]) -> Self {
        let () = Self::ALIGN_OK;
        assert_eq!(bytes.len(), Self::SIZE, "slot length mismatch");
        // SAFETY: the trait contract guarantees every bit pattern is a valid
        // `Self`; the length is checked above and `read_unaligned` has no
        // alignment requirement.
        unsafe { bytes.as_ptr().cast::<Self>().read_unaligned() }
    }

    /// View an element as its raw bytes.
    fn write_slot_bytes(self, out: &mut [u8]) {
        assert_eq!(out.len(), Self::SIZE, "slot length mismatch");
        // SAFETY: `out` holds exactly `SIZE` bytes and the type has no padding,
        // so every byte copied from `self` is initialized.
        unsafe {
            out.as_mut_ptr().cast::<Self>().write_unaligned(self);
        }
    }
}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types accept every bit pattern, carry
            // no padding, and are at most 8-byte aligned.
            unsafe impl Element for $ty {}
        )*
    };
}

impl_element!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_slot_bytes() {
        let mut buf = [0_u8; 8];
        (-42_i64).write_slot_bytes(&mut buf);
        assert_eq!(i64::from_slot_bytes(&buf), -42);
    }

    #[test]
    fn poison_bytes_read_back_as_values() {
        assert_eq!(u32::from_slot_bytes(&[0xFA; 4]), 0xFAFA_FAFA);
        assert!(f64::from_slot_bytes(&[0xFF; 8]).is_nan());
    }

    #[test]
    #[should_panic(expected = "slot length mismatch")]
    fn short_slot_is_rejected() {
        let _ = u64::from_slot_bytes(&[0_u8; 4]);
    }
}
