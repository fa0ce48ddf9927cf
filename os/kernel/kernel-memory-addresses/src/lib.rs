//! # Physical and Virtual Address Types
//!
//! Zero-cost wrappers around raw 64-bit addresses that keep physical page
//! addresses (handed out by the page allocator) apart from user virtual
//! addresses (the source and destination of pipe transfers).
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x8000_1000);
//! assert!(pa.is_aligned(4096));
//! assert_eq!((pa + 0x10).as_u64(), 0x8000_1010);
//!
//! let va = VirtualAddress::new(0x4000);
//! assert_eq!(va.offset_from(VirtualAddress::new(0x3000)), Some(0x1000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

use core::fmt;
use core::ops::{Add, AddAssign};

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            #[must_use]
            pub const fn zero() -> Self {
                Self(0)
            }

            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Whether the address is a multiple of `align` (a power of two).
            #[inline]
            #[must_use]
            pub const fn is_aligned(self, align: u64) -> bool {
                self.0 & (align - 1) == 0
            }

            /// Rounds up to the next multiple of `align` (a power of two).
            #[inline]
            #[must_use]
            pub const fn align_up(self, align: u64) -> Self {
                Self((self.0 + (align - 1)) & !(align - 1))
            }

            /// Byte distance from `base` up to `self`, if `self >= base`.
            #[inline]
            #[must_use]
            pub const fn offset_from(self, base: Self) -> Option<u64> {
                self.0.checked_sub(base.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "(0x{:016X})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:016X}", self.0)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(v: u64) -> Self {
                Self::new(v)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl Add<u64> for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<u64> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: u64) {
                self.0 += rhs;
            }
        }
    };
}

address_type!(
    /// Physical memory address.
    ///
    /// Page allocator blocks are identified by the physical address of
    /// their first byte.
    PhysicalAddress,
    "PA"
);

address_type!(
    /// Virtual address in a process's address space.
    ///
    /// Never dereferenced by the kernel directly; transfers go through the
    /// process's copy-in/copy-out primitives.
    VirtualAddress,
    "VA"
);
