//! Virtual Address Type
//!
//! User and kernel share one 32-bit virtual address space, split at
//! `PHYS_BASE`: user pages below, the kernel's direct map at and above.
//!
//! # Security Properties
//! - Addresses from user registers and stacks arrive as plain integers and
//!   are wrapped here before any check
//! - Arithmetic is checked; an overflowing range is never produced

use core::fmt;

use crate::config::{PAGE_SIZE, PHYS_BASE};

/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// A virtual address as seen by the trapping process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Wrap a raw address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if this is the null pointer.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a user address (below `PHYS_BASE`).
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < PHYS_BASE
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn page_round_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Add an offset, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
