//! User memory access for the syscall layer
//!
//! Provides:
//! - `VirtAddr`, the address type every user pointer is wrapped in
//! - `AddressSpace`, the page-directory collaborator that answers
//!   "is this page mapped for the current process"
//!
//! # Security Principles
//! - The kernel never dereferences a user pointer it has not validated
//! - Raw access is `unsafe` and reachable only through the checked
//!   buffers in `syscall::validate`

mod address;

pub use address::{VirtAddr, PAGE_MASK};

/// The address space of one user process.
///
/// Implemented by the platform on top of the process page directory.
///
/// # Safety contract
/// `bytes` and `bytes_mut` may only be called for a range that lies below
/// `PHYS_BASE` and whose every page `is_mapped` reported as mapped.
pub trait AddressSpace {
    /// Whether the page containing `page` is mapped for user access.
    fn is_mapped(&self, page: VirtAddr) -> bool;

    /// Borrow `len` bytes starting at `start`.
    ///
    /// # Safety
    /// The range must have been validated as described on the trait.
    unsafe fn bytes(&self, start: VirtAddr, len: usize) -> &[u8];

    /// Mutably borrow `len` bytes starting at `start`.
    ///
    /// # Safety
    /// The range must have been validated as described on the trait.
    unsafe fn bytes_mut(&mut self, start: VirtAddr, len: usize) -> &mut [u8];
}
