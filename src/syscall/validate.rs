//! System Call Input Validation
//!
//! Every pointer a user process hands the kernel, including its own stack
//! pointer, is checked here before it is dereferenced.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Kernel memory disclosure (addresses at or above `PHYS_BASE`)
//!   - Faults inside the kernel (unmapped user pages)
//!   - Range wraparound (checked arithmetic)
//!   - Null pointer dereference (explicit checks)

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{PHYS_BASE, WORD_SIZE};
use crate::mm::{AddressSpace, VirtAddr};

/// Why a user pointer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Null pointer.
    NullPointer,
    /// Range reaches into kernel space.
    KernelAddress,
    /// `ptr + len` wraps around.
    Overflow,
    /// A page in the range is not mapped.
    Unmapped,
    /// No NUL terminator within the length limit.
    NameTooLong,
    /// The string is not valid UTF-8.
    BadEncoding,
}

impl AccessError {
    /// Whether the pointer itself was bad, as opposed to what it pointed at.
    ///
    /// A process that passes a bad pointer is terminated.
    pub const fn is_violation(self) -> bool {
        !matches!(self, Self::NameTooLong | Self::BadEncoding)
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullPointer => write!(f, "null pointer"),
            Self::KernelAddress => write!(f, "kernel address"),
            Self::Overflow => write!(f, "address range overflows"),
            Self::Unmapped => write!(f, "unmapped user page"),
            Self::NameTooLong => write!(f, "string too long"),
            Self::BadEncoding => write!(f, "string is not UTF-8"),
        }
    }
}

/// A validated user-space buffer
///
/// This type guarantees that:
/// - The buffer is below `PHYS_BASE`
/// - Every page it touches is mapped
/// - The length doesn't overflow
#[derive(Debug, Clone, Copy)]
pub struct UserBuffer {
    start: VirtAddr,
    len: usize,
}

impl UserBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the buffer as a byte slice of `memory`.
    ///
    /// `memory` must be the address space the buffer was validated against.
    /// Only this crate calls it, right after validating against the same
    /// `memory`.
    pub(crate) fn as_bytes<'a, M: AddressSpace + ?Sized>(&self, memory: &'a M) -> &'a [u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY:
        // - Range is below PHYS_BASE and does not wrap
        // - Every page was reported mapped during validation
        unsafe { memory.bytes(self.start, self.len) }
    }
}

/// A validated mutable user-space buffer
#[derive(Debug, Clone, Copy)]
pub struct UserBufferMut {
    start: VirtAddr,
    len: usize,
}

impl UserBufferMut {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the buffer as a mutable byte slice of `memory`.
    ///
    /// Same considerations as `UserBuffer::as_bytes`.
    pub(crate) fn as_bytes_mut<'a, M: AddressSpace + ?Sized>(
        &self,
        memory: &'a mut M,
    ) -> &'a mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: Same as UserBuffer::as_bytes
        unsafe { memory.bytes_mut(self.start, self.len) }
    }
}

/// Validate a user-space read buffer
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Pointer + length doesn't overflow
/// 3. The whole range is below `PHYS_BASE`
/// 4. Every page of the range is mapped
pub fn validate_user_read<M: AddressSpace + ?Sized>(
    memory: &M,
    ptr: usize,
    len: usize,
) -> Result<UserBuffer, AccessError> {
    let start = VirtAddr::new(ptr);

    // Zero-length buffers are never dereferenced
    if len == 0 {
        return Ok(UserBuffer { start, len: 0 });
    }

    if start.is_null() {
        return Err(AccessError::NullPointer);
    }

    let end = start.checked_add(len).ok_or(AccessError::Overflow)?;
    if !start.is_user() || end.as_usize() > PHYS_BASE {
        return Err(AccessError::KernelAddress);
    }

    let mut page = start.page_round_down();
    while page < end {
        if !memory.is_mapped(page) {
            return Err(AccessError::Unmapped);
        }
        page = match page.checked_add(crate::config::PAGE_SIZE) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(UserBuffer { start, len })
}

/// Validate a user-space write buffer
///
/// Same checks as read validation; the buffer will be written to.
pub fn validate_user_write<M: AddressSpace + ?Sized>(
    memory: &M,
    ptr: usize,
    len: usize,
) -> Result<UserBufferMut, AccessError> {
    let read_buf = validate_user_read(memory, ptr, len)?;
    Ok(UserBufferMut {
        start: read_buf.start,
        len: read_buf.len,
    })
}

/// Read one little-endian word from user memory.
pub fn read_user_word<M: AddressSpace + ?Sized>(
    memory: &M,
    addr: VirtAddr,
) -> Result<u32, AccessError> {
    let buf = validate_user_read(memory, addr.as_usize(), WORD_SIZE)?;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(buf.as_bytes(memory));
    Ok(u32::from_le_bytes(word))
}

/// Copy a NUL-terminated string out of user memory.
///
/// Each byte is validated before it is read, so a string running off the
/// end of the mapped region is caught at the first unmapped page.
/// At most `max_len` bytes are accepted before the terminator.
pub fn read_user_str<M: AddressSpace + ?Sized>(
    memory: &M,
    ptr: usize,
    max_len: usize,
) -> Result<String, AccessError> {
    let mut bytes = Vec::new();
    let mut addr = ptr;
    loop {
        let byte = validate_user_read(memory, addr, 1)?.as_bytes(memory)[0];
        if byte == 0 {
            break;
        }
        if bytes.len() == max_len {
            return Err(AccessError::NameTooLong);
        }
        bytes.push(byte);
        addr = addr.checked_add(1).ok_or(AccessError::Overflow)?;
    }
    String::from_utf8(bytes).map_err(|_| AccessError::BadEncoding)
}
