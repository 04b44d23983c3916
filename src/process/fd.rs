//! File Descriptor Table
//!
//! Maps the small integers a process passes to read/write/close onto the
//! open file handles it owns.
//!
//! # Design
//! - Fixed-size array of `MAX_FD` slots, scanned linearly
//! - Slots 0 and 1 are the console streams; they never hold a handle and
//!   are never handed out or released
//! - A descriptor keeps its number for as long as its handle is open

use core::fmt;

use crate::config::MAX_FD;

/// A descriptor number checked to be within the table.
///
/// This is a newtype to prevent using arbitrary integers as slot indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Standard input, the keyboard.
    pub const STDIN: Self = Self(0);

    /// Standard output, the display.
    pub const STDOUT: Self = Self(1);

    /// First descriptor that can refer to a file.
    pub const FIRST_FILE: Self = Self(2);

    /// Check a raw descriptor from user space.
    ///
    /// Returns None if it is negative or past the end of the table.
    #[inline]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw >= 0 && (raw as usize) < MAX_FD {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Get the index value.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The value returned to user space.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0 as i32
    }

    /// Whether this is one of the console streams.
    #[inline]
    pub const fn is_console(self) -> bool {
        self.0 < Self::FIRST_FILE.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// Out of range, or no handle stored there.
    InvalidDescriptor,
    /// One of the console streams.
    Reserved,
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDescriptor => write!(f, "invalid file descriptor"),
            Self::Reserved => write!(f, "reserved console descriptor"),
        }
    }
}

/// Every slot is in use. Carries back the handle that could not be stored.
pub struct TableFull<F>(pub F);

impl<F> fmt::Debug for TableFull<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TableFull(..)")
    }
}

impl<F> fmt::Display for TableFull<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "descriptor table full ({} slots)", MAX_FD)
    }
}

/// Descriptor table for a process.
///
/// Owns every handle stored in it. Dropping the table drops the handles
/// without closing them; the exit path drains it through the filesystem
/// first.
pub struct FdTable<F> {
    slots: [Option<F>; MAX_FD],
    open: usize,
}

impl<F> FdTable<F> {
    /// Create a table with only the console streams.
    pub fn new() -> Self {
        Self {
            slots: [const { None }; MAX_FD],
            open: 0,
        }
    }

    /// Store a handle in the lowest free slot at or above 2.
    pub fn allocate(&mut self, handle: F) -> Result<Fd, TableFull<F>> {
        match self.find_free() {
            Some(fd) => {
                self.slots[fd.index()] = Some(handle);
                self.open += 1;
                log::debug!("[FD] allocated {}", fd);
                Ok(fd)
            }
            None => Err(TableFull(handle)),
        }
    }

    /// Find the lowest free slot at or above 2.
    pub fn find_free(&self) -> Option<Fd> {
        (Fd::FIRST_FILE.index()..MAX_FD)
            .find(|&i| self.slots[i].is_none())
            .map(|i| Fd(i as u32))
    }

    /// Look up the handle behind a descriptor.
    pub fn lookup(&self, raw: i32) -> Result<&F, FdError> {
        let fd = Self::file_fd(raw)?;
        self.slots[fd.index()]
            .as_ref()
            .ok_or(FdError::InvalidDescriptor)
    }

    /// Look up the handle behind a descriptor for reading or writing.
    pub fn lookup_mut(&mut self, raw: i32) -> Result<&mut F, FdError> {
        let fd = Self::file_fd(raw)?;
        self.slots[fd.index()]
            .as_mut()
            .ok_or(FdError::InvalidDescriptor)
    }

    /// Remove a handle and give it back so the caller can close it.
    pub fn release(&mut self, raw: i32) -> Result<F, FdError> {
        let fd = Self::file_fd(raw)?;
        let handle = self.slots[fd.index()]
            .take()
            .ok_or(FdError::InvalidDescriptor)?;
        self.open -= 1;
        log::debug!("[FD] released {}", fd);
        Ok(handle)
    }

    /// Take the handle with the lowest descriptor, if any remain.
    pub fn pop(&mut self) -> Option<(Fd, F)> {
        let (i, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_some())?;
        let handle = slot.take()?;
        self.open -= 1;
        Some((Fd(i as u32), handle))
    }

    /// Number of open handles, not counting the console streams.
    pub fn len(&self) -> usize {
        self.open
    }

    pub fn is_empty(&self) -> bool {
        self.open == 0
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.open == MAX_FD - Fd::FIRST_FILE.index()
    }

    fn file_fd(raw: i32) -> Result<Fd, FdError> {
        let fd = Fd::new(raw).ok_or(FdError::InvalidDescriptor)?;
        if fd.is_console() {
            return Err(FdError::Reserved);
        }
        Ok(fd)
    }
}

impl<F> Default for FdTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for FdTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdTable").field("open", &self.open).finish()
    }
}
