//! Filesystem boundary
//!
//! The filesystem itself is a collaborator and is not safe to enter from two
//! threads at once. The syscall layer reaches it only through [`FileLock`],
//! one call per acquisition.

mod lock;

pub use lock::{FileGuard, FileLock};

/// The blocking, handle-based filesystem API the syscall layer calls.
///
/// Every method takes `&mut self`, so a caller must hold the [`FileLock`].
pub trait FileSystem: Send {
    /// An open file. Carries its own read/write position.
    type File: Send;

    /// Create a file of `initial_size` bytes. False if it exists or on error.
    fn create(&mut self, path: &str, initial_size: u32) -> bool;

    /// Delete a file. False if it does not exist.
    fn remove(&mut self, path: &str) -> bool;

    /// Open a file, or `None` if it does not exist.
    fn open(&mut self, path: &str) -> Option<Self::File>;

    /// Size of the file in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Read from the current position; returns the bytes actually read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> u32;

    /// Write at the current position; returns the bytes actually written.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> u32;

    /// Move the position. Seeking past the end is allowed.
    fn seek(&mut self, file: &mut Self::File, position: u32);

    /// Current position.
    fn tell(&mut self, file: &Self::File) -> u32;

    /// Close the handle.
    fn close(&mut self, file: Self::File);
}
