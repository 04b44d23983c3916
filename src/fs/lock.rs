//! Global file-operation lock
//!
//! One lock for the whole system. Every filesystem call, and every console
//! read, happens while it is held, so no two of them ever overlap.
//!
//! # Design
//! - The filesystem value lives inside the lock, so it cannot be reached
//!   without the guard
//! - The guard releases on drop, including every early return
//! - Callers keep each acquisition to a single filesystem call

use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use super::FileSystem;

/// The filesystem, behind the global file-operation lock.
pub struct FileLock<F: FileSystem> {
    inner: Mutex<F>,
}

impl<F: FileSystem> FileLock<F> {
    /// Wrap a filesystem.
    pub const fn new(fs: F) -> Self {
        Self {
            inner: Mutex::new(fs),
        }
    }

    /// Acquire the lock, waiting while another thread holds it.
    pub fn lock(&self) -> FileGuard<'_, F> {
        FileGuard {
            guard: self.inner.lock(),
        }
    }

    /// Run one filesystem call under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

/// Proof that the file-operation lock is held.
pub struct FileGuard<'a, F: FileSystem> {
    guard: MutexGuard<'a, F>,
}

impl<F: FileSystem> Deref for FileGuard<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.guard
    }
}

impl<F: FileSystem> DerefMut for FileGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_guard_releases_on_drop() {
        let files = FileLock::new(MemFs::new());
        {
            let _guard = files.lock();
            assert!(files.inner.is_locked());
        }
        assert!(!files.inner.is_locked());
    }

    #[test]
    fn test_calls_never_overlap() {
        let fs = MemFs::new();
        let stats = fs.stats();
        let files = Arc::new(FileLock::new(fs));
        files.with(|fs| fs.create("shared", 0));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let files = Arc::clone(&files);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut file = files.with(|fs| fs.open("shared")).unwrap();
                        files.with(|fs| fs.write(&mut file, &[i as u8; 16]));
                        files.with(|fs| fs.close(file));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(stats.overlaps(), 0);
        assert_eq!(stats.calls(), 1 + 8 * 200 * 3);
    }
}
