//! User processes, as the syscall layer sees them
//!
//! # Design
//! - One kernel thread per process; a process is touched only by its own
//!   thread, so it needs no lock of its own
//! - Each process owns its descriptor table, the parent half of every
//!   child's exit record, and the child half of its own
//! - Loading a program is the loader's job; this module only builds the
//!   process it hands over

pub mod exit;
pub mod fd;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::fs::{FileLock, FileSystem};

pub use exit::{exit_record, ExitNotifier, ExitWaiter};
pub use fd::{Fd, FdError, FdTable, TableFull};

/// A process identifier, unique for the life of the system.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(u32);

static NEXT_PID: AtomicU32 = AtomicU32::new(1);

impl Pid {
    /// Wrap a raw identifier, e.g. one passed to `wait`.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Hand out the next unused identifier.
    pub fn allocate() -> Self {
        Self(NEXT_PID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Error type for `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// Not a child of the caller, or already waited for.
    NoSuchChild,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchChild => write!(f, "no such child"),
        }
    }
}

/// Why a program could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// No executable with that name.
    NotFound,
    /// The file is not a loadable executable.
    BadImage,
    /// No memory for the new address space or thread.
    OutOfMemory,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "executable not found"),
            Self::BadImage => write!(f, "not a loadable executable"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Starts programs.
///
/// Implemented by the platform's process loader.
pub trait Loader<FS: FileSystem>: Sync {
    /// Load the program named by `cmd_line` and start it as `child`.
    ///
    /// Returns once the outcome is known: on `Ok` the child's thread is
    /// running and owns `child`; on `Err` the child has been dropped.
    /// Reads of the executable go through `files`.
    fn execute(
        &self,
        cmd_line: &str,
        child: Process<FS::File>,
        files: &FileLock<FS>,
    ) -> Result<(), LoadError>;
}

/// The per-process state the syscall layer owns.
pub struct Process<F> {
    pid: Pid,
    name: String,
    fds: FdTable<F>,
    children: Vec<ExitWaiter>,
    exit: Option<ExitNotifier>,
}

impl<F> Process<F> {
    /// The first user process, which has no parent to report to.
    pub fn new_root(cmd_line: &str) -> Self {
        Self::with_parent_link(Pid::allocate(), cmd_line, None)
    }

    /// A child to be started by the loader, and the record its parent
    /// will wait on.
    pub fn new_child(cmd_line: &str) -> (Self, ExitWaiter) {
        let pid = Pid::allocate();
        let (notifier, waiter) = exit_record(pid);
        (Self::with_parent_link(pid, cmd_line, Some(notifier)), waiter)
    }

    fn with_parent_link(pid: Pid, cmd_line: &str, exit: Option<ExitNotifier>) -> Self {
        let name = cmd_line.split_whitespace().next().unwrap_or("");
        Self {
            pid,
            name: String::from(name),
            fds: FdTable::new(),
            children: Vec::new(),
            exit,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Program name: the first word of the command line.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fds(&self) -> &FdTable<F> {
        &self.fds
    }

    pub fn fds_mut(&mut self) -> &mut FdTable<F> {
        &mut self.fds
    }

    /// Take charge of a child's exit record after a successful exec.
    pub fn adopt(&mut self, child: ExitWaiter) {
        self.children.push(child);
    }

    /// Remove and return the exit record for `pid`.
    ///
    /// Fails for unknown children and for children already waited for.
    pub fn take_child(&mut self, pid: Pid) -> Result<ExitWaiter, WaitError> {
        let index = self
            .children
            .iter()
            .position(|c| c.child() == pid)
            .ok_or(WaitError::NoSuchChild)?;
        Ok(self.children.swap_remove(index))
    }

    /// Drop the records of children never waited for.
    pub fn abandon_children(&mut self) {
        self.children.clear();
    }

    /// Take the child half of this process's own exit record.
    ///
    /// `None` for the root process, or once the status has been taken.
    pub fn take_exit_notifier(&mut self) -> Option<ExitNotifier> {
        self.exit.take()
    }
}

impl<F> fmt::Debug for Process<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("fds", &self.fds)
            .field("children", &self.children.len())
            .finish()
    }
}
