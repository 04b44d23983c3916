//! System Call Handler
//!
//! Decodes a trap, runs the requested handler on the trapping thread, and
//! writes the result back into the frame.
//!
//! # Security Considerations
//! - The stack pointer and every argument pointer are validated first
//! - Unknown syscall numbers terminate the caller
//! - Bad pointers and bad descriptors terminate the caller, never the kernel
//! - Every other failure becomes the syscall's `-1`/`false` result

use alloc::format;
use core::fmt;

use crate::config::{KILLED_STATUS, MAX_ARGS, MAX_CMDLINE_LEN, MAX_PATH_LEN, WORD_SIZE};
use crate::drivers::Console;
use crate::fs::{FileLock, FileSystem};
use crate::mm::AddressSpace;
use crate::process::{Fd, FdError, LoadError, Loader, Pid, Process, TableFull, WaitError};
use crate::trap::TrapFrame;

use super::number::Syscall;
use super::validate::{self, AccessError};

/// System call error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Number with no handler
    UnknownSyscall(u32),
    /// Bad user pointer or string
    Access(AccessError),
    /// Bad or reserved descriptor
    Descriptor(FdError),
    /// Descriptor table full
    TableFull,
    /// Filesystem has no such file
    NotFound,
    /// Console stream used in the wrong direction
    WrongStream,
    /// Not a child, or already waited for
    NoSuchChild,
    /// exec could not start the program
    Load(LoadError),
}

impl SyscallError {
    /// Whether the caller is terminated instead of getting a result.
    pub const fn is_fatal(self) -> bool {
        match self {
            Self::UnknownSyscall(_) => true,
            Self::Access(e) => e.is_violation(),
            Self::Descriptor(FdError::InvalidDescriptor) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSyscall(n) => write!(f, "unknown syscall {}", n),
            Self::Access(e) => write!(f, "bad user memory: {}", e),
            Self::Descriptor(e) => write!(f, "{}", e),
            Self::TableFull => write!(f, "descriptor table full"),
            Self::NotFound => write!(f, "no such file"),
            Self::WrongStream => write!(f, "console stream used in wrong direction"),
            Self::NoSuchChild => write!(f, "no such child"),
            Self::Load(e) => write!(f, "exec failed: {}", e),
        }
    }
}

impl From<AccessError> for SyscallError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

impl From<FdError> for SyscallError {
    fn from(e: FdError) -> Self {
        Self::Descriptor(e)
    }
}

impl From<WaitError> for SyscallError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::NoSuchChild => Self::NoSuchChild,
        }
    }
}

impl From<LoadError> for SyscallError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

/// What the trap glue does with the thread once dispatch returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to user mode.
    Resume,
    /// The process has exited with this status; tear the thread down.
    Exit(i32),
    /// `halt` was called; power the machine off.
    PowerOff,
}

/// The syscall dispatcher.
///
/// One per system. It owns the global file-operation lock, so every
/// filesystem call from every process goes through this value.
pub struct Dispatcher<FS: FileSystem, C: Console, L: Loader<FS>> {
    files: FileLock<FS>,
    console: C,
    loader: L,
}

impl<FS: FileSystem, C: Console, L: Loader<FS>> Dispatcher<FS, C, L> {
    pub const fn new(fs: FS, console: C, loader: L) -> Self {
        Self {
            files: FileLock::new(fs),
            console,
            loader,
        }
    }

    /// The global file-operation lock.
    pub fn files(&self) -> &FileLock<FS> {
        &self.files
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Service one trap for `process`.
    ///
    /// # Arguments
    /// * `process` - The trapping process
    /// * `memory` - Its address space
    /// * `frame` - The saved user registers; `eax` receives the result
    pub fn dispatch<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        memory: &mut M,
        frame: &mut TrapFrame,
    ) -> Disposition {
        if !frame.is_syscall() {
            log::warn!("[SYSCALL] ignoring trap on vector {:#x}", frame.vec_no);
            return Disposition::Resume;
        }

        let (call, args) = match decode(&*memory, frame) {
            Ok(decoded) => decoded,
            Err(e) => return self.kill(process, e),
        };
        log::trace!("[SYSCALL] {} {:?}{:?}", process.pid(), call, &args[..call.arg_count()]);

        let result = match call {
            Syscall::Halt => return self.sys_halt(process),
            Syscall::Exit => {
                let status = args[0] as i32;
                self.terminate(process, status);
                return Disposition::Exit(status);
            }
            Syscall::Exec => self.sys_exec(process, &*memory, args[0] as usize).map(Some),
            Syscall::Wait => self.sys_wait(process, args[0]).map(Some),
            Syscall::Create => self
                .sys_create(&*memory, args[0] as usize, args[1])
                .map(|ok| Some(ok as u32)),
            Syscall::Remove => self
                .sys_remove(&*memory, args[0] as usize)
                .map(|ok| Some(ok as u32)),
            Syscall::Open => self.sys_open(process, &*memory, args[0] as usize).map(Some),
            Syscall::Filesize => self.sys_filesize(process, args[0] as i32).map(Some),
            Syscall::Read => self
                .sys_read(
                    process,
                    memory,
                    args[0] as i32,
                    args[1] as usize,
                    args[2] as usize,
                )
                .map(Some),
            Syscall::Write => self
                .sys_write(
                    process,
                    &*memory,
                    args[0] as i32,
                    args[1] as usize,
                    args[2] as usize,
                )
                .map(Some),
            Syscall::Seek => self.sys_seek(process, args[0] as i32, args[1]).map(|()| None),
            Syscall::Tell => self.sys_tell(process, args[0] as i32).map(Some),
            Syscall::Close => self.sys_close(process, args[0] as i32).map(|()| None),
        };

        match result {
            Ok(Some(value)) => frame.set_return(value),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return self.kill(process, e),
            Err(e) => {
                log::debug!("[SYSCALL] {} {:?} failed: {}", process.pid(), call, e);
                if let Some(value) = call.failure_value() {
                    frame.set_return(value);
                }
            }
        }
        Disposition::Resume
    }

    /// Tear down `process` and report `status` to its parent.
    ///
    /// Prints the termination message, closes every open file, drops the
    /// records of children never waited for, and signals the parent last.
    /// Also used by the fault handlers when a process has to be killed.
    pub fn terminate(&self, process: &mut Process<FS::File>, status: i32) {
        let message = format!("{}: exit({})\n", process.name(), status);
        self.console.putbuf(message.as_bytes());
        log::info!(
            "[PROCESS] {} ({}) exited with status {}",
            process.pid(),
            process.name(),
            status
        );

        while let Some((fd, file)) = process.fds_mut().pop() {
            log::debug!("[PROCESS] {} closing fd {} at exit", process.pid(), fd);
            self.files.with(|fs| fs.close(file));
        }
        process.abandon_children();

        if let Some(notifier) = process.take_exit_notifier() {
            notifier.signal(status);
        }
    }

    fn kill(&self, process: &mut Process<FS::File>, error: SyscallError) -> Disposition {
        log::warn!("[SYSCALL] killing {} ({}): {}", process.pid(), process.name(), error);
        self.terminate(process, KILLED_STATUS);
        Disposition::Exit(KILLED_STATUS)
    }

    /// Halt system call
    ///
    /// Never returns to the caller; the trap glue powers the machine off.
    fn sys_halt(&self, process: &Process<FS::File>) -> Disposition {
        log::info!("[SYSCALL] halt requested by {}", process.pid());
        Disposition::PowerOff
    }

    /// Exec system call
    ///
    /// Starts the program named by the command line as a child of the
    /// caller and returns its pid. The child is adopted only once the
    /// loader reports success.
    fn sys_exec<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        memory: &M,
        cmd_ptr: usize,
    ) -> Result<u32, SyscallError> {
        let cmd_line = validate::read_user_str(memory, cmd_ptr, MAX_CMDLINE_LEN)?;
        let (child, waiter) = Process::new_child(&cmd_line);
        let pid = child.pid();
        self.loader.execute(&cmd_line, child, &self.files)?;
        process.adopt(waiter);
        Ok(pid.as_u32())
    }

    /// Wait system call
    ///
    /// Blocks until the child exits. Each child can be waited for once.
    fn sys_wait(&self, process: &mut Process<FS::File>, pid: u32) -> Result<u32, SyscallError> {
        let waiter = process.take_child(Pid::new(pid))?;
        Ok(waiter.wait() as u32)
    }

    fn sys_create<M: AddressSpace + ?Sized>(
        &self,
        memory: &M,
        path_ptr: usize,
        initial_size: u32,
    ) -> Result<bool, SyscallError> {
        let path = validate::read_user_str(memory, path_ptr, MAX_PATH_LEN)?;
        Ok(self.files.with(|fs| fs.create(&path, initial_size)))
    }

    fn sys_remove<M: AddressSpace + ?Sized>(
        &self,
        memory: &M,
        path_ptr: usize,
    ) -> Result<bool, SyscallError> {
        let path = validate::read_user_str(memory, path_ptr, MAX_PATH_LEN)?;
        Ok(self.files.with(|fs| fs.remove(&path)))
    }

    /// Open system call
    ///
    /// Returns the new descriptor, always 2 or above.
    fn sys_open<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        memory: &M,
        path_ptr: usize,
    ) -> Result<u32, SyscallError> {
        let path = validate::read_user_str(memory, path_ptr, MAX_PATH_LEN)?;
        if process.fds().is_full() {
            return Err(SyscallError::TableFull);
        }

        let file = self
            .files
            .with(|fs| fs.open(&path))
            .ok_or(SyscallError::NotFound)?;
        match process.fds_mut().allocate(file) {
            Ok(fd) => Ok(fd.as_raw() as u32),
            Err(TableFull(file)) => {
                self.files.with(|fs| fs.close(file));
                Err(SyscallError::TableFull)
            }
        }
    }

    fn sys_filesize(&self, process: &Process<FS::File>, fd: i32) -> Result<u32, SyscallError> {
        let file = process.fds().lookup(fd)?;
        Ok(self.files.with(|fs| fs.length(file)))
    }

    /// Read system call
    ///
    /// Descriptor 0 reads `size` keys from the console, one per byte.
    fn sys_read<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        memory: &mut M,
        fd: i32,
        buf: usize,
        size: usize,
    ) -> Result<u32, SyscallError> {
        let user_buf = validate::validate_user_write(&*memory, buf, size)?;
        let bytes = user_buf.as_bytes_mut(memory);

        match Fd::new(fd) {
            Some(Fd::STDIN) => {
                let _guard = self.files.lock();
                for byte in bytes.iter_mut() {
                    *byte = self.console.getc();
                }
                Ok(size as u32)
            }
            Some(Fd::STDOUT) => Err(SyscallError::WrongStream),
            _ => {
                let file = process.fds_mut().lookup_mut(fd)?;
                Ok(self.files.with(|fs| fs.read(file, bytes)))
            }
        }
    }

    /// Write system call
    ///
    /// Descriptor 1 sends the whole buffer to the console in one piece.
    fn sys_write<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        memory: &M,
        fd: i32,
        buf: usize,
        size: usize,
    ) -> Result<u32, SyscallError> {
        let user_buf = validate::validate_user_read(memory, buf, size)?;
        let bytes = user_buf.as_bytes(memory);

        match Fd::new(fd) {
            Some(Fd::STDOUT) => {
                self.console.putbuf(bytes);
                Ok(size as u32)
            }
            Some(Fd::STDIN) => Err(SyscallError::WrongStream),
            _ => {
                let file = process.fds_mut().lookup_mut(fd)?;
                Ok(self.files.with(|fs| fs.write(file, bytes)))
            }
        }
    }

    fn sys_seek(
        &self,
        process: &mut Process<FS::File>,
        fd: i32,
        position: u32,
    ) -> Result<(), SyscallError> {
        let file = process.fds_mut().lookup_mut(fd)?;
        self.files.with(|fs| fs.seek(file, position));
        Ok(())
    }

    fn sys_tell(&self, process: &Process<FS::File>, fd: i32) -> Result<u32, SyscallError> {
        let file = process.fds().lookup(fd)?;
        Ok(self.files.with(|fs| fs.tell(file)))
    }

    /// Close system call
    ///
    /// Closing a console stream does nothing.
    fn sys_close(&self, process: &mut Process<FS::File>, fd: i32) -> Result<(), SyscallError> {
        match process.fds_mut().release(fd) {
            Ok(file) => {
                self.files.with(|fs| fs.close(file));
                Ok(())
            }
            Err(FdError::Reserved) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read the syscall number and its arguments off the user stack.
fn decode<M: AddressSpace + ?Sized>(
    memory: &M,
    frame: &TrapFrame,
) -> Result<(Syscall, [u32; MAX_ARGS]), SyscallError> {
    let sp = frame.stack_pointer();
    let number = validate::read_user_word(memory, sp)?;
    let call = Syscall::from_number(number).ok_or(SyscallError::UnknownSyscall(number))?;

    let mut args = [0u32; MAX_ARGS];
    for (i, arg) in args.iter_mut().enumerate().take(call.arg_count()) {
        let slot = sp
            .checked_add(WORD_SIZE * (i + 1))
            .ok_or(AccessError::Overflow)?;
        *arg = validate::read_user_word(memory, slot)?;
    }
    Ok((call, args))
}
