//! System call numbers
//!
//! Fixed by the user-level library; both sides must agree on them.

/// Raw syscall numbers as pushed by user programs.
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

use numbers::*;

/// A recognized system call.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt = SYS_HALT,
    Exit = SYS_EXIT,
    Exec = SYS_EXEC,
    Wait = SYS_WAIT,
    Create = SYS_CREATE,
    Remove = SYS_REMOVE,
    Open = SYS_OPEN,
    Filesize = SYS_FILESIZE,
    Read = SYS_READ,
    Write = SYS_WRITE,
    Seek = SYS_SEEK,
    Tell = SYS_TELL,
    Close = SYS_CLOSE,
}

/// `-1` as it appears in `eax`.
const MINUS_ONE: u32 = u32::MAX;

impl Syscall {
    /// Decode a raw number, or `None` for numbers no handler exists for.
    pub const fn from_number(number: u32) -> Option<Self> {
        Some(match number {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit,
            SYS_EXEC => Self::Exec,
            SYS_WAIT => Self::Wait,
            SYS_CREATE => Self::Create,
            SYS_REMOVE => Self::Remove,
            SYS_OPEN => Self::Open,
            SYS_FILESIZE => Self::Filesize,
            SYS_READ => Self::Read,
            SYS_WRITE => Self::Write,
            SYS_SEEK => Self::Seek,
            SYS_TELL => Self::Tell,
            SYS_CLOSE => Self::Close,
            _ => return None,
        })
    }

    /// Number of word arguments above the syscall number on the stack.
    pub const fn arg_count(self) -> usize {
        match self {
            Self::Halt => 0,
            Self::Exit | Self::Exec | Self::Wait | Self::Remove | Self::Open => 1,
            Self::Filesize | Self::Tell | Self::Close => 1,
            Self::Create | Self::Seek => 2,
            Self::Read | Self::Write => 3,
        }
    }

    /// What the caller sees in `eax` when the call fails without being
    /// fatal. `None` for calls that return nothing.
    pub const fn failure_value(self) -> Option<u32> {
        match self {
            Self::Create | Self::Remove => Some(false as u32),
            Self::Halt | Self::Exit | Self::Seek | Self::Close => None,
            _ => Some(MINUS_ONE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_number_decodes() {
        for n in SYS_HALT..=SYS_CLOSE {
            let call = Syscall::from_number(n).unwrap();
            assert_eq!(call as u32, n);
            assert!(call.arg_count() <= crate::config::MAX_ARGS);
        }
        assert_eq!(Syscall::from_number(SYS_CLOSE + 1), None);
    }

    #[test]
    fn test_failure_values() {
        assert_eq!(Syscall::Create.failure_value(), Some(0));
        assert_eq!(Syscall::Open.failure_value(), Some(u32::MAX));
        assert_eq!(Syscall::Close.failure_value(), None);
    }
}
