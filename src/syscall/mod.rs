//! System Call Interface
//!
//! The boundary between user processes and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only the thirteen numbered syscalls exist
//! - All pointers are validated before use
//! - Invalid inputs return errors or end the offending process, never panic
//! - All filesystem work is serialized by one global lock
//!
//! # Syscalls
//! | # | Name | Arguments | Result |
//! |---|------|-----------|--------|
//! | 0 | halt | | never returns |
//! | 1 | exit | status | never returns |
//! | 2 | exec | cmd_line | pid or -1 |
//! | 3 | wait | pid | exit status or -1 |
//! | 4 | create | path, size | bool |
//! | 5 | remove | path | bool |
//! | 6 | open | path | fd or -1 |
//! | 7 | filesize | fd | bytes |
//! | 8 | read | fd, buf, size | bytes read |
//! | 9 | write | fd, buf, size | bytes written |
//! | 10 | seek | fd, position | |
//! | 11 | tell | fd | position |
//! | 12 | close | fd | |

mod handler;
mod number;
pub mod validate;


pub use handler::{Dispatcher, Disposition, SyscallError};
pub use number::{numbers, Syscall};
pub use validate::{AccessError, UserBuffer, UserBufferMut};
