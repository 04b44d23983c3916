//! Kernel configuration constants

/// Descriptor slots per process, including the two reserved console streams
pub const MAX_FD: usize = 128;

/// Software interrupt used by user programs to enter the kernel
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Size of one syscall argument slot on the user stack
pub const WORD_SIZE: usize = 4;

/// Most arguments any syscall takes
pub const MAX_ARGS: usize = 3;

/// First kernel virtual address; everything below belongs to user space
pub const PHYS_BASE: usize = 0xC000_0000;

/// Page size (4KB)
pub const PAGE_SIZE: usize = 0x1000;

/// Longest path accepted by create/remove/open, excluding the NUL
pub const MAX_PATH_LEN: usize = 511;

/// Longest command line accepted by exec, excluding the NUL
pub const MAX_CMDLINE_LEN: usize = PAGE_SIZE - 1;

/// Status reported for a process the kernel terminates
pub const KILLED_STATUS: i32 = -1;
