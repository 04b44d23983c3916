//! userprog - User-Process System Call Boundary
//!
//! The layer that lets an unprivileged process ask the kernel for
//! process control and file I/O, and get an answer back.
//!
//! # Components
//! - Fixed-point arithmetic for the scheduler (17.14 format)
//! - Per-process file descriptor table
//! - One-shot parent/child exit-status handoff
//! - A global lock serializing every filesystem call
//! - The syscall dispatcher behind trap vector 0x30
//!
//! # Security Model
//! - Every user pointer is validated against the caller's address space
//!   before the kernel touches it
//! - A misbehaving process is terminated, the kernel never is
//! - Only `halt` brings the whole system down
//!
//! # Collaborators
//! The thread system, the filesystem, the console, the program loader and
//! the interrupt controller live outside this crate. They are reached through
//! the traits in [`fs`], [`drivers`], [`mm`], [`process`] and [`trap`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fixed_point;
pub mod fs;
pub mod mm;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use fixed_point::Fixed;
pub use process::{Pid, Process};
pub use syscall::{Disposition, Dispatcher};
pub use trap::TrapFrame;
