//! Device drivers used by the syscall layer
//!
//! The drivers themselves belong to the platform; this crate only names
//! the operations it needs from them.

pub mod console;

pub use console::Console;
