//! Syscall trap entry
//!
//! User programs enter the kernel with `int $0x30`. The interrupt stub saves
//! the user registers into a [`TrapFrame`] and calls the dispatcher on the
//! trapping thread.
//!
//! # Calling Convention
//! ```text
//!   esp + 12 ┃ arg 2
//!   esp +  8 ┃ arg 1
//!   esp +  4 ┃ arg 0
//!   esp      ┃ syscall number
//! ```
//! The result goes back in `eax`.
//!
//! # Security Considerations
//! - The gate is callable from ring 3; every other gate is not
//! - `esp` is a user value and is validated like any other user pointer

use bitflags::bitflags;

use crate::config::SYSCALL_VECTOR;
use crate::mm::VirtAddr;

bitflags! {
    /// Properties of an interrupt gate.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct GateFlags: u8 {
        /// Leave interrupts enabled while the handler runs.
        const INTERRUPTS_ON = 1 << 0;
        /// Descriptor privilege level 3: user code may raise it.
        const USER_CALLABLE = 1 << 1;
    }
}

/// Flags the syscall gate is installed with.
pub const SYSCALL_GATE: GateFlags = GateFlags::INTERRUPTS_ON.union(GateFlags::USER_CALLABLE);

/// User register state saved when the thread trapped.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// Interrupt vector that was raised
    pub vec_no: u8,
    /// User stack pointer at the time of the trap
    pub esp: u32,
    /// Return value register
    pub eax: u32,
}

impl TrapFrame {
    /// A frame for a syscall trap with the given user stack pointer.
    pub const fn syscall(esp: u32) -> Self {
        Self {
            vec_no: SYSCALL_VECTOR,
            esp,
            eax: 0,
        }
    }

    /// The user stack pointer as an address.
    #[inline]
    pub const fn stack_pointer(&self) -> VirtAddr {
        VirtAddr::new(self.esp as usize)
    }

    /// Whether this frame came in through the syscall gate.
    #[inline]
    pub const fn is_syscall(&self) -> bool {
        self.vec_no == SYSCALL_VECTOR
    }

    /// Store a syscall result.
    #[inline]
    pub fn set_return(&mut self, value: u32) {
        self.eax = value;
    }
}

/// The interrupt descriptor table, owned by the platform.
pub trait InterruptController {
    /// Install the gate for `vector`.
    fn register(&mut self, vector: u8, flags: GateFlags, name: &'static str);
}

/// Install the syscall gate.
///
/// Must be called once during kernel initialization, before the first
/// user process starts.
pub fn init(idt: &mut impl InterruptController) {
    idt.register(SYSCALL_VECTOR, SYSCALL_GATE, "syscall");
    log::info!("[BOOT] Syscall gate installed at vector {:#x}", SYSCALL_VECTOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingIdt(Vec<(u8, GateFlags, &'static str)>);

    impl InterruptController for RecordingIdt {
        fn register(&mut self, vector: u8, flags: GateFlags, name: &'static str) {
            self.0.push((vector, flags, name));
        }
    }

    #[test]
    fn test_init_registers_user_gate() {
        let mut idt = RecordingIdt::default();
        init(&mut idt);
        assert_eq!(idt.0, vec![(0x30, SYSCALL_GATE, "syscall")]);
        assert!(SYSCALL_GATE.contains(GateFlags::USER_CALLABLE));
        assert!(SYSCALL_GATE.contains(GateFlags::INTERRUPTS_ON));
    }

    #[test]
    fn test_frame_routing() {
        let mut frame = TrapFrame::syscall(0xbfff_fff0);
        assert!(frame.is_syscall());
        assert_eq!(frame.stack_pointer().as_usize(), 0xbfff_fff0);
        frame.set_return(u32::MAX);
        assert_eq!(frame.eax as i32, -1);
        frame.vec_no = 0x0e;
        assert!(!frame.is_syscall());
    }
}
