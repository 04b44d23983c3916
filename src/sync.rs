//! Blocking primitives shared with the thread system
//!
//! The scheduler is a collaborator: it owns context switching and the ready
//! queue. What this crate needs from it is a way to give up the CPU while a
//! thread waits, which the scheduler installs once at boot through
//! [`set_yield_hook`]. Until then waiters spin.

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Once;

static YIELD_HOOK: Once<fn()> = Once::new();

/// Install the scheduler's yield routine.
///
/// Only the first call has any effect.
pub fn set_yield_hook(hook: fn()) {
    YIELD_HOOK.call_once(|| hook);
}

/// Let other threads run while the caller waits.
#[inline]
pub fn relax() {
    match YIELD_HOOK.get() {
        Some(hook) => hook(),
        None => core::hint::spin_loop(),
    }
}

/// A counting semaphore.
///
/// `down` blocks while the count is zero; `up` never blocks.
#[derive(Debug)]
pub struct Semaphore {
    value: AtomicUsize,
}

impl Semaphore {
    /// Create a semaphore with an initial count.
    pub const fn new(value: usize) -> Self {
        Self {
            value: AtomicUsize::new(value),
        }
    }

    /// Wait for the count to become positive, then decrement it.
    pub fn down(&self) {
        while !self.try_down() {
            relax();
        }
    }

    /// Decrement the count if it is positive, without waiting.
    pub fn try_down(&self) -> bool {
        self.value
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |v| v.checked_sub(1))
            .is_ok()
    }

    /// Increment the count, releasing one waiter.
    pub fn up(&self) {
        self.value.fetch_add(1, Ordering::Release);
    }
}
