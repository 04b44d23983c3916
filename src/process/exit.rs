//! Exit Synchronization Record
//!
//! A one-shot handoff of a child's exit status to its parent.
//!
//! # Lifecycle
//! ```text
//!   Pending ──(child: signal)──▶ Signaled ──(parent: wait)──▶ Consumed
//! ```
//!
//! # Design
//! - `exit_record` returns two halves: the child keeps the [`ExitNotifier`],
//!   the parent keeps the [`ExitWaiter`]
//! - Both halves are consumed by their one operation, so the status is
//!   written at most once and read at most once
//! - The record is freed when the last half goes away: after the parent
//!   waits, or when the parent exits without waiting
//! - A notifier dropped without signaling publishes `KILLED_STATUS`, so a
//!   parent never waits on a child that is already gone

use alloc::sync::Arc;
use core::fmt;

use spin::Mutex;

use super::Pid;
use crate::config::KILLED_STATUS;
use crate::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitState {
    Pending,
    Signaled(i32),
    Consumed,
}

/// Shared state of one parent/child pair.
struct ExitRecord {
    child: Pid,
    state: Mutex<ExitState>,
    ready: Semaphore,
}

impl ExitRecord {
    /// Store the status and wake the parent, unless already signaled.
    fn publish(&self, status: i32) -> bool {
        {
            let mut state = self.state.lock();
            if *state != ExitState::Pending {
                return false;
            }
            *state = ExitState::Signaled(status);
        }
        self.ready.up();
        true
    }
}

/// Create the record for a newly spawned child.
pub fn exit_record(child: Pid) -> (ExitNotifier, ExitWaiter) {
    let record = Arc::new(ExitRecord {
        child,
        state: Mutex::new(ExitState::Pending),
        ready: Semaphore::new(0),
    });
    (
        ExitNotifier {
            record: Arc::clone(&record),
        },
        ExitWaiter { record },
    )
}

/// The child's half: reports the exit status once.
pub struct ExitNotifier {
    record: Arc<ExitRecord>,
}

impl ExitNotifier {
    /// The child this record belongs to.
    pub fn child(&self) -> Pid {
        self.record.child
    }

    /// Publish the exit status and wake a waiting parent.
    ///
    /// Must be the child's last synchronization action before its thread
    /// is torn down.
    pub fn signal(self, status: i32) {
        if self.record.publish(status) {
            log::debug!("[EXIT] {} signaled status {}", self.record.child, status);
        }
    }
}

impl Drop for ExitNotifier {
    fn drop(&mut self) {
        if self.record.publish(KILLED_STATUS) {
            log::debug!("[EXIT] {} dropped without exit status", self.record.child);
        }
    }
}

impl fmt::Debug for ExitNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExitNotifier({})", self.record.child)
    }
}

/// The parent's half: collects the exit status once.
pub struct ExitWaiter {
    record: Arc<ExitRecord>,
}

impl ExitWaiter {
    /// The child this record belongs to.
    pub fn child(&self) -> Pid {
        self.record.child
    }

    /// Block until the child signals, then take its status.
    pub fn wait(self) -> i32 {
        self.record.ready.down();
        let mut state = self.record.state.lock();
        match core::mem::replace(&mut *state, ExitState::Consumed) {
            ExitState::Signaled(status) => {
                log::debug!("[EXIT] {} status {} consumed", self.record.child, status);
                status
            }
            // `ready` is raised only after the status is stored.
            ExitState::Pending | ExitState::Consumed => KILLED_STATUS,
        }
    }
}

impl fmt::Debug for ExitWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExitWaiter({})", self.record.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_after_signal_returns_immediately() {
        let (notifier, waiter) = exit_record(Pid::new(7));
        notifier.signal(42);
        assert_eq!(*waiter.record.state.lock(), ExitState::Signaled(42));
        assert_eq!(waiter.wait(), 42);
    }

    #[test]
    fn test_wait_blocks_until_signal() {
        let (notifier, waiter) = exit_record(Pid::new(8));
        let parent = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(20));
        assert!(!parent.is_finished());
        notifier.signal(3);
        assert_eq!(parent.join().unwrap(), 3);
    }

    #[test]
    fn test_dropped_notifier_reports_killed() {
        let (notifier, waiter) = exit_record(Pid::new(9));
        drop(notifier);
        assert_eq!(waiter.wait(), KILLED_STATUS);
    }

    #[test]
    fn test_signal_is_not_overwritten_by_drop() {
        let (notifier, waiter) = exit_record(Pid::new(10));
        notifier.signal(0);
        assert_eq!(waiter.wait(), 0);
    }

    #[test]
    fn test_orphaned_record_is_freed() {
        let (notifier, waiter) = exit_record(Pid::new(11));
        let weak = Arc::downgrade(&waiter.record);
        drop(waiter);
        assert!(weak.upgrade().is_some());
        notifier.signal(1);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_child_id() {
        let (notifier, waiter) = exit_record(Pid::new(12));
        assert_eq!(notifier.child(), Pid::new(12));
        assert_eq!(waiter.child(), Pid::new(12));
    }
}
