//! Stale-response guard for concurrent gateway calls.
//!
//! Each request for a target (a schedule id, "dashboard", ...) is stamped
//! with a monotonically increasing ticket. A response is applied unless a
//! newer request for the same target has already been applied; an older
//! response arriving first is still applied, then replaced by the newer one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of one issued request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    target: String,
    seq: u64,
}

impl Ticket {
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Shared tracker of the newest applied response per target.
///
/// Holds one entry per distinct target ever applied, so it is bounded by the
/// number of targets (schedules, views) a process works with.
#[derive(Clone, Default)]
pub struct RequestGuard {
    applied: Arc<Mutex<HashMap<String, u64>>>,
    next_seq: Arc<AtomicU64>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new request for `target`.
    pub fn begin(&self, target: impl Into<String>) -> Ticket {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ticket {
            target: target.into(),
            seq,
        }
    }

    /// Whether a response for `ticket` may still be applied.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.applied
            .lock()
            .get(&ticket.target)
            .map_or(true, |&applied| ticket.seq > applied)
    }

    /// Hand back `value` and mark it applied, unless a newer response for
    /// the same target was applied first.
    pub fn accept<T>(&self, ticket: &Ticket, value: T) -> Option<T> {
        let mut applied = self.applied.lock();
        let newest = applied.entry(ticket.target.clone()).or_insert(0);
        if ticket.seq > *newest {
            *newest = ticket.seq;
            Some(value)
        } else {
            log::debug!(
                "Discarding stale response for '{}' (request #{}, #{} already applied)",
                ticket.target,
                ticket.seq,
                newest
            );
            None
        }
    }

    /// Drop the bookkeeping for `target`.
    pub fn forget(&self, target: &str) {
        self.applied.lock().remove(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_older_response_after_newer_is_discarded() {
        let guard = RequestGuard::new();
        let first = guard.begin("schedule:7");
        let second = guard.begin("schedule:7");

        assert_eq!(guard.accept(&second, "new"), Some("new"));
        assert!(!guard.is_current(&first));
        assert_eq!(guard.accept(&first, "old"), None);
    }

    #[test]
    fn test_older_response_first_is_applied_then_replaced() {
        let guard = RequestGuard::new();
        let first = guard.begin("schedule:7");
        let second = guard.begin("schedule:7");

        assert_eq!(guard.accept(&first, "old"), Some("old"));
        assert_eq!(guard.accept(&second, "new"), Some("new"));
    }

    #[test]
    fn test_failed_newer_request_leaves_older_result() {
        let guard = RequestGuard::new();
        let first = guard.begin("schedule:7");
        let _failed = guard.begin("schedule:7");

        // the newer request never reports back
        assert_eq!(guard.accept(&first, "old"), Some("old"));
    }

    #[test]
    fn test_targets_are_independent() {
        let guard = RequestGuard::new();
        let a = guard.begin("schedule:1");
        let b = guard.begin("schedule:2");
        assert_eq!(guard.accept(&b, 2), Some(2));
        assert!(guard.is_current(&a));
        assert_eq!(a.target(), "schedule:1");
    }

    #[test]
    fn test_clones_share_state() {
        let guard = RequestGuard::new();
        let other = guard.clone();
        let first = guard.begin("dashboard");
        let second = other.begin("dashboard");
        assert_eq!(other.accept(&second, ()), Some(()));
        assert!(!guard.is_current(&first));
    }

    #[test]
    fn test_forget_clears_target() {
        let guard = RequestGuard::new();
        let first = guard.begin("dashboard");
        let second = guard.begin("dashboard");
        assert_eq!(guard.accept(&second, ()), Some(()));

        guard.forget("dashboard");
        assert!(guard.is_current(&first));
    }
}
