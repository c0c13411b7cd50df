//! Broadcast result types
//!
//! Defines the per-tick outcome returned by the broadcaster.

use crate::client::SessionId;
use crate::error::SendError;

/// Outcome of one broadcast tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastReport {
    pub tick: u64,
    /// Sessions the payload was queued for.
    pub delivered: usize,
    /// Sessions skipped because they were not open.
    pub skipped: usize,
    /// Failed sends, per session.
    pub failures: Vec<(SessionId, SendError)>,
    /// Sessions dropped after too many consecutive failures.
    pub evicted: Vec<SessionId>,
}

impl BroadcastReport {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn recipients(&self) -> usize {
        self.delivered + self.skipped + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.evicted.is_empty()
    }
}
