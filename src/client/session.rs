//! Module `session`
//!
//! Defines `Session`, the handle for one connected viewer, and its lifecycle
//! state machine: `Connecting -> Open -> Closed`. `Closed` is terminal; a
//! reconnecting viewer always gets a fresh session.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::time::Instant;

use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::error::SendError;

/// Identity of a session within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Readiness of a session's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Connecting => 0,
            SessionState::Open => 1,
            SessionState::Closed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Open,
            _ => SessionState::Closed,
        }
    }
}

/// One connected viewer.
///
/// Payloads are queued onto a bounded channel drained by the connection's
/// writer task, so `try_send` never blocks the broadcaster.
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    state: AtomicU8,
    outbound: mpsc::Sender<Utf8Bytes>,
    consecutive_failures: AtomicU32,
    closed: Notify,
    connected_at: Instant,
}

impl Session {
    /// Creates a session in the `Connecting` state.
    pub fn new(id: SessionId, peer_addr: SocketAddr, outbound: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id,
            peer_addr,
            state: AtomicU8::new(SessionState::Connecting.as_u8()),
            outbound,
            consecutive_failures: AtomicU32::new(0),
            closed: Notify::new(),
            connected_at: Instant::now(),
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Only open sessions are broadcast targets.
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    // --------------------
    // State transitions
    // --------------------

    /// `Connecting -> Open`. Returns false if the session was not connecting.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting.as_u8(),
                SessionState::Open.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves to `Closed` and wakes the connection task.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn mark_closed(&self) -> bool {
        let previous = self
            .state
            .swap(SessionState::Closed.as_u8(), Ordering::AcqRel);
        let transitioned = previous != SessionState::Closed.as_u8();
        if transitioned {
            self.closed.notify_one();
        }
        transitioned
    }

    /// Resolves once the session has been marked closed.
    pub async fn closed(&self) {
        if self.state() == SessionState::Closed {
            return;
        }
        self.closed.notified().await;
    }

    // --------------------
    // Outbound path
    // --------------------

    /// Queues a payload for the writer task without waiting.
    pub fn try_send(&self, payload: Utf8Bytes) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::NotOpen);
        }
        self.outbound.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Records a failed send and returns the current streak.
    pub fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .field("consecutive_failures", &self.consecutive_failures())
            .finish()
    }
}
