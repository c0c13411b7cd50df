//! Connection lifecycle hooks
//!
//! Collaborators (a different pose source, a rendering client bridge)
//! integrate through these three events. All methods default to no-ops.

use crate::client::Session;

pub trait ConnectionObserver: Send + Sync {
    /// The WebSocket handshake completed and the session is now a broadcast target.
    fn on_open(&self, _session: &Session) {}

    /// The session left the registry, whichever side closed it.
    fn on_close(&self, _session: &Session) {}

    /// A text frame arrived from the viewer. The core ignores inbound data.
    fn on_message(&self, _session: &Session, _text: &str) {}
}
