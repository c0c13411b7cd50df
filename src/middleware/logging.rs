//! Logging middleware
//!
//! Default connection observer: writes lifecycle events to the log.

use log::{debug, info};

use crate::client::{ConnectionObserver, Session};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn on_open(&self, session: &Session) {
        info!("Viewer connected: {} ({})", session.peer_addr(), session.id());
    }

    fn on_close(&self, session: &Session) {
        info!(
            "Viewer disconnected: {} ({}, connected for {:.1?})",
            session.peer_addr(),
            session.id(),
            session.connected_at().elapsed()
        );
    }

    fn on_message(&self, session: &Session, text: &str) {
        debug!(
            "Ignoring {} byte message from {}",
            text.len(),
            session.peer_addr()
        );
    }
}
