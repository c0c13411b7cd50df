//! Error handlers
//!
//! Contains failures at the component boundary that produced them.

use crate::error::types::{ServerError, TransportError};
use log::{error, warn};

/// Log a server error
pub fn handle_error(err: &ServerError) {
    match err {
        // Peers going away mid-session are routine
        ServerError::Transport(TransportError::ReceiveFailed(_))
        | ServerError::Transport(TransportError::HandshakeTimeout(_))
        | ServerError::Client(_) => warn!("Pose Server Error: {}", err),
        _ => error!("Pose Server Error: {}", err),
    }
}

/// Whether the error means the server cannot keep running
pub fn is_fatal(err: &ServerError) -> bool {
    matches!(
        err,
        ServerError::Config(_) | ServerError::Transport(TransportError::BindFailed(..))
    )
}
