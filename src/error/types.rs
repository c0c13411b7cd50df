//! Error types
//!
//! Defines domain-specific error types for each component of the pose
//! broadcast server.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use tokio_tungstenite::tungstenite;

/// Transport (TCP / WebSocket) errors
#[derive(Debug)]
pub enum TransportError {
    BindFailed(String, io::Error),
    AcceptFailed(io::Error),
    HandshakeFailed(SocketAddr, tungstenite::Error),
    HandshakeTimeout(SocketAddr),
    SendFailed(tungstenite::Error),
    ReceiveFailed(tungstenite::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::BindFailed(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            TransportError::AcceptFailed(e) => write!(f, "Failed to accept connection: {}", e),
            TransportError::HandshakeFailed(addr, e) => {
                write!(f, "WebSocket handshake with {} failed: {}", addr, e)
            }
            TransportError::HandshakeTimeout(addr) => {
                write!(f, "Timeout waiting for WebSocket handshake from {}", addr)
            }
            TransportError::SendFailed(e) => write!(f, "Failed to write frame: {}", e),
            TransportError::ReceiveFailed(e) => write!(f, "Failed to read frame: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

/// Failure to hand a payload to one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Session is still connecting or already closed.
    NotOpen,
    /// Outbound queue is full; the writer is not keeping up.
    QueueFull,
    /// Writer task is gone.
    Closed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotOpen => write!(f, "Session is not open"),
            SendError::QueueFull => write!(f, "Outbound queue is full"),
            SendError::Closed => write!(f, "Outbound queue is closed"),
        }
    }
}

impl std::error::Error for SendError {}

/// Errors turning a pose sample into its wire form
#[derive(Debug)]
pub enum SerializationError {
    NonFinite { joint: String, value: f64 },
    Json(serde_json::Error),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::NonFinite { joint, value } => {
                write!(f, "Joint {} has non-finite value {}", joint, value)
            }
            SerializationError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {}

impl From<serde_json::Error> for SerializationError {
    fn from(error: serde_json::Error) -> Self {
        SerializationError::Json(error)
    }
}

/// Client registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    RegistryFull(usize),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::RegistryFull(max) => {
                write!(f, "Too many connections (max {} clients)", max)
            }
        }
    }
}

impl std::error::Error for ClientError {}

/// Errors that abort a single broadcast tick
#[derive(Debug)]
pub enum BroadcastError {
    SourcePanicked(String),
    Serialization(SerializationError),
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastError::SourcePanicked(msg) => write!(f, "Pose source panicked: {}", msg),
            BroadcastError::Serialization(e) => write!(f, "Serialization failed: {}", e),
        }
    }
}

impl std::error::Error for BroadcastError {}

impl From<SerializationError> for BroadcastError {
    fn from(error: SerializationError) -> Self {
        BroadcastError::Serialization(error)
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Config(config::ConfigError),
    Transport(TransportError),
    Client(ClientError),
    Broadcast(BroadcastError),
    IoError(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::Transport(e) => write!(f, "Transport error: {}", e),
            ServerError::Client(e) => write!(f, "Client error: {}", e),
            ServerError::Broadcast(e) => write!(f, "Broadcast error: {}", e),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

impl From<TransportError> for ServerError {
    fn from(error: TransportError) -> Self {
        ServerError::Transport(error)
    }
}

impl From<ClientError> for ServerError {
    fn from(error: ClientError) -> Self {
        ServerError::Client(error)
    }
}

impl From<BroadcastError> for ServerError {
    fn from(error: BroadcastError) -> Self {
        ServerError::Broadcast(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}
