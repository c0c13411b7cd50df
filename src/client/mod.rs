//! Client management system
//!
//! Handles viewer connections, session state, and the registry of live sessions.

pub mod events;
pub mod handler;
pub mod registry;
pub mod session;

pub use events::ConnectionObserver;
pub use handler::handle_client;
pub use registry::ClientRegistry;
pub use session::{Session, SessionId, SessionState};
