//! Broadcast scheduling
//!
//! Fixed-period fan-out of pose samples to every open session.

pub mod broadcaster;
pub mod results;

pub use broadcaster::Broadcaster;
pub use results::BroadcastReport;
