//! Server middleware
//!
//! Provides the logging connection observer.

pub mod logging;

pub use logging::LoggingObserver;
